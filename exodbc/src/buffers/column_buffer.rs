use std::rc::{Rc, Weak};

use odbc_sys::{CDataType, Len, Pointer};

use crate::{
    conversion::{date_to_sql_string, numeric_to_string, time_to_sql_string, timestamp_to_sql_string},
    error::Error,
    handles::{
        DescriptorKind, Nullability, ParameterDescription, Statement, StatementEvent,
        StatementEventListener, DataType,
    },
};

use super::{
    fixed_sized::{
        BigIntColumn, DateColumn, DoubleColumn, LongColumn, NumericColumn, RealColumn,
        ShortColumn, TimeColumn, TimestampColumn, UBigIntColumn, ULongColumn, UShortColumn,
    },
    opaque::OpaqueColumn,
    text_column::{BinaryColumn, CharColumn, WCharColumn},
    BindingRegistry, ColumnFlags, ColumnProperties, Indicator,
};

/// Arguments passed to `SQLBindCol` and `SQLBindParameter` for one buffer.
pub(crate) struct BindArgs {
    pub c_type: CDataType,
    pub value_ptr: Pointer,
    pub length: Len,
    pub indicator_ptr: *mut Len,
}

/// The closed family of column buffer kinds.
///
/// Every variant wraps a shared, interior mutable buffer; cloning the enum clones the `Rc`, not
/// the storage. Uniform operations over the family are expressed as exhaustive matches, one per
/// method.
#[derive(Clone)]
pub enum ColumnBuffer {
    Short(Rc<ShortColumn>),
    UShort(Rc<UShortColumn>),
    Long(Rc<LongColumn>),
    ULong(Rc<ULongColumn>),
    BigInt(Rc<BigIntColumn>),
    UBigInt(Rc<UBigIntColumn>),
    Real(Rc<RealColumn>),
    Double(Rc<DoubleColumn>),
    Date(Rc<DateColumn>),
    Time(Rc<TimeColumn>),
    Timestamp(Rc<TimestampColumn>),
    Numeric(Rc<NumericColumn>),
    Char(Rc<CharColumn>),
    WChar(Rc<WCharColumn>),
    Binary(Rc<BinaryColumn>),
    Opaque(Rc<OpaqueColumn>),
}

macro_rules! dispatch {
    ($value:expr, $buffer:ident => $body:expr) => {
        match $value {
            ColumnBuffer::Short($buffer) => $body,
            ColumnBuffer::UShort($buffer) => $body,
            ColumnBuffer::Long($buffer) => $body,
            ColumnBuffer::ULong($buffer) => $body,
            ColumnBuffer::BigInt($buffer) => $body,
            ColumnBuffer::UBigInt($buffer) => $body,
            ColumnBuffer::Real($buffer) => $body,
            ColumnBuffer::Double($buffer) => $body,
            ColumnBuffer::Date($buffer) => $body,
            ColumnBuffer::Time($buffer) => $body,
            ColumnBuffer::Timestamp($buffer) => $body,
            ColumnBuffer::Numeric($buffer) => $body,
            ColumnBuffer::Char($buffer) => $body,
            ColumnBuffer::WChar($buffer) => $body,
            ColumnBuffer::Binary($buffer) => $body,
            ColumnBuffer::Opaque($buffer) => $body,
        }
    };
}

impl ColumnBuffer {
    /// The identifier under which the buffer's column is referenced within queries.
    pub fn query_name(&self) -> &str {
        dispatch!(self, b => &b.properties().query_name)
    }

    pub fn properties(&self) -> &ColumnProperties {
        dispatch!(self, b => b.properties())
    }

    pub fn flags(&self) -> ColumnFlags {
        dispatch!(self, b => b.flags())
    }

    pub fn c_type(&self) -> CDataType {
        dispatch!(self, b => b.c_type())
    }

    pub fn indicator(&self) -> Indicator {
        dispatch!(self, b => b.indicator())
    }

    pub fn is_null(&self) -> bool {
        dispatch!(self, b => b.is_null())
    }

    /// Sets the buffer to NULL. Panics for buffers without the [`ColumnFlags::NULLABLE`] flag.
    pub fn set_null(&self) {
        dispatch!(self, b => b.set_null())
    }

    /// `true` if this buffer currently holds a binding to `statement`, as column or parameter.
    pub fn is_bound_to(&self, statement: &Statement) -> bool {
        dispatch!(self, b => b.is_bound_to(statement))
    }

    /// Number of statement bindings this buffer currently tracks.
    pub fn binding_count(&self) -> usize {
        self.registry().len()
    }

    /// Synthesizes a parameter description from the buffer's own column properties. Used as the
    /// fallback when the driver cannot be asked to describe the parameter.
    pub fn parameter_description(&self) -> ParameterDescription {
        let properties = self.properties();
        let nullability = if self.flags().contains(ColumnFlags::NULLABLE) {
            Nullability::Nullable
        } else {
            Nullability::NoNulls
        };
        ParameterDescription {
            data_type: DataType::new(
                properties.sql_type,
                properties.column_size,
                properties.decimal_digits,
            ),
            nullability,
        }
    }

    /// Binds this buffer to a result set column of `statement`.
    ///
    /// Scalar kinds go through `SQLBindCol`. Numeric buffers are attached through the
    /// application row descriptor instead, which is the only way to communicate precision and
    /// scale of the `SQL_NUMERIC_STRUCT` to the driver.
    pub fn bind_as_column(
        &self,
        statement: &Rc<Statement>,
        column_number: u16,
    ) -> Result<(), Error> {
        let args = self.bind_args();
        if args.c_type == CDataType::Numeric {
            self.bind_through_descriptor(
                statement,
                DescriptorKind::Row,
                column_number,
                &args,
                true,
            )?;
        } else {
            unsafe {
                statement.bind_col(
                    column_number,
                    args.c_type,
                    args.value_ptr,
                    args.length,
                    args.indicator_ptr,
                )
            }
            .into_result(statement.as_ref())?;
        }
        let token = statement.subscribe(StatementEvent::ColumnsUnbound, self.listener());
        self.registry()
            .register(statement, token, StatementEvent::ColumnsUnbound);
        Ok(())
    }

    /// Binds this buffer as an input parameter of `statement`.
    ///
    /// `description` supplies the SQL type, column size and decimal digits the driver expects;
    /// obtain it from `SQLDescribeParam` or synthesize it with
    /// [`ColumnBuffer::parameter_description`]. Numeric buffers additionally write precision and
    /// scale into the application parameter descriptor.
    pub fn bind_as_parameter(
        &self,
        statement: &Rc<Statement>,
        parameter_number: u16,
        description: &ParameterDescription,
    ) -> Result<(), Error> {
        let args = self.bind_args();
        unsafe {
            statement.bind_input_parameter(
                parameter_number,
                args.c_type,
                description.data_type,
                args.value_ptr,
                args.length,
                args.indicator_ptr,
            )
        }
        .into_result(statement.as_ref())?;
        if args.c_type == CDataType::Numeric {
            // Binding the parameter reset the descriptor record, precision and scale have to be
            // set afterwards, and the data pointer anew.
            self.bind_through_descriptor(
                statement,
                DescriptorKind::Param,
                parameter_number,
                &args,
                false,
            )?;
        }
        let token = statement.subscribe(StatementEvent::ParamsReset, self.listener());
        self.registry()
            .register(statement, token, StatementEvent::ParamsReset);
        Ok(())
    }

    /// A human readable rendition of the current value, `None` for NULL. Used by diagnostic
    /// output and the interactive sample.
    pub fn string_value(&self) -> Option<String> {
        match self {
            ColumnBuffer::Short(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::UShort(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::Long(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::ULong(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::BigInt(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::UBigInt(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::Real(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::Double(b) => b.value().ok().map(|v| v.to_string()),
            ColumnBuffer::Date(b) => b.value().ok().map(|v| date_to_sql_string(&v)),
            ColumnBuffer::Time(b) => b.value().ok().map(|v| time_to_sql_string(&v)),
            ColumnBuffer::Timestamp(b) => b
                .value()
                .ok()
                .map(|v| timestamp_to_sql_string(&v, v.fraction != 0)),
            ColumnBuffer::Numeric(b) => b.value().ok().map(|v| numeric_to_string(&v)),
            ColumnBuffer::Char(b) => b
                .value()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            ColumnBuffer::WChar(b) => b.value().map(|chars| String::from_utf16_lossy(&chars)),
            ColumnBuffer::Binary(b) => b.value().map(|bytes| {
                bytes
                    .iter()
                    .map(|byte| format!("{byte:02X}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
            ColumnBuffer::Opaque(b) => {
                if b.is_null() {
                    None
                } else {
                    Some("(opaque)".to_string())
                }
            }
        }
    }

    fn bind_args(&self) -> BindArgs {
        dispatch!(self, b => BindArgs {
            c_type: b.c_type(),
            value_ptr: b.value_ptr(),
            length: b.buffer_byte_len(),
            indicator_ptr: b.indicator_ptr(),
        })
    }

    fn registry(&self) -> &BindingRegistry {
        dispatch!(self, b => &b.bindings)
    }

    fn listener(&self) -> Weak<dyn StatementEventListener> {
        fn to_dyn_rc(rc: Rc<impl StatementEventListener + 'static>) -> Rc<dyn StatementEventListener> {
            rc
        }
        dispatch!(self, b => Rc::downgrade(&to_dyn_rc(Rc::clone(b))))
    }

    fn bind_through_descriptor(
        &self,
        statement: &Rc<Statement>,
        kind: DescriptorKind,
        record_number: u16,
        args: &BindArgs,
        set_type: bool,
    ) -> Result<(), Error> {
        let properties = self.properties();
        let record_number = record_number as i16;
        let mut descriptor = statement
            .descriptor(kind)
            .into_result(statement.as_ref())?;
        unsafe {
            if set_type {
                descriptor
                    .set_type(record_number, CDataType::Numeric)
                    .into_result(statement.as_ref())?;
            }
            descriptor
                .set_precision(record_number, properties.column_size as i16)
                .into_result(statement.as_ref())?;
            descriptor
                .set_scale(record_number, properties.decimal_digits)
                .into_result(statement.as_ref())?;
            // Type, precision and scale reset the data pointer, it must be set after them.
            descriptor
                .set_data_ptr(record_number, args.value_ptr)
                .into_result(statement.as_ref())?;
            descriptor
                .set_octet_length_ptr(record_number, args.indicator_ptr)
                .into_result(statement.as_ref())?;
            descriptor
                .set_indicator_ptr(record_number, args.indicator_ptr)
                .into_result(statement.as_ref())?;
        }
        Ok(())
    }
}

use std::{
    cell::Cell,
    mem::size_of,
    rc::Rc,
};

use odbc_sys::{CDataType, Date, Numeric, Pointer, SqlDataType, Time, Timestamp, NULL_DATA};

use crate::{
    error::Error,
    handles::{Statement, StatementEvent, StatementEventListener},
};

use super::{BindingRegistry, ColumnFlags, ColumnProperties, Indicator};

/// Trait implemented to fixed sized types which have a corresponding C data type, so they can be
/// transported in a [`FixedColumn`].
///
/// # Safety
///
/// `C_DATA_TYPE` must describe the memory layout of `Self` exactly, since the driver writes into
/// the buffer through it.
pub unsafe trait FixedSizedCType: Default + Copy + 'static {
    /// ODBC C Data type used to bind instances to a statement.
    const C_DATA_TYPE: CDataType;
    /// SQL data type used when a parameter description has to be synthesized from the buffer.
    const SQL_DATA_TYPE: SqlDataType;
}

unsafe impl FixedSizedCType for i16 {
    const C_DATA_TYPE: CDataType = CDataType::SShort;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::SMALLINT;
}

unsafe impl FixedSizedCType for u16 {
    const C_DATA_TYPE: CDataType = CDataType::UShort;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::SMALLINT;
}

unsafe impl FixedSizedCType for i32 {
    const C_DATA_TYPE: CDataType = CDataType::SLong;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::INTEGER;
}

unsafe impl FixedSizedCType for u32 {
    const C_DATA_TYPE: CDataType = CDataType::ULong;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::INTEGER;
}

unsafe impl FixedSizedCType for i64 {
    const C_DATA_TYPE: CDataType = CDataType::SBigInt;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::EXT_BIG_INT;
}

unsafe impl FixedSizedCType for u64 {
    const C_DATA_TYPE: CDataType = CDataType::UBigInt;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::EXT_BIG_INT;
}

unsafe impl FixedSizedCType for f32 {
    const C_DATA_TYPE: CDataType = CDataType::Float;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::REAL;
}

unsafe impl FixedSizedCType for f64 {
    const C_DATA_TYPE: CDataType = CDataType::Double;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::DOUBLE;
}

unsafe impl FixedSizedCType for Date {
    const C_DATA_TYPE: CDataType = CDataType::TypeDate;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::DATE;
}

unsafe impl FixedSizedCType for Time {
    const C_DATA_TYPE: CDataType = CDataType::TypeTime;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::TIME;
}

unsafe impl FixedSizedCType for Timestamp {
    const C_DATA_TYPE: CDataType = CDataType::TypeTimestamp;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::TIMESTAMP;
}

unsafe impl FixedSizedCType for Numeric {
    const C_DATA_TYPE: CDataType = CDataType::Numeric;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::NUMERIC;
}

/// A buffer transporting a single element of a fixed sized C type, together with its length
/// indicator.
///
/// The ODBC 2 date and time C types share their memory layout with the ODBC 3 ones, they differ
/// only in the type code used at bind time. [`FixedColumn::with_c_type`] selects the ODBC 2
/// code where an old driver requires it.
pub struct FixedColumn<T> {
    value: Cell<T>,
    indicator: Cell<isize>,
    c_type: CDataType,
    properties: ColumnProperties,
    flags: ColumnFlags,
    pub(crate) bindings: BindingRegistry,
}

pub type ShortColumn = FixedColumn<i16>;
pub type UShortColumn = FixedColumn<u16>;
pub type LongColumn = FixedColumn<i32>;
pub type ULongColumn = FixedColumn<u32>;
pub type BigIntColumn = FixedColumn<i64>;
pub type UBigIntColumn = FixedColumn<u64>;
pub type RealColumn = FixedColumn<f32>;
pub type DoubleColumn = FixedColumn<f64>;
pub type DateColumn = FixedColumn<Date>;
pub type TimeColumn = FixedColumn<Time>;
pub type TimestampColumn = FixedColumn<Timestamp>;
pub type NumericColumn = FixedColumn<Numeric>;

impl<T: FixedSizedCType> FixedColumn<T> {
    /// A new buffer for the given query name, bound with the default C type of `T`.
    pub fn new(query_name: impl Into<String>, flags: ColumnFlags) -> Rc<Self> {
        Self::with_properties(
            ColumnProperties::new(query_name, T::SQL_DATA_TYPE),
            flags,
        )
    }

    /// A new buffer with explicit column properties, e.g. precision and scale for a numeric
    /// column.
    pub fn with_properties(properties: ColumnProperties, flags: ColumnFlags) -> Rc<Self> {
        Self::with_c_type(properties, flags, T::C_DATA_TYPE)
    }

    /// A new buffer bound with an explicit C type code. Use this to request the ODBC 2 variants
    /// `SQL_C_DATE`, `SQL_C_TIME` and `SQL_C_TIMESTAMP`.
    pub fn with_c_type(
        properties: ColumnProperties,
        flags: ColumnFlags,
        c_type: CDataType,
    ) -> Rc<Self> {
        Rc::new(Self {
            value: Cell::new(T::default()),
            indicator: Cell::new(NULL_DATA),
            c_type,
            properties,
            flags,
            bindings: BindingRegistry::default(),
        })
    }
}

impl<T: FixedSizedCType> FixedColumn<T> {
    /// Value currently held, or an [`Error::NullValue`] if the indicator signals NULL.
    pub fn value(&self) -> Result<T, Error> {
        if self.is_null() {
            return Err(Error::NullValue {
                column: self.properties.query_name.clone(),
            });
        }
        Ok(self.value.get())
    }

    /// Stores `value` and adjusts the indicator to the element size.
    pub fn set_value(&self, value: T) {
        self.value.set(value);
        self.indicator.set(size_of::<T>() as isize);
    }

    /// Sets the indicator to the NULL sentinel. Only allowed for buffers carrying the
    /// [`ColumnFlags::NULLABLE`] flag.
    pub fn set_null(&self) {
        assert!(
            self.flags.contains(ColumnFlags::NULLABLE),
            "set_null called on column buffer '{}' which is not nullable",
            self.properties.query_name
        );
        self.indicator.set(NULL_DATA);
    }

    pub fn is_null(&self) -> bool {
        self.indicator.get() == NULL_DATA
    }

    pub fn indicator(&self) -> Indicator {
        Indicator::from_isize(self.indicator.get())
    }

    pub fn c_type(&self) -> CDataType {
        self.c_type
    }

    pub fn properties(&self) -> &ColumnProperties {
        &self.properties
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    /// `true` if this buffer currently holds a binding to `statement`.
    pub fn is_bound_to(&self, statement: &Statement) -> bool {
        self.bindings.is_bound_to(statement)
    }

    pub(crate) fn value_ptr(&self) -> Pointer {
        self.value.as_ptr() as Pointer
    }

    /// Fixed sized types carry their length in the C type code; the bind calls ignore the
    /// buffer length argument for them.
    pub(crate) fn buffer_byte_len(&self) -> isize {
        0
    }

    pub(crate) fn indicator_ptr(&self) -> *mut isize {
        self.indicator.as_ptr()
    }
}

impl<T> StatementEventListener for FixedColumn<T> {
    fn statement_event(&self, statement: &Statement, event: StatementEvent) {
        self.bindings.forget_event(statement, event);
    }
}

#[cfg(test)]
mod tests {
    use super::{BigIntColumn, ColumnFlags, DoubleColumn, Indicator, LongColumn, ShortColumn};
    use std::mem::size_of;

    #[test]
    fn set_and_get_round_trip() {
        let buffer = LongColumn::new("id", ColumnFlags::READ_WRITE);
        buffer.set_value(42);
        assert_eq!(42, buffer.value().unwrap());
        assert_eq!(Indicator::Length(size_of::<i32>()), buffer.indicator());
    }

    #[test]
    fn fresh_buffer_is_null() {
        let buffer = ShortColumn::new("id", ColumnFlags::NULLABLE);
        assert!(buffer.is_null());
        assert!(buffer.value().is_err());
    }

    #[test]
    fn null_round_trip() {
        let buffer = LongColumn::new("id", ColumnFlags::NULLABLE | ColumnFlags::SELECT);
        buffer.set_value(42);
        assert!(!buffer.is_null());
        buffer.set_null();
        assert!(buffer.is_null());
        assert_eq!(Indicator::Null, buffer.indicator());
        buffer.set_value(42);
        assert!(!buffer.is_null());
        assert_eq!(42, buffer.value().unwrap());
    }

    #[test]
    #[should_panic(expected = "not nullable")]
    fn set_null_on_non_nullable_buffer_panics() {
        let buffer = BigIntColumn::new("id", ColumnFlags::SELECT);
        buffer.set_null();
    }

    #[test]
    fn indicator_tracks_element_size() {
        let buffer = DoubleColumn::new("price", ColumnFlags::SELECT);
        buffer.set_value(0.25);
        assert_eq!(Indicator::Length(size_of::<f64>()), buffer.indicator());
    }
}

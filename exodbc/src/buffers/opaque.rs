use std::{cell::Cell, rc::Rc};

use odbc_sys::{CDataType, Pointer, NULL_DATA};

use crate::handles::{Statement, StatementEvent, StatementEventListener};

use super::{BindingRegistry, ColumnFlags, ColumnProperties, Indicator};

/// A buffer over caller owned memory.
///
/// The caller provides the pointer, the byte length and the C type code describing the memory.
/// The buffer performs the same binding bookkeeping as the typed buffers, including the numeric
/// descriptor fields for `SQL_C_NUMERIC`, but it never reads, writes or frees the backing
/// memory itself. Only the length indicator is owned by the buffer.
pub struct OpaqueColumn {
    data_ptr: Pointer,
    length_bytes: isize,
    c_type: CDataType,
    n_elements: usize,
    indicator: Cell<isize>,
    properties: ColumnProperties,
    flags: ColumnFlags,
    pub(crate) bindings: BindingRegistry,
}

impl OpaqueColumn {
    /// A new buffer over the memory starting at `data_ptr`.
    ///
    /// # Safety
    ///
    /// * `data_ptr` must point to at least `length_bytes` of writable memory, laid out as
    ///   described by `c_type`.
    /// * The memory must stay valid for as long as this buffer, or any binding created from it,
    ///   exists. The buffer takes no ownership.
    pub unsafe fn new(
        data_ptr: Pointer,
        length_bytes: isize,
        c_type: CDataType,
        n_elements: usize,
        properties: ColumnProperties,
        flags: ColumnFlags,
    ) -> Rc<Self> {
        assert!(!data_ptr.is_null());
        Rc::new(Self {
            data_ptr,
            length_bytes,
            c_type,
            n_elements,
            indicator: Cell::new(NULL_DATA),
            properties,
            flags,
            bindings: BindingRegistry::default(),
        })
    }

    pub fn c_type(&self) -> CDataType {
        self.c_type
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn properties(&self) -> &ColumnProperties {
        &self.properties
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    /// Sets the indicator accompanying the caller owned memory.
    pub fn set_indicator(&self, indicator: Indicator) {
        if indicator == Indicator::Null {
            assert!(
                self.flags.contains(ColumnFlags::NULLABLE),
                "set_indicator(Null) called on column buffer '{}' which is not nullable",
                self.properties.query_name
            );
        }
        self.indicator.set(indicator.to_isize());
    }

    pub fn indicator(&self) -> Indicator {
        Indicator::from_isize(self.indicator.get())
    }

    /// Sets the indicator to the NULL sentinel. Only allowed for buffers carrying the
    /// [`ColumnFlags::NULLABLE`] flag.
    pub fn set_null(&self) {
        self.set_indicator(Indicator::Null);
    }

    pub fn is_null(&self) -> bool {
        self.indicator.get() == NULL_DATA
    }

    /// `true` if this buffer currently holds a binding to `statement`.
    pub fn is_bound_to(&self, statement: &Statement) -> bool {
        self.bindings.is_bound_to(statement)
    }

    pub(crate) fn buffer_byte_len(&self) -> isize {
        self.length_bytes
    }

    pub(crate) fn value_ptr(&self) -> Pointer {
        self.data_ptr
    }

    pub(crate) fn indicator_ptr(&self) -> *mut isize {
        self.indicator.as_ptr()
    }
}

impl StatementEventListener for OpaqueColumn {
    fn statement_event(&self, statement: &Statement, event: StatementEvent) {
        self.bindings.forget_event(statement, event);
    }
}

#[cfg(test)]
mod tests {
    use super::OpaqueColumn;
    use crate::buffers::{ColumnFlags, ColumnProperties, Indicator};
    use odbc_sys::{CDataType, Pointer, SqlDataType};

    #[test]
    fn indicator_round_trip_over_caller_memory() {
        let mut storage: i64 = 42;
        let buffer = unsafe {
            OpaqueColumn::new(
                &mut storage as *mut i64 as Pointer,
                std::mem::size_of::<i64>() as isize,
                CDataType::SBigInt,
                1,
                ColumnProperties::new("value", SqlDataType::EXT_BIG_INT),
                ColumnFlags::READ_WRITE | ColumnFlags::NULLABLE,
            )
        };
        assert!(buffer.is_null());
        buffer.set_indicator(Indicator::Length(8));
        assert!(!buffer.is_null());
        assert_eq!(Indicator::Length(8), buffer.indicator());
        buffer.set_null();
        assert!(buffer.is_null());
        assert_eq!(1, buffer.n_elements());
    }

    #[test]
    #[should_panic(expected = "not nullable")]
    fn null_indicator_requires_the_nullable_flag() {
        let mut storage: i32 = 0;
        let buffer = unsafe {
            OpaqueColumn::new(
                &mut storage as *mut i32 as Pointer,
                std::mem::size_of::<i32>() as isize,
                CDataType::SLong,
                1,
                ColumnProperties::new("value", SqlDataType::INTEGER),
                ColumnFlags::READ_WRITE,
            )
        };
        buffer.set_null();
    }
}

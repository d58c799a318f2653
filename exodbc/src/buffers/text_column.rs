use std::{cell::Cell, cell::RefCell, mem::size_of, rc::Rc};

use odbc_sys::{CDataType, Pointer, SqlDataType, NTS, NULL_DATA};

use crate::{
    error::Error,
    handles::{Statement, StatementEvent, StatementEventListener},
};

use super::{BindingRegistry, ColumnFlags, ColumnProperties, Indicator};

/// Character types a [`TextColumn`] can be instantiated with.
pub trait TextChar: Copy + Default + PartialEq + 'static {
    const C_DATA_TYPE: CDataType;
    const SQL_DATA_TYPE: SqlDataType;
    const ZERO: Self;
}

impl TextChar for u8 {
    const C_DATA_TYPE: CDataType = CDataType::Char;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::VARCHAR;
    const ZERO: u8 = 0;
}

impl TextChar for u16 {
    const C_DATA_TYPE: CDataType = CDataType::WChar;
    const SQL_DATA_TYPE: SqlDataType = SqlDataType::EXT_W_VARCHAR;
    const ZERO: u16 = 0;
}

/// A buffer holding a zero terminated character array of fixed capacity. The capacity is chosen
/// at construction and never changes, so the data pointer handed to the driver stays stable.
pub struct TextColumn<C> {
    values: RefCell<Vec<C>>,
    indicator: Cell<isize>,
    properties: ColumnProperties,
    flags: ColumnFlags,
    pub(crate) bindings: BindingRegistry,
}

/// Narrow character buffer, bound as `SQL_C_CHAR`.
pub type CharColumn = TextColumn<u8>;
/// Wide character buffer, bound as `SQL_C_WCHAR`.
pub type WCharColumn = TextColumn<u16>;

impl<C: TextChar> TextColumn<C> {
    /// A new buffer able to hold `n_elements` characters, including the terminating zero.
    pub fn new(n_elements: usize, query_name: impl Into<String>, flags: ColumnFlags) -> Rc<Self> {
        assert!(n_elements > 0);
        let mut properties = ColumnProperties::new(query_name, C::SQL_DATA_TYPE);
        properties.column_size = n_elements;
        Self::with_properties(n_elements, properties, flags)
    }

    /// A new buffer with explicit column properties.
    pub fn with_properties(
        n_elements: usize,
        properties: ColumnProperties,
        flags: ColumnFlags,
    ) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(vec![C::ZERO; n_elements]),
            indicator: Cell::new(NULL_DATA),
            properties,
            flags,
            bindings: BindingRegistry::default(),
        })
    }

    /// Number of characters the buffer can hold, including the terminating zero.
    pub fn capacity(&self) -> usize {
        self.values.borrow().len()
    }

    /// Copies `value` into the buffer and marks it as a zero terminated string.
    ///
    /// If `value` is shorter than the buffer capacity a terminating zero is appended if the
    /// value does not already end in one. A value filling the whole buffer must bring its own
    /// terminator, otherwise there is not enough space to terminate and the call fails.
    pub fn set_value(&self, value: &[C]) -> Result<(), Error> {
        let mut values = self.values.borrow_mut();
        let capacity = values.len();
        if value.len() > capacity {
            return Err(Error::IllegalArgument(format!(
                "Value of length {} exceeds the capacity {} of column buffer '{}'.",
                value.len(),
                capacity,
                self.properties.query_name
            )));
        }
        let terminated = value.last() == Some(&C::ZERO);
        if value.len() == capacity && !terminated {
            return Err(Error::IllegalArgument(format!(
                "Not enough space to terminate value in column buffer '{}'.",
                self.properties.query_name
            )));
        }
        values[..value.len()].copy_from_slice(value);
        if !terminated {
            values[value.len()] = C::ZERO;
        }
        self.indicator.set(NTS);
        Ok(())
    }

    /// The characters currently held, excluding the terminating zero. `None` if the value is
    /// NULL.
    pub fn value(&self) -> Option<Vec<C>> {
        if self.is_null() {
            return None;
        }
        let values = self.values.borrow();
        let end = match Indicator::from_isize(self.indicator.get()) {
            Indicator::Null => return None,
            Indicator::NullTerminated | Indicator::NoTotal => values
                .iter()
                .position(|c| *c == C::ZERO)
                .unwrap_or(values.len()),
            Indicator::Length(bytes) => (bytes / size_of::<C>()).min(values.len()),
        };
        Some(values[..end].to_vec())
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
        C::C_DATA_TYPE
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

    /// Length of the buffer in bytes, as passed to the bind calls.
    pub(crate) fn buffer_byte_len(&self) -> isize {
        (self.capacity() * size_of::<C>()) as isize
    }

    pub(crate) fn value_ptr(&self) -> Pointer {
        self.values.borrow_mut().as_mut_ptr() as Pointer
    }

    pub(crate) fn indicator_ptr(&self) -> *mut isize {
        self.indicator.as_ptr()
    }
}

impl<C> StatementEventListener for TextColumn<C> {
    fn statement_event(&self, statement: &Statement, event: StatementEvent) {
        self.bindings.forget_event(statement, event);
    }
}

/// A buffer holding up to `capacity` bytes of binary data. Unlike character buffers binary
/// values carry no terminator; the indicator always holds the byte count.
pub struct BinaryColumn {
    values: RefCell<Vec<u8>>,
    indicator: Cell<isize>,
    properties: ColumnProperties,
    flags: ColumnFlags,
    pub(crate) bindings: BindingRegistry,
}

impl BinaryColumn {
    /// A new buffer able to hold `n_bytes` of binary data.
    pub fn new(n_bytes: usize, query_name: impl Into<String>, flags: ColumnFlags) -> Rc<Self> {
        assert!(n_bytes > 0);
        let mut properties = ColumnProperties::new(query_name, SqlDataType::EXT_VAR_BINARY);
        properties.column_size = n_bytes;
        Self::with_properties(n_bytes, properties, flags)
    }

    /// A new buffer with explicit column properties.
    pub fn with_properties(
        n_bytes: usize,
        properties: ColumnProperties,
        flags: ColumnFlags,
    ) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(vec![0; n_bytes]),
            indicator: Cell::new(NULL_DATA),
            properties,
            flags,
            bindings: BindingRegistry::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.values.borrow().len()
    }

    /// Copies `value` into the buffer and sets the indicator to its byte count.
    pub fn set_value(&self, value: &[u8]) -> Result<(), Error> {
        let mut values = self.values.borrow_mut();
        if value.len() > values.len() {
            return Err(Error::IllegalArgument(format!(
                "Value of length {} exceeds the capacity {} of column buffer '{}'.",
                value.len(),
                values.len(),
                self.properties.query_name
            )));
        }
        values[..value.len()].copy_from_slice(value);
        self.indicator.set(value.len() as isize);
        Ok(())
    }

    /// The bytes currently held. `None` if the value is NULL.
    pub fn value(&self) -> Option<Vec<u8>> {
        match Indicator::from_isize(self.indicator.get()) {
            Indicator::Null => None,
            Indicator::NullTerminated | Indicator::NoTotal => Some(self.values.borrow().clone()),
            Indicator::Length(n) => {
                let values = self.values.borrow();
                Some(values[..n.min(values.len())].to_vec())
            }
        }
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
        CDataType::Binary
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

    pub(crate) fn buffer_byte_len(&self) -> isize {
        self.capacity() as isize
    }

    pub(crate) fn value_ptr(&self) -> Pointer {
        self.values.borrow_mut().as_mut_ptr() as Pointer
    }

    pub(crate) fn indicator_ptr(&self) -> *mut isize {
        self.indicator.as_ptr()
    }
}

impl StatementEventListener for BinaryColumn {
    fn statement_event(&self, statement: &Statement, event: StatementEvent) {
        self.bindings.forget_event(statement, event);
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryColumn, CharColumn, WCharColumn};
    use crate::buffers::{ColumnFlags, Indicator};

    #[test]
    fn terminator_is_appended_for_short_values() {
        let buffer = CharColumn::new(8, "name", ColumnFlags::READ_WRITE);
        buffer.set_value(b"Cat").unwrap();
        assert_eq!(Indicator::NullTerminated, buffer.indicator());
        assert_eq!(b"Cat".to_vec(), buffer.value().unwrap());
    }

    #[test]
    fn value_filling_the_buffer_must_bring_its_own_terminator() {
        let buffer = CharColumn::new(4, "name", ColumnFlags::READ_WRITE);
        let error = buffer.set_value(b"Frog").unwrap_err();
        assert!(error.to_string().contains("Not enough space to terminate"));
        // With terminator included the same length fits.
        buffer.set_value(b"Dog\0").unwrap();
        assert_eq!(b"Dog".to_vec(), buffer.value().unwrap());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let buffer = CharColumn::new(4, "name", ColumnFlags::READ_WRITE);
        assert!(buffer.set_value(b"Tortoise").is_err());
    }

    #[test]
    fn wide_round_trip() {
        let buffer = WCharColumn::new(16, "name", ColumnFlags::READ_WRITE);
        let text: Vec<u16> = "Dog".encode_utf16().collect();
        buffer.set_value(&text).unwrap();
        assert_eq!(text, buffer.value().unwrap());
    }

    #[test]
    fn text_null_round_trip() {
        let buffer = CharColumn::new(8, "name", ColumnFlags::READ_WRITE | ColumnFlags::NULLABLE);
        buffer.set_value(b"Cat").unwrap();
        buffer.set_null();
        assert!(buffer.is_null());
        assert_eq!(None, buffer.value());
    }

    #[test]
    fn binary_round_trip_tracks_byte_count() {
        let buffer = BinaryColumn::new(8, "payload", ColumnFlags::READ_WRITE);
        buffer.set_value(&[1, 2, 3]).unwrap();
        assert_eq!(Indicator::Length(3), buffer.indicator());
        assert_eq!(vec![1, 2, 3], buffer.value().unwrap());
    }

    #[test]
    fn binary_rejects_oversized_values() {
        let buffer = BinaryColumn::new(2, "payload", ColumnFlags::READ_WRITE);
        assert!(buffer.set_value(&[1, 2, 3]).is_err());
    }
}

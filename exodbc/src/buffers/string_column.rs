use crate::{
    conversion::{utf16_to_utf8, utf8_to_utf16},
    error::{Error, NotSupportedKind},
};

use super::{text_column::CharColumn, text_column::WCharColumn, ColumnBuffer};

enum StringVariant<'b> {
    Narrow(&'b CharColumn),
    Wide(&'b WCharColumn),
}

/// Adapts narrow and wide character buffers to one UTF-8 get/set interface.
///
/// Narrow buffers are assumed to transport UTF-8, wide buffers UTF-16; the wrapper recodes
/// transparently. Constructing it over any other buffer kind yields an [`Error::Wrapper`].
pub struct StringColumnWrapper<'b> {
    variant: StringVariant<'b>,
}

impl<'b> StringColumnWrapper<'b> {
    pub fn new(buffer: &'b ColumnBuffer) -> Result<Self, Error> {
        let variant = match buffer {
            ColumnBuffer::Char(inner) => StringVariant::Narrow(inner),
            ColumnBuffer::WChar(inner) => StringVariant::Wide(inner),
            other => {
                return Err(Error::NotSupported {
                    kind: NotSupportedKind::SqlCType,
                    code: other.c_type() as i16,
                    message: format!(
                        "Column buffer '{}' is no character buffer.",
                        other.query_name()
                    ),
                }
                .wrap())
            }
        };
        Ok(Self { variant })
    }

    /// Stores `text` in the underlying buffer, converting to its character width.
    pub fn set(&self, text: &str) -> Result<(), Error> {
        match &self.variant {
            StringVariant::Narrow(buffer) => buffer.set_value(text.as_bytes()),
            StringVariant::Wide(buffer) => buffer.set_value(&utf8_to_utf16(text)),
        }
    }

    /// The current value as UTF-8, `None` for NULL.
    pub fn get(&self) -> Result<Option<String>, Error> {
        match &self.variant {
            StringVariant::Narrow(buffer) => buffer
                .value()
                .map(|bytes| {
                    String::from_utf8(bytes).map_err(|cause| {
                        Error::IllegalArgument(format!(
                            "Narrow character buffer holds no valid UTF-8: {cause}"
                        ))
                    })
                })
                .transpose(),
            StringVariant::Wide(buffer) => buffer
                .value()
                .map(|chars| utf16_to_utf8(&chars))
                .transpose(),
        }
    }

    pub fn is_null(&self) -> bool {
        match &self.variant {
            StringVariant::Narrow(buffer) => buffer.is_null(),
            StringVariant::Wide(buffer) => buffer.is_null(),
        }
    }

    /// Sets the underlying buffer to NULL. Panics for non-nullable buffers.
    pub fn set_null(&self) {
        match &self.variant {
            StringVariant::Narrow(buffer) => buffer.set_null(),
            StringVariant::Wide(buffer) => buffer.set_null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StringColumnWrapper;
    use crate::buffers::{CharColumn, ColumnBuffer, ColumnFlags, LongColumn, WCharColumn};

    #[test]
    fn narrow_round_trip() {
        let buffer = ColumnBuffer::Char(CharColumn::new(16, "name", ColumnFlags::READ_WRITE));
        let wrapper = StringColumnWrapper::new(&buffer).unwrap();
        wrapper.set("Cat").unwrap();
        assert_eq!(Some("Cat".to_string()), wrapper.get().unwrap());
    }

    #[test]
    fn wide_round_trip_recodes_utf8() {
        let buffer = ColumnBuffer::WChar(WCharColumn::new(16, "name", ColumnFlags::READ_WRITE));
        let wrapper = StringColumnWrapper::new(&buffer).unwrap();
        wrapper.set("Dog Ω").unwrap();
        assert_eq!(Some("Dog Ω".to_string()), wrapper.get().unwrap());
    }

    #[test]
    fn non_text_buffer_is_rejected_with_a_wrapped_error() {
        let buffer = ColumnBuffer::Long(LongColumn::new("id", ColumnFlags::READ_WRITE));
        let error = StringColumnWrapper::new(&buffer).unwrap_err();
        assert!(matches!(error, crate::error::Error::Wrapper { .. }));
    }

    #[test]
    fn null_round_trip() {
        let buffer = ColumnBuffer::Char(CharColumn::new(
            16,
            "name",
            ColumnFlags::READ_WRITE | ColumnFlags::NULLABLE,
        ));
        let wrapper = StringColumnWrapper::new(&buffer).unwrap();
        wrapper.set("Cat").unwrap();
        wrapper.set_null();
        assert!(wrapper.is_null());
        assert_eq!(None, wrapper.get().unwrap());
    }
}

//! Owned and borrowed text buffers for talking to the wide ODBC function calls.

use super::buffer::{buf_ptr, mut_buf_ptr};
use widestring::{U16CStr, U16String};

/// A UTF-8 string recoded to UTF-16, ready to be passed as an input argument to a wide ODBC
/// entry point.
pub struct SqlText {
    text: U16String,
}

impl SqlText {
    pub fn new(text: &str) -> Self {
        Self {
            text: U16String::from_str(text),
        }
    }

    pub fn ptr(&self) -> *const u16 {
        buf_ptr(self.text.as_slice())
    }

    /// Length in characters
    pub fn len_char(&self) -> usize {
        self.text.len()
    }
}

/// Receives zero terminated strings from ODBC functions which do not report a length, e.g. the
/// data source enumeration. The terminator, not a length value, decides where the string ends.
pub struct SzBuffer {
    buffer: Vec<u16>,
}

impl SzBuffer {
    /// Room for `capacity` characters plus the terminating zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity + 1],
        }
    }

    pub fn mut_buf(&mut self) -> &mut [u16] {
        self.buffer.resize(self.buffer.capacity(), 0);
        &mut self.buffer
    }

    /// Decodes everything up to the terminator as UTF-8.
    pub fn to_utf8(&self) -> String {
        let c_str = U16CStr::from_slice_truncate(&self.buffer)
            .expect("SzBuffer must contain terminating zero.");
        c_str.to_string_lossy()
    }
}

/// Output buffer for wide strings whose length the driver reports through a separate pointer,
/// such as the completed connection string of `SQLDriverConnect`. Keeping the reported length
/// lets callers detect truncation.
pub struct OutputStringBuffer {
    buffer: Vec<u16>,
    /// Filled by the driver with the length the string would have had, in characters and
    /// excluding the terminator.
    actual_length: i16,
}

impl OutputStringBuffer {
    /// A zero sized buffer. Passing it tells the driver the application has no interest in the
    /// output string, only in the call succeeding.
    pub fn empty() -> Self {
        Self::with_buffer_size(0)
    }

    /// Allocates room for `max_str_len` characters, terminator included. Connection strings can
    /// be long; 1024 is a reasonable choice for them.
    pub fn with_buffer_size(max_str_len: usize) -> Self {
        Self {
            buffer: vec![0; max_str_len],
            actual_length: 0,
        }
    }

    pub fn mut_buf_ptr(&mut self) -> *mut u16 {
        mut_buf_ptr(&mut self.buffer)
    }

    /// Buffer length in characters, terminator included.
    pub fn buf_len(&self) -> i16 {
        self.buffer.len().try_into().unwrap()
    }

    pub fn mut_actual_len_ptr(&mut self) -> *mut i16 {
        &mut self.actual_length as *mut i16
    }

    /// Decodes whatever the driver wrote. On truncation the whole buffer minus the terminator
    /// is returned, otherwise only the `actual_length` characters which belong to the string.
    pub fn to_utf8(&self) -> String {
        if self.buffer.is_empty() {
            return String::new();
        }

        let end = if self.is_truncated() {
            self.buffer.len() - 1
        } else {
            self.actual_length.try_into().unwrap()
        };
        String::from_utf16_lossy(&self.buffer[..end])
    }

    /// `true` if the string did not fit the buffer.
    pub fn is_truncated(&self) -> bool {
        self.actual_length >= self.buffer.len().try_into().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputStringBuffer, SqlText, SzBuffer};

    #[test]
    fn sql_text_length_is_in_characters() {
        let text = SqlText::new("SELECT 42");
        assert_eq!(9, text.len_char());
    }

    #[test]
    fn sz_buffer_truncates_at_terminating_zero() {
        let mut buffer = SzBuffer::with_capacity(10);
        let buf = buffer.mut_buf();
        for (index, character) in "dbo".encode_utf16().enumerate() {
            buf[index] = character;
        }
        assert_eq!("dbo", buffer.to_utf8());
    }

    #[test]
    fn empty_output_string_buffer_yields_empty_string() {
        let buffer = OutputStringBuffer::empty();
        assert_eq!("", buffer.to_utf8());
    }
}

use super::{as_handle::AsHandle, buffer::clamp_small_int};
use odbc_sys::{SQLGetDiagRecW, SqlReturn, SQLSTATE_SIZE};
use std::fmt;

/// A buffer large enough to hold an SQLSTATE for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// Can be returned from SQLDisconnect
    pub const INVALID_STATE_TRANSACTION: State = State(*b"25000");
    /// Returned by most cursor functions if no cursor is open on the statement.
    pub const INVALID_CURSOR_STATE: State = State(*b"24000");
    /// The driver does not implement an optional feature, e.g. scrollable cursors.
    pub const OPTIONAL_FEATURE_NOT_IMPLEMENTED: State = State(*b"HYC00");
    /// Invalid attribute or option identifier. Some drivers answer this instead of `HYC00` if
    /// asked to change an attribute they do not know.
    pub const INVALID_ATTRIBUTE_IDENTIFIER: State = State(*b"HY092");
    /// Given the specified Attribute value, an invalid value was specified in ValuePtr.
    pub const INVALID_ATTRIBUTE_VALUE: State = State(*b"HY024");
    /// String or binary data returned for a column resulted in the truncation of nonblank
    /// character or non-NULL binary data. If it was a string value, it was right-truncated.
    pub const STRING_DATA_RIGHT_TRUNCATION: State = State(*b"01004");

    /// Drops terminating zero and changes char type. `SQLGetDiagRecW` returns the state as wide
    /// characters, yet an SQLSTATE always consists of ASCII characters only.
    pub fn from_chars_with_nul(code: &[u16; SQLSTATE_SIZE + 1]) -> Self {
        let mut ascii = [0; SQLSTATE_SIZE];
        for (index, letter) in code[..SQLSTATE_SIZE].iter().copied().enumerate() {
            ascii[index] = letter as u8;
        }
        State(ascii)
    }

    /// View status code as string slice for displaying. Must always succeed as ODBC status codes
    /// always consist of ASCII characters.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap()
    }
}

/// ODBC diagnostic record.
///
/// The driver maintains a queue of these on every handle. The queue belonging to the last failed
/// call is consumed destructively by [`collect_diagnostics`]; no other code path may read it
/// between the failing call and the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// A five character SQLSTATE code. The first two characters indicate the class, the next
    /// three the subclass.
    pub state: State,
    /// Error code returned by the driver manager or driver.
    pub native_error: i32,
    /// Message text, decoded from the wide representation the driver answered with. Characters
    /// which are no valid unicode are replaced.
    pub message: String,
}

impl Record {
    /// Fill this diagnostic `Record` from any ODBC handle.
    ///
    /// `record_number` starts at `1`. Returns `true` if a record has been found, `false` if not.
    pub fn fill_from(&mut self, handle: &dyn AsHandle, record_number: i16) -> bool {
        // Diagnostic records in ODBC are indexed starting with 1.
        assert!(record_number > 0);

        let mut state = [0u16; SQLSTATE_SIZE + 1];
        let mut native_error = 0;
        // Total number of characters available to return, excluding the terminating zero.
        let mut text_length: i16 = 0;
        let mut message = vec![0u16; 512];

        let ret = unsafe {
            SQLGetDiagRecW(
                handle.handle_type(),
                handle.as_handle(),
                record_number,
                state.as_mut_ptr(),
                &mut native_error,
                message.as_mut_ptr(),
                clamp_small_int(message.len()),
                &mut text_length,
            )
        };

        match ret {
            SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO => {
                let mut required = text_length.max(0) as usize;
                if required + 1 > message.len() {
                    // Truncated. Grow the buffer and ask for the same record again.
                    message.resize(required + 1, 0);
                    let _ = unsafe {
                        SQLGetDiagRecW(
                            handle.handle_type(),
                            handle.as_handle(),
                            record_number,
                            state.as_mut_ptr(),
                            &mut native_error,
                            message.as_mut_ptr(),
                            clamp_small_int(message.len()),
                            &mut text_length,
                        )
                    };
                    required = text_length.max(0) as usize;
                }
                let mut end = required.min(message.len());
                // Some drivers pad the message with null-chars (which is still a valid C string,
                // but not a valid Rust string).
                while end > 0 && message[end - 1] == 0 {
                    end -= 1;
                }
                self.state = State::from_chars_with_nul(&state);
                self.native_error = native_error;
                self.message = String::from_utf16_lossy(&message[..end]);
                true
            }
            SqlReturn::NO_DATA => false,
            SqlReturn::ERROR => panic!("record_number argument of diagnostics must be > 0."),
            unexpected => panic!("SQLGetDiagRecW returned: {:?}", unexpected),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            self.message,
        )
    }
}

/// Consumes all diagnostic records currently associated with `handle` and returns them in order.
pub fn collect_diagnostics(handle: &dyn AsHandle) -> Vec<Record> {
    let mut records = Vec::new();
    let mut record = Record::default();
    let mut record_number = 1;
    while record.fill_from(handle, record_number) {
        records.push(record.clone());
        record_number += 1;
    }
    records
}

#[cfg(test)]
mod tests {

    use super::{Record, State};

    #[test]
    fn formatting() {
        let rec = Record {
            state: State(*b"HY010"),
            message: "[Microsoft][ODBC Driver Manager] Function sequence error".to_string(),
            ..Record::default()
        };

        assert_eq!(
            format!("{rec}"),
            "State: HY010, Native error: 0, Message: [Microsoft][ODBC Driver Manager] \
             Function sequence error"
        );
    }

    #[test]
    fn state_from_wide_chars() {
        let chars: [u16; 6] = [b'2' as u16, b'4' as u16, b'0' as u16, b'0' as u16, b'0' as u16, 0];
        assert_eq!(State::from_chars_with_nul(&chars), State::INVALID_CURSOR_STATE);
    }
}

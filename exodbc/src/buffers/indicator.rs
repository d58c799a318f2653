use odbc_sys::{NO_TOTAL, NTS, NULL_DATA};

/// Indicates existence and length of a value transported by a column buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Indicator {
    /// Value does not exist.
    Null,
    /// The value is a zero terminated string; its length is implied by the terminator.
    NullTerminated,
    /// Value exists, but its length has not been reported by the driver.
    NoTotal,
    /// Value exists. Indicates the number of bytes required to store it. In case of truncated
    /// data, this is the true length of the data, before truncation occurred.
    Length(usize),
}

impl Indicator {
    /// Creates an indicator from an `isize` indicator value as used by the ODBC C API.
    pub fn from_isize(indicator: isize) -> Self {
        match indicator {
            NULL_DATA => Indicator::Null,
            NTS => Indicator::NullTerminated,
            NO_TOTAL => Indicator::NoTotal,
            other => Indicator::Length(
                other
                    .try_into()
                    .expect("Length indicator must be non-negative."),
            ),
        }
    }

    /// Creates an indicator value as required by the ODBC C API.
    pub fn to_isize(self) -> isize {
        match self {
            Indicator::Null => NULL_DATA,
            Indicator::NullTerminated => NTS,
            Indicator::NoTotal => NO_TOTAL,
            Indicator::Length(len) => len.try_into().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Indicator;
    use odbc_sys::{NTS, NULL_DATA};

    #[test]
    fn round_trip_sentinels() {
        assert_eq!(Indicator::Null, Indicator::from_isize(NULL_DATA));
        assert_eq!(Indicator::NullTerminated, Indicator::from_isize(NTS));
        assert_eq!(NULL_DATA, Indicator::Null.to_isize());
        assert_eq!(NTS, Indicator::NullTerminated.to_isize());
    }

    #[test]
    fn length_round_trip() {
        assert_eq!(Indicator::Length(42), Indicator::from_isize(42));
        assert_eq!(42, Indicator::Length(42).to_isize());
    }
}

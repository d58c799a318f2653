use super::{as_handle::AsHandle, diagnostics::Record};
use log::{warn, Level};

/// Drains every diagnostic record queued on `handle` into the log, at warning level.
///
/// Used wherever the driver answers "success with info": the condition is worth surfacing, but
/// not worth failing the call over. Messages which are no valid unicode are logged with
/// replacement characters.
pub fn log_diagnostics(handle: &dyn AsHandle) {
    if log::max_level() < Level::Warn {
        // Nobody would see the records, skip the driver round trips entirely.
        return;
    }

    let mut record = Record::default();
    let mut record_number = 1;
    while record.fill_from(handle, record_number) {
        warn!("{record}");
        record_number += 1;
    }
}

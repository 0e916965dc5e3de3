//! Status report for the `status` command.

use chrono::{NaiveDateTime, NaiveTime};
use log::warn;

use crate::app::ports::FeedStore;
use crate::error::StorageError;
use crate::scheduler::first_occurrence;
use crate::state::FeedState;

pub const CORRUPT_NOTICE: &str = "State file corrupt, showing empty history";

/// Render the stored history plus the next daily occurrence.
///
/// A corrupt record is reported with a warning and rendered as empty
/// history.  Only an unreadable record is an error.
pub fn status_report<S: FeedStore>(
    store: &S,
    feed_time: NaiveTime,
    now: NaiveDateTime,
) -> Result<String, StorageError> {
    let mut out = String::new();
    let state = match store.load() {
        Ok(state) => state,
        Err(e) if e.is_corrupt() => {
            warn!("{}", e);
            out.push_str(CORRUPT_NOTICE);
            out.push('\n');
            FeedState::default()
        }
        Err(e) => return Err(e),
    };
    out.push_str(&state.render());
    out.push_str(&format!(
        "Next feed:       {} (daily at {})\n",
        first_occurrence(feed_time, now).format("%Y-%m-%d %H:%M:%S"),
        feed_time.format("%H:%M")
    ));
    Ok(out)
}

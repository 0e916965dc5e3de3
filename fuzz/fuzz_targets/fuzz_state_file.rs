//! Fuzz target: state-file decoder
//!
//! Feeds arbitrary bytes to `decode_state` and verifies:
//! - No panics under arbitrary input
//! - Every accepted document satisfies the counter invariant
//! - Folding one more attempt into an accepted state keeps it consistent
//!   (unless a counter is already saturated)
//!
//! cargo fuzz run fuzz_state_file

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use petfeeder::adapters::state_file::decode_state;
use petfeeder::state::FeedOutcome;

fuzz_target!(|data: &[u8]| {
    let Ok(mut state) = decode_state(data) else {
        return;
    };
    assert!(state.is_consistent(), "decoder accepted inconsistent counters");

    if state.total_count == u64::MAX {
        return;
    }
    let outcome = if data.len() % 2 == 0 {
        FeedOutcome::Success
    } else {
        FeedOutcome::Failed
    };
    let at = DateTime::from_timestamp(data.len() as i64 * 3600, 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default();
    state.apply(outcome, at, None, None);
    assert!(state.is_consistent(), "apply broke the counter invariant");
    assert_eq!(state.last_feed_at, Some(at));
});

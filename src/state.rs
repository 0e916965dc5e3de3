//! Persisted feed history.
//!
//! [`FeedState`] is the only entity that survives a restart.  Every feed
//! attempt is folded into it through [`FeedState::apply`], which is the
//! single place the counter invariants are maintained:
//!
//! - `total_count == success_count + failure_count`
//! - counters never decrease
//! - `last_feed_at` moves on every attempt, success or failure

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Outcome of the most recent attempt, as shown by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedStatus {
    Success,
    Failed,
    #[default]
    Unknown,
}

/// Outcome of a single feed attempt, as reported to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Success,
    Failed,
}

impl From<FeedOutcome> for FeedStatus {
    fn from(outcome: FeedOutcome) -> Self {
        match outcome {
            FeedOutcome::Success => Self::Success,
            FeedOutcome::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedState {
    pub last_feed_at: Option<NaiveDateTime>,
    pub last_feed_status: FeedStatus,
    /// Set by the first successful feed, never cleared.
    pub active: bool,
    pub total_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Advisory copy of the scheduler's next fire time.
    pub next_scheduled_at: Option<NaiveDateTime>,
    /// Cause of the most recent failed attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl FeedState {
    /// Fold one attempt into the history.
    pub fn apply(
        &mut self,
        outcome: FeedOutcome,
        at: NaiveDateTime,
        next_scheduled_at: Option<NaiveDateTime>,
        error: Option<String>,
    ) {
        self.total_count = self.total_count.saturating_add(1);
        match outcome {
            FeedOutcome::Success => {
                self.success_count = self.success_count.saturating_add(1);
                self.active = true;
                self.last_error = None;
            }
            FeedOutcome::Failed => {
                self.failure_count = self.failure_count.saturating_add(1);
                self.last_error = error;
            }
        }
        self.last_feed_at = Some(at);
        self.last_feed_status = outcome.into();
        if next_scheduled_at.is_some() {
            self.next_scheduled_at = next_scheduled_at;
        }
    }

    /// True when the counters satisfy the sum invariant.
    pub fn is_consistent(&self) -> bool {
        self.success_count.checked_add(self.failure_count) == Some(self.total_count)
    }

    /// Whether any attempt has ever been recorded.
    pub fn has_history(&self) -> bool {
        self.last_feed_at.is_some()
    }

    /// Human-readable status block for the `status` command.
    pub fn render(&self) -> String {
        let fmt_ts = |ts: Option<NaiveDateTime>| {
            ts.map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        };
        let mut out = String::new();
        out.push_str(&format!("Active:          {}\n", if self.active { "yes" } else { "no" }));
        out.push_str(&format!("Last feed:       {}\n", fmt_ts(self.last_feed_at)));
        out.push_str(&format!("Last status:     {:?}\n", self.last_feed_status));
        if let Some(err) = &self.last_error {
            out.push_str(&format!("Last error:      {err}\n"));
        }
        out.push_str(&format!(
            "Feeds:           {} total, {} ok, {} failed\n",
            self.total_count, self.success_count, self.failure_count
        ));
        out.push_str(&format!("Next scheduled:  {}\n", fmt_ts(self.next_scheduled_at)));
        out
    }
}

//! Download jobs: identity, immutable request, and runtime state.
//!
//! A `Job` is created by the front end from a validated `JobRequest`, lives in
//! the scheduler's pending queue or active set, and ends as a `HistoryRecord`.

mod id;
mod state;
mod types;

pub use id::JobIdGen;
pub use state::Job;
pub use types::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds (completion timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

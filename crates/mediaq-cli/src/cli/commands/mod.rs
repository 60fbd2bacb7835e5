//! CLI command handlers, one file per command.

mod clear_history;
mod forget;
mod get;
mod history;
mod probe;

pub use clear_history::run_clear_history;
pub use forget::run_forget;
pub use get::run_get;
pub use history::run_history;
pub use probe::run_probe;

use mediaq_core::config::MediaqConfig;
use mediaq_core::HistoryStore;

/// History at the default state path. Falls back to an in-memory store when
/// no state directory can be resolved.
fn open_history(cfg: &MediaqConfig) -> HistoryStore {
    match HistoryStore::default_path() {
        Ok(path) => HistoryStore::load(path, cfg.history_limit),
        Err(e) => {
            tracing::warn!("history file unavailable, not persisting: {:#}", e);
            HistoryStore::in_memory(cfg.history_limit)
        }
    }
}

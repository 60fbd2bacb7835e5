//! `mediaq clear-history` – delete all history entries.

use anyhow::Result;
use mediaq_core::config::MediaqConfig;

use super::open_history;

pub fn run_clear_history(cfg: &MediaqConfig) -> Result<()> {
    let mut store = open_history(cfg);
    let removed = store.len();
    store.clear();
    tracing::info!(removed, "history cleared");
    println!("Cleared {removed} history entr{}.", if removed == 1 { "y" } else { "ies" });
    Ok(())
}

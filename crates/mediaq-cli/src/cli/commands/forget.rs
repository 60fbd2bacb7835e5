//! `mediaq forget` – delete one history entry by job ID.

use anyhow::{bail, Result};
use mediaq_core::config::MediaqConfig;
use mediaq_core::JobId;

use super::open_history;

pub fn run_forget(cfg: &MediaqConfig, id: u64) -> Result<()> {
    let mut store = open_history(cfg);
    if !store.forget(JobId(id)) {
        bail!("no history entry with ID {id}");
    }
    println!("Forgot job {id}.");
    Ok(())
}

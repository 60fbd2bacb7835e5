//! `mediaq history` – show finished jobs, newest first.

use anyhow::Result;
use mediaq_core::config::MediaqConfig;

use super::open_history;
use crate::cli::format;

pub fn run_history(cfg: &MediaqConfig, limit: Option<usize>) -> Result<()> {
    let store = open_history(cfg);
    if store.is_empty() {
        println!("No downloads in history.");
        return Ok(());
    }
    println!("{:<15} {:<10} {:<10} {}", "ID", "STATUS", "SIZE", "TITLE");
    for r in store.records().iter().take(limit.unwrap_or(usize::MAX)) {
        let size = if r.file_size > 0 {
            format::size(r.file_size)
        } else {
            "-".to_string()
        };
        let label = if r.title.is_empty() { &r.url } else { &r.title };
        println!(
            "{:<15} {:<10} {:<10} {}",
            r.download_id.to_string(),
            r.status.as_str(),
            size,
            format::ellipsize(label, 60)
        );
        if let Some(ref err) = r.error_message {
            println!("{:<15} {}", "", err);
        }
    }
    Ok(())
}

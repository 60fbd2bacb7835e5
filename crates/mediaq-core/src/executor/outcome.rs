//! Map the tool's exit to a job outcome.

use crate::error::ExecError;

/// What was observed while the tool ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    pub success: bool,
    /// None when the process was killed by a signal.
    pub code: Option<i32>,
    pub playlist: bool,
    /// Files the tool reported as finished.
    pub items_finished: usize,
    /// `ERROR:` messages from stderr, in order.
    pub errors: Vec<String>,
}

/// A clean exit completes the job. A playlist job that finished at least one
/// item also completes: the tool exits non-zero when it skipped unavailable
/// entries. Anything else is an error carrying the last reported message.
pub fn classify_exit(report: &ExitReport) -> Result<(), ExecError> {
    if report.success {
        return Ok(());
    }
    if report.playlist && report.items_finished > 0 {
        tracing::info!(
            finished = report.items_finished,
            skipped = report.errors.len(),
            "playlist completed with unavailable items skipped"
        );
        return Ok(());
    }
    let message = match (report.errors.last(), report.code) {
        (Some(msg), _) => msg.clone(),
        (None, Some(code)) => format!("yt-dlp exited with status {code}"),
        (None, None) => "yt-dlp was terminated by a signal".to_string(),
    };
    Err(ExecError::Tool(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(playlist: bool, items_finished: usize, errors: &[&str]) -> ExitReport {
        ExitReport {
            success: false,
            code: Some(1),
            playlist,
            items_finished,
            errors: errors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn clean_exit_completes() {
        let report = ExitReport {
            success: true,
            code: Some(0),
            ..ExitReport::default()
        };
        assert!(classify_exit(&report).is_ok());
    }

    #[test]
    fn playlist_with_one_unavailable_item_completes() {
        let report = failed(true, 4, &["[youtube] item2: Video unavailable"]);
        assert!(classify_exit(&report).is_ok());
    }

    #[test]
    fn playlist_with_nothing_downloaded_fails() {
        let report = failed(true, 0, &["first", "[youtube] list: This playlist does not exist"]);
        match classify_exit(&report) {
            Err(ExecError::Tool(msg)) => assert_eq!(msg, "[youtube] list: This playlist does not exist"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn single_item_failure_is_error_even_after_finish() {
        // e.g. download finished but post-processing failed
        let report = failed(false, 1, &["Postprocessing: ffprobe not found"]);
        assert!(matches!(classify_exit(&report), Err(ExecError::Tool(_))));
    }

    #[test]
    fn message_falls_back_to_exit_code_or_signal() {
        match classify_exit(&failed(false, 0, &[])) {
            Err(ExecError::Tool(msg)) => assert_eq!(msg, "yt-dlp exited with status 1"),
            other => panic!("unexpected: {other:?}"),
        }
        let killed = ExitReport {
            code: None,
            ..failed(false, 0, &[])
        };
        match classify_exit(&killed) {
            Err(ExecError::Tool(msg)) => assert!(msg.contains("signal")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

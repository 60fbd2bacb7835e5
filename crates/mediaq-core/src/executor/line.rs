//! Parsing of the tool's output lines.
//!
//! Progress is requested with a template that prints one tagged line per
//! callback: the JSON progress dictionary, then the JSON-encoded title and
//! thumbnail, separated by tabs. Missing fields come through as `NA`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::progress::Notification;

pub(crate) const PROGRESS_TAG: &str = "mediaq-progress ";

pub(crate) fn progress_template() -> String {
    format!("download:{PROGRESS_TAG}%(progress)j\t%(info.title)j\t%(info.thumbnail)j")
}

/// Parse a tagged progress line. Untagged or malformed lines yield None.
pub(crate) fn parse_progress_line(line: &str) -> Option<Notification> {
    let rest = line.trim().strip_prefix(PROGRESS_TAG.trim_end())?;
    let mut parts = rest.trim_start().split('\t');
    let mut n: Notification = serde_json::from_str(parts.next()?).ok()?;
    if let Some(title) = parts.next().and_then(json_string) {
        n.info.title = Some(title);
    }
    if let Some(thumbnail) = parts.next().and_then(json_string) {
        n.info.thumbnail = Some(thumbnail);
    }
    Some(n)
}

fn json_string(s: &str) -> Option<String> {
    serde_json::from_str::<Option<String>>(s.trim()).ok().flatten()
}

/// Next line from a child pipe, without its line terminator. `None` at end of
/// stream. Bytes that are not UTF-8 (filenames in the locale encoding) are
/// replaced, never treated as the end of output.
pub(crate) async fn next_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Message of an `ERROR:` line on stderr.
pub(crate) fn parse_error_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("ERROR:")
        .map(str::trim)
        .filter(|m| !m.is_empty())
}

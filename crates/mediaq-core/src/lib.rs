pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod history;
pub mod job;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod scheduler;

pub use error::{ExecError, ProbeError, RequestError};
pub use events::{EventBus, JobEvent, SubscriberId, Subscription};
pub use executor::{Backend, DownloadOptions, NotificationSink, YtDlp};
pub use history::{HistoryRecord, HistoryStore};
pub use job::{Job, JobId, JobRequest, JobStatus};
pub use probe::{FormatOption, ProbeResult, SubtitleOption};
pub use scheduler::Scheduler;

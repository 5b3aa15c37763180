/*!
 * Upload orchestration: classification, transfers, per-file tasks and dispatch
 */

pub mod chunked;
pub mod classify;
pub mod concurrency;
pub mod direct;
pub mod dispatcher;
pub mod sniff;
pub mod task;
pub mod walk;

pub use chunked::ChunkedTransfer;
pub use classify::TransferStrategy;
pub use direct::{DirectOutcome, DirectTransfer};
pub use dispatcher::{Dispatcher, FailedUpload, RunReport};
pub use task::{run_upload, CompletionEvent, UploadTask};
pub use walk::{collect_files, SourceFile};

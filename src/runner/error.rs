// RunnerError, runner::error
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RunnerError {
    // status provider unreachable or returned invalid data
    #[error("failed to poll stream status: {0}")]
    PollErr(String),

    // capture process could not be started
    #[error("failed to launch capture: {0}")]
    CaptureLaunchErr(String),

    // capture process exited non-zero, the partial file is still consolidated
    #[error("capture exited abnormally, exit_code={0}, desc={1}")]
    CaptureAbnormalExit(i32, String),

    // merge failed, inputs are preserved for retry
    #[error("failed to merge fragments: {0}")]
    ConsolidationMergeErr(String),

    #[error("failed to clean up fragment: {0}")]
    FragmentCleanupErr(String),

    #[error("error in file operation: {0}")]
    FileOperErr(String),

    #[error("internal system error: {0}")]
    InternalError(String),
}

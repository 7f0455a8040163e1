// RunnerFFMError, runner::ffmpeg::error
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RunnerFFMError {
    #[error("invalid ffmpeg cmd generation param: {0}")]
    InvalidCmdGenParameter(String),

    #[error("error in file operation: {0}")]
    FileOperErr(String),

    #[error("error on spawn ffmpeg={0}")]
    FFMpegSpawnErr(String),

    #[error("error on waiting ffmpeg={0}")]
    FFMpegWaitErr(String),

    #[error("error on terminate ffmpeg={0}")]
    FFMpegTermErr(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // for std::fs / tokio::fs operations
    #[error("{0}")]
    IoError(String),

    #[error("{0}")]
    InvalidPath(String),

    #[error("failed to load config, {0}")]
    ConfigLoadFailed(String),

    #[error("failed to save config, {0}")]
    ConfigSaveFailed(String),

    #[error("invalid config parameter, {0}")]
    InvalidConfigParameter(String),

    #[error("failed to init logger, {0}")]
    LoggerInitFailed(String),

    #[error("message channel is closed: {0}")]
    MsgChanErrChannelClosed(String),

    #[error("failed to message send to channel: {0}")]
    MsgChanErrSendFail(String),
}

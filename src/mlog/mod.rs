// mlog
// > log4rs setup, root logger follows LOGLEVEL / LOGFILE of the config
pub mod session;

use crate::{comm_fs, config::Config, error::Error};
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender, Append},
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
    Handle,
};

pub type MLogHandle = Handle;

const LOG_PATTERN: &str = "{d} - {t} - {l} - {m}{n}";
const APPENDER_MAIN: &str = "main";

fn build_log_config(config: &Config) -> Result<LogConfig, Error> {
    let encoder = Box::new(PatternEncoder::new(LOG_PATTERN));

    let appender: Box<dyn Append> = match &config.log_file {
        Some(log_file) => {
            if let Some(parent) = log_file.parent() {
                if !parent.as_os_str().is_empty() {
                    comm_fs::create_dir_sync(&parent)?;
                }
            }

            Box::new(
                FileAppender::builder()
                    .encoder(encoder)
                    .build(log_file)
                    .map_err(|e| {
                        Error::LoggerInitFailed(format!("{}, e={}", log_file.display(), e))
                    })?,
            )
        }
        None => Box::new(ConsoleAppender::builder().encoder(encoder).build()),
    };

    LogConfig::builder()
        .appender(Appender::builder().build(APPENDER_MAIN, appender))
        .build(
            Root::builder()
                .appender(APPENDER_MAIN)
                .build(config.log_level.0),
        )
        .map_err(|e| Error::LoggerInitFailed(e.to_string()))
}

pub fn init(config: &Config) -> Result<MLogHandle, Error> {
    let log_config = build_log_config(config)?;

    log4rs::init_config(log_config).map_err(|e| Error::LoggerInitFailed(e.to_string()))
}

// swap the running logger configuration, used on config reload
pub fn reconfigure(handle: &MLogHandle, config: &Config) -> Result<(), Error> {
    let log_config = build_log_config(config)?;
    handle.set_config(log_config);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_log_config_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = Config::default();
        cfg.log_file = Some(dir.path().join("logs/recorder.log"));

        build_log_config(&cfg).unwrap();

        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn build_log_config_uses_console_without_log_file() {
        assert!(build_log_config(&Config::default()).is_ok());
    }
}

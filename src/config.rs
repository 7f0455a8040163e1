// config
// > persisted json settings, loaded with the `config` crate
use crate::{
    comm::{rec_uuid_new, RecAsyncRwLock, RecTimeDuration},
    comm_fs,
    error::Error,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEF_CONFIG_FILE: &str = "streamrecorder_config.json";
pub const CONFIG_ENV_PREFIX: &str = "HLSREC";

const DEF_WEB_SERVICE_HOST: &str = "localhost";
const DEF_WEB_SERVICE_PORT: u16 = 3100;
const DEF_STATUS_TIMEOUT_SEC: u64 = 10;
const DEF_POLL_INTERVAL_SEC: u64 = 20;
const DEF_DEST_DIR: &str = "static/recordings";
const DEF_FILE_TYPE: &str = "mp4";
const DEF_FFMPEG_PATH: &str = "/usr/bin/ffmpeg";
const DEF_FFMPEG_VERBOSE: &str = "warning";
const DEF_CAPTURE_TERMINATE_TIMEOUT_SEC: u64 = 10;

const WORK_DIR_SUFFIX: &str = "streamRecorder";
const KEY_RECORDER_TEMP_DIR: &str = "RECORDER_TEMP_DIR";

//
// LogLevel
// > older deployments store python logging levels (10, 20, ..)
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(pub log::LevelFilter);

impl LogLevel {
    pub fn from_number(n: i64) -> Result<Self, String> {
        let level = match n {
            0 => log::LevelFilter::Trace,
            1..=10 => log::LevelFilter::Debug,
            11..=20 => log::LevelFilter::Info,
            21..=30 => log::LevelFilter::Warn,
            31..=50 => log::LevelFilter::Error,
            _ => return Err(format!("unknown numeric log level {}", n)),
        };

        Ok(Self(level))
    }

    pub fn from_name(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if let Ok(n) = s.parse::<i64>() {
            return Self::from_number(n);
        }

        let level = match s.to_ascii_lowercase().as_str() {
            "warning" => log::LevelFilter::Warn,
            "critical" => log::LevelFilter::Error,
            other => other
                .parse::<log::LevelFilter>()
                .map_err(|_| format!("unknown log level '{}'", s))?,
        };

        Ok(Self(level))
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(log::LevelFilter::Debug)
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string().to_lowercase())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LogLevelVisitor;

        impl<'de> de::Visitor<'de> for LogLevelVisitor {
            type Value = LogLevel;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a log level name or a numeric level")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LogLevel, E> {
                LogLevel::from_number(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LogLevel, E> {
                LogLevel::from_number(v as i64).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LogLevel, E> {
                LogLevel::from_name(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(LogLevelVisitor)
    }
}

//
// Config
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "WEB_SERVICE_HOST", alias = "web_service_host")]
    pub web_service_host: String,

    #[serde(rename = "WEB_SERVICE_PORT", alias = "web_service_port")]
    pub web_service_port: u16,

    // overrides http://{web_service_host}:{web_service_port}/video
    #[serde(rename = "STATUS_URL", alias = "status_url")]
    pub status_url: Option<String>,

    // second
    #[serde(rename = "STATUS_TIMEOUT", alias = "status_timeout")]
    pub status_timeout: u64,

    // second
    #[serde(rename = "POLL_INTERVAL", alias = "poll_interval")]
    pub poll_interval: u64,

    // work dir, created once and reused across restarts
    #[serde(rename = "RECORDER_TEMP_DIR", alias = "recorder_temp_dir")]
    pub recorder_temp_dir: Option<PathBuf>,

    // published dir
    #[serde(rename = "RECORDER_DEST_DIR", alias = "recorder_dest_dir")]
    pub recorder_dest_dir: PathBuf,

    #[serde(rename = "RECORDER_FILE_TYPE", alias = "recorder_file_type")]
    pub recorder_file_type: String,

    #[serde(rename = "LOGLEVEL", alias = "loglevel")]
    pub log_level: LogLevel,

    #[serde(rename = "LOGFILE", alias = "logfile")]
    pub log_file: Option<PathBuf>,

    #[serde(rename = "FFMPEG_PATH", alias = "ffmpeg_path")]
    pub ffmpeg_path: String,

    // quiet | panic | fatal | error | warning | info | verbose | debug | trace
    #[serde(rename = "FFMPEG_VERBOSE", alias = "ffmpeg_verbose")]
    pub ffmpeg_verbose: String,

    #[serde(rename = "FFMPEG_LOG_DIR", alias = "ffmpeg_log_dir")]
    pub ffmpeg_log_dir: Option<PathBuf>,

    #[serde(
        rename = "CAPTURE_TERMINATE_ON_SHUTDOWN",
        alias = "capture_terminate_on_shutdown"
    )]
    pub capture_terminate_on_shutdown: bool,

    // second
    #[serde(rename = "CAPTURE_TERMINATE_TIMEOUT", alias = "capture_terminate_timeout")]
    pub capture_terminate_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_service_host: DEF_WEB_SERVICE_HOST.to_string(),
            web_service_port: DEF_WEB_SERVICE_PORT,
            status_url: None,
            status_timeout: DEF_STATUS_TIMEOUT_SEC,
            poll_interval: DEF_POLL_INTERVAL_SEC,
            recorder_temp_dir: None,
            recorder_dest_dir: PathBuf::from(DEF_DEST_DIR),
            recorder_file_type: DEF_FILE_TYPE.to_string(),
            log_level: LogLevel::default(),
            log_file: None,
            ffmpeg_path: DEF_FFMPEG_PATH.to_string(),
            ffmpeg_verbose: DEF_FFMPEG_VERBOSE.to_string(),
            ffmpeg_log_dir: None,
            capture_terminate_on_shutdown: true,
            capture_terminate_timeout: DEF_CAPTURE_TERMINATE_TIMEOUT_SEC,
        }
    }
}

impl Config {
    pub fn status_url(&self) -> String {
        match &self.status_url {
            Some(url) => url.clone(),
            None => format!(
                "http://{}:{}/video",
                self.web_service_host, self.web_service_port
            ),
        }
    }

    pub fn poll_interval(&self) -> RecTimeDuration {
        RecTimeDuration::from_secs(self.poll_interval)
    }

    pub fn status_timeout(&self) -> RecTimeDuration {
        RecTimeDuration::from_secs(self.status_timeout)
    }

    pub fn capture_terminate_timeout(&self) -> RecTimeDuration {
        RecTimeDuration::from_secs(self.capture_terminate_timeout)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval == 0 {
            return Err(Error::InvalidConfigParameter(
                "POLL_INTERVAL must be greater than 0".to_string(),
            ));
        }

        if self.recorder_file_type.is_empty()
            || !self
                .recorder_file_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidConfigParameter(format!(
                "RECORDER_FILE_TYPE must be alphanumeric, got '{}'",
                self.recorder_file_type
            )));
        }

        if self.ffmpeg_path.is_empty() {
            return Err(Error::InvalidConfigParameter(
                "FFMPEG_PATH is empty".to_string(),
            ));
        }

        Ok(())
    }

    // defaults -> json file (optional) -> HLSREC_* environment -> LOGFILE environment
    pub fn load<P: AsRef<Path>>(config_file: P) -> Result<Self, Error> {
        let mut settings = config::Config::new();

        settings
            .merge(
                config::File::from(config_file.as_ref())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .map_err(|e| {
                Error::ConfigLoadFailed(format!("{}, e={}", config_file.as_ref().display(), e))
            })?
            .merge(config::Environment::with_prefix(CONFIG_ENV_PREFIX))
            .map_err(|e| Error::ConfigLoadFailed(format!("environment, e={}", e)))?;

        let mut loaded: Config = settings
            .try_into()
            .map_err(|e| Error::ConfigLoadFailed(e.to_string()))?;

        if let Ok(log_file) = std::env::var("LOGFILE") {
            if !log_file.is_empty() {
                loaded.log_file = Some(PathBuf::from(log_file));
            }
        }

        loaded.validate()?;

        Ok(loaded)
    }
}

// sets RECORDER_TEMP_DIR in the json file, every other key stays as it is on disk
// > a missing file is created with that key only
pub async fn save_work_dir<P: AsRef<Path>>(config_file: P, work_dir: &Path) -> Result<(), Error> {
    let path = config_file.as_ref();
    let save_err = |e: String| Error::ConfigSaveFailed(format!("{}, e={}", path.display(), e));

    let mut doc: serde_json::Value = match tokio::fs::read_to_string(path).await {
        Ok(s) if !s.trim().is_empty() => {
            serde_json::from_str(&s).map_err(|e| save_err(e.to_string()))?
        }
        Ok(_) => json!({}),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => json!({}),
        Err(e) => return Err(save_err(e.to_string())),
    };

    let obj = doc
        .as_object_mut()
        .ok_or_else(|| save_err("not a json object".to_string()))?;

    obj.retain(|k, _| !k.eq_ignore_ascii_case(KEY_RECORDER_TEMP_DIR));
    obj.insert(
        KEY_RECORDER_TEMP_DIR.to_string(),
        json!(work_dir.to_string_lossy()),
    );

    let out = serde_json::to_string_pretty(&doc).map_err(|e| save_err(e.to_string()))?;

    tokio::fs::write(path, out)
        .await
        .map_err(|e| save_err(e.to_string()))
}

pub fn config_file_from_env() -> PathBuf {
    match std::env::var("CONFIG_FILE") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEF_CONFIG_FILE),
    }
}

//
// ConfigStore
// > single synchronized update path, readers take a snapshot per cycle
//

pub struct ConfigStore {
    config_file: PathBuf,
    current: RecAsyncRwLock<Config>,
}

impl ConfigStore {
    pub fn load(config_file: PathBuf) -> Result<Self, Error> {
        let config = Config::load(&config_file)?;

        Ok(Self::new(config_file, config))
    }

    pub fn new(config_file: PathBuf, config: Config) -> Self {
        Self {
            config_file,
            current: RecAsyncRwLock::new(config),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub async fn snapshot(&self) -> Config {
        self.current.read().await.clone()
    }

    pub async fn reload(&self) -> Result<Config, Error> {
        let mut reloaded = Config::load(&self.config_file)?;

        let mut current = self.current.write().await;

        if reloaded.recorder_temp_dir.is_none() {
            reloaded.recorder_temp_dir = current.recorder_temp_dir.clone();
        }

        *current = reloaded.clone();

        log::info!(
            "[ConfigStore::reload] configuration reloaded from {}",
            self.config_file.display()
        );

        Ok(reloaded)
    }

    // work dir is created on first need and persisted so restarts reuse it
    pub async fn work_dir(&self) -> Result<PathBuf, Error> {
        let mut current = self.current.write().await;

        if let Some(dir) = current.recorder_temp_dir.clone() {
            comm_fs::create_dir(&dir).await?;
            return Ok(dir);
        }

        let dir = std::env::temp_dir().join(format!("{}{}", rec_uuid_new(), WORK_DIR_SUFFIX));
        comm_fs::create_dir(&dir).await?;

        current.recorder_temp_dir = Some(dir.clone());

        log::debug!(
            "[ConfigStore::work_dir] created work dir {}, saving it to {}",
            dir.display(),
            self.config_file.display()
        );

        if let Err(e) = save_work_dir(&self.config_file, &dir).await {
            // the dir is still usable for this process
            log::error!("[ConfigStore::work_dir] {}", e);
        }

        Ok(dir)
    }
}

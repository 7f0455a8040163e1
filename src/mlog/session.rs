// mlog::session
// > one json line per recording lifecycle event on the `session` target
use crate::comm::{get_rec_epoch, PrmJson};
use serde_json::json;

pub const SESSION_LOG_TARGET: &str = "session";

pub fn event(level: &str, event_name: &str, date_key: &str, detail: PrmJson) {
    let lvl = match level {
        "err" | "error" => log::Level::Error,
        "warn" => log::Level::Warn,
        "debug" => log::Level::Debug,
        _ => log::Level::Info,
    };

    let line = json!({
        "event"    : event_name,
        "date_key" : date_key,
        "epoch"    : get_rec_epoch(),
        "detail"   : detail,
    });

    log::log!(target: SESSION_LOG_TARGET, lvl, "{}", line);
}

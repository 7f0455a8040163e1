// runner::mod.rs
pub mod capture;
pub mod error;
pub mod ffmpeg;
pub mod recorder;
pub mod supervisor;

#[cfg(all(test, unix))]
mod testutil;

use crate::comm::{RecArc, RecAsyncRwLock, RecJoinHandle, RecShutdownRecv, RecShutdownSend};
use crate::config::ConfigStore;
use crate::service::status::StatusProvider;

//
// runner
//

pub type RunnerError = error::RunnerError;

// runner process - spawned child process
pub type RunnerProcChild = tokio::process::Child;

//
// RecordingSupervisor
//

#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    Idle,
    Recording,     // capture process is running
    Consolidating, // publishing / merging the fresh fragment
    Stopped,
}

pub type RecorderStatusRef = RecArc<RecAsyncRwLock<RecorderStatus>>;

pub struct RecordingSupervisor {
    store: RecArc<ConfigStore>,
    provider: RecArc<dyn StatusProvider>,

    status: RecorderStatusRef,
    shutdown_recv: RecShutdownRecv,
}

//
// RecorderHandle
// > owned by the main message handler
//

pub struct RecorderHandle {
    shutdown_send: RecShutdownSend,
    status: RecorderStatusRef,
    join_handle: RecJoinHandle<(), RunnerError>,
}

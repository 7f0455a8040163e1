// runner::ffmpeg::mod.rs
pub mod cmd;
pub mod error;

use self::cmd::FFMpegCmd;
use super::RunnerProcChild;
use crate::comm::{await_shutdown, RecShutdownRecv, RecTimeDuration};
use crate::comm_ps::{self, PollExitStRst};
use std::fs::File;
use std::path::Path;
use std::process::Stdio;

pub type RunnerFFMError = error::RunnerFFMError;
type RunnerFFMProc = RunnerProcChild;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FFMpegRunRst {
    // ffmpeg ended on its own (stream ended, network drop, external kill)
    Exited(PollExitStRst),

    // ffmpeg was stopped because shutdown was requested
    Terminated(PollExitStRst),
}

impl FFMpegRunRst {
    pub fn exit_rst(&self) -> &PollExitStRst {
        match self {
            FFMpegRunRst::Exited(r) | FFMpegRunRst::Terminated(r) => r,
        }
    }
}

//
// util
//

pub fn create_ffmpeg_log_file(log_file_path: &Path) -> Result<File, RunnerFFMError> {
    std::fs::File::create(log_file_path).map_err(|e| {
        RunnerFFMError::FileOperErr(format!(
            "failed to create file {}, e={}",
            log_file_path.display(),
            e
        ))
    })
}

// spawn without a shell, stdin/stdout detached,
// > stderr to the ffmpeg log file if one is configured
pub fn spawn_ffmpeg(cmd: &FFMpegCmd) -> Result<RunnerFFMProc, RunnerFFMError> {
    log::debug!(
        "[ffmpeg::spawn_ffmpeg] spawn {} ffmpeg, out={}, cmd={} {}",
        cmd.get_cmd_type(),
        cmd.get_out_path().display(),
        cmd.get_program(),
        cmd.args_to_string()
    );

    let mut spawner = tokio::process::Command::new(cmd.get_program());

    spawner
        .args(cmd.get_ffmpeg_args())
        .stdin(Stdio::null())
        .stdout(Stdio::null());

    match cmd.get_ffmpeg_log_file_path() {
        Some(log_file_path) => {
            spawner.stderr(create_ffmpeg_log_file(log_file_path)?);
        }
        None => {
            spawner.stderr(Stdio::null());
        }
    }

    spawner.spawn().map_err(|e| {
        RunnerFFMError::FFMpegSpawnErr(format!(
            "program={}, e={}",
            cmd.get_program(),
            e
        ))
    })
}

// blocks until ffmpeg exits
pub async fn run_ffmpeg(cmd: &FFMpegCmd) -> Result<PollExitStRst, RunnerFFMError> {
    let mut proc = spawn_ffmpeg(cmd)?;

    let exit_status = proc
        .wait()
        .await
        .map_err(|e| RunnerFFMError::FFMpegWaitErr(e.to_string()))?;

    Ok(comm_ps::describe_exit_status(exit_status))
}

// blocks until ffmpeg exits, or until shutdown when `terminate_on_shutdown` is set
pub async fn run_ffmpeg_cancellable(
    cmd: &FFMpegCmd,
    shutdown: &mut RecShutdownRecv,
    terminate_on_shutdown: bool,
    terminate_timeout: RecTimeDuration,
) -> Result<FFMpegRunRst, RunnerFFMError> {
    let mut proc = spawn_ffmpeg(cmd)?;

    if !terminate_on_shutdown {
        let exit_status = proc
            .wait()
            .await
            .map_err(|e| RunnerFFMError::FFMpegWaitErr(e.to_string()))?;

        return Ok(FFMpegRunRst::Exited(comm_ps::describe_exit_status(
            exit_status,
        )));
    }

    let exited = tokio::select! {
        st = proc.wait() => Some(st),
        _ = await_shutdown(shutdown) => None,
    };

    match exited {
        Some(st) => {
            let exit_status = st.map_err(|e| RunnerFFMError::FFMpegWaitErr(e.to_string()))?;

            Ok(FFMpegRunRst::Exited(comm_ps::describe_exit_status(
                exit_status,
            )))
        }
        None => {
            log::info!(
                "[ffmpeg::run_ffmpeg_cancellable] shutdown requested, terminating {} ffmpeg, pid={:?}",
                cmd.get_cmd_type(),
                proc.id()
            );

            let exit_rst = comm_ps::terminate_and_wait(&mut proc, terminate_timeout)
                .await
                .map_err(|e| RunnerFFMError::FFMpegTermErr(e.to_string()))?;

            Ok(FFMpegRunRst::Terminated(exit_rst))
        }
    }
}

// comm_ps (process)
// > process utility
use crate::{
    comm::{RecTimeDuration, RecTimeInstant},
    REC_ASYNC_SLEEP_MS,
};
use std::process::ExitStatus;
use thiserror::Error;

pub type RecPSCmd = tokio::process::Command;
pub type RecPSChild = tokio::process::Child;
pub type RecPSExitCode = i32;
pub const PROC_EXIT_CODE_INTERRUPTED: i32 = 999;

//
// error
//

#[derive(Error, Debug)]
pub enum RecPSError {
    //
    // pollng process status
    //
    #[error("error on polling process status={0}")]
    PollingStatusErr(String),

    #[error("polling process status is timeoutted")]
    PollingStatusTimeout,

    //
    // terminate process
    //
    #[error("error on terminate process={0}")]
    TerminateErr(String),
}

//
// exit status
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollExitStRst {
    pub exit_code: RecPSExitCode,
    pub exit_desc: String,
}

impl PollExitStRst {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

pub fn describe_exit_status(exit_status: ExitStatus) -> PollExitStRst {
    match exit_status.code() {
        Some(0) => PollExitStRst {
            exit_code: 0,
            exit_desc: "exit with normally".to_string(),
        },
        Some(e) => PollExitStRst {
            exit_code: e,
            exit_desc: format!("exit with errno={}", e),
        },
        None => PollExitStRst {
            exit_code: PROC_EXIT_CODE_INTERRUPTED,
            exit_desc: "process is terminated by signal (ex: kill -9 pid, killall -9 ffmpeg)"
                .to_string(),
        },
    }
}

//
// terminate
//

pub type RecPSID = u32;

// SIGTERM: $ kill {PID}
// > ffmpeg finalizes the output container on SIGTERM
pub async fn terminate(pid: RecPSID) -> Result<(), RecPSError> {
    let status = RecPSCmd::new("kill")
        .arg(pid.to_string())
        .status()
        .await
        .map_err(|e| {
            RecPSError::TerminateErr(format!("failed to execute 'kill', pid={}, e={}", pid, e))
        })?;

    if !status.success() {
        return Err(RecPSError::TerminateErr(format!(
            "'kill' exited with failure, pid={}, status={}",
            pid, status
        )));
    }

    Ok(())
}

//
// polling process
//

pub async fn poll_exit_status(
    proc: &mut RecPSChild,
    timeout_ms: RecTimeDuration,
) -> Result<PollExitStRst, RecPSError> {
    let en_time_ms = RecTimeInstant::now() + timeout_ms;

    loop {
        match proc.try_wait() {
            Ok(Some(exit_status)) => {
                let exit_rst = describe_exit_status(exit_status);

                if exit_rst.exit_code == PROC_EXIT_CODE_INTERRUPTED {
                    log::debug!("[comm_ps::poll_exit_status] {}", exit_rst.exit_desc);
                }

                return Ok(exit_rst);
            }

            // still running
            Ok(None) => {}

            Err(e) => {
                return Err(RecPSError::PollingStatusErr(format!(
                    "error on polling, e={}",
                    e
                )));
            }
        }

        if RecTimeInstant::now() > en_time_ms {
            // termination signal was sent, but process is still running
            return Err(RecPSError::PollingStatusTimeout);
        }

        REC_ASYNC_SLEEP_MS!(10);
    }
}

// SIGTERM, poll until `timeout`, then SIGKILL
pub async fn terminate_and_wait(
    proc: &mut RecPSChild,
    timeout: RecTimeDuration,
) -> Result<PollExitStRst, RecPSError> {
    let pid = match proc.id() {
        Some(pid) => pid,
        // already reaped
        None => {
            return proc
                .wait()
                .await
                .map(describe_exit_status)
                .map_err(|e| RecPSError::PollingStatusErr(e.to_string()))
        }
    };

    match terminate(pid).await {
        Ok(_) => match poll_exit_status(proc, timeout).await {
            Ok(r) => return Ok(r),
            Err(RecPSError::PollingStatusTimeout) => {
                log::error!(
                    "[comm_ps::terminate_and_wait] process did not exit in {}ms after SIGTERM, killing.., pid={}",
                    timeout.as_millis(),
                    pid
                );
            }
            Err(e) => return Err(e),
        },
        Err(e) => {
            log::error!(
                "[comm_ps::terminate_and_wait] SIGTERM failed, killing.., pid={}, e={}",
                pid,
                e
            );
        }
    }

    proc.kill()
        .await
        .map_err(|e| RecPSError::TerminateErr(format!("failed to kill pid={}, e={}", pid, e)))?;

    proc.wait()
        .await
        .map(describe_exit_status)
        .map_err(|e| RecPSError::PollingStatusErr(e.to_string()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{REC_TIME_DURATION_MS, REC_TIME_DURATION_SEC};

    #[tokio::test]
    async fn poll_exit_status_reports_exit_code() {
        let mut child = RecPSCmd::new("sh").args(["-c", "exit 3"]).spawn().unwrap();

        let rst = poll_exit_status(&mut child, REC_TIME_DURATION_SEC!(5))
            .await
            .unwrap();

        assert_eq!(rst.exit_code, 3);
        assert!(!rst.is_success());
    }

    #[tokio::test]
    async fn poll_exit_status_times_out_on_running_process() {
        let mut child = RecPSCmd::new("sleep").arg("30").spawn().unwrap();

        let rst = poll_exit_status(&mut child, REC_TIME_DURATION_MS!(50)).await;
        assert!(matches!(rst, Err(RecPSError::PollingStatusTimeout)));

        child.kill().await.unwrap();
    }

    #[tokio::test]
    async fn terminate_and_wait_stops_running_process() {
        let mut child = RecPSCmd::new("sleep").arg("30").spawn().unwrap();

        let rst = terminate_and_wait(&mut child, REC_TIME_DURATION_SEC!(5))
            .await
            .unwrap();

        // killed by SIGTERM, no exit code
        assert_eq!(rst.exit_code, PROC_EXIT_CODE_INTERRUPTED);
    }
}

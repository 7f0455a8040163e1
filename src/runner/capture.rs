// runner::capture
// > blocking stream-copy capture of a live stream into one fragment
use crate::comm::{RecShutdownRecv, RecTimeDuration};
use crate::comm_ps::PollExitStRst;
use crate::config::Config;
use crate::runner::ffmpeg::{self, cmd::FFMpegCmd, FFMpegRunRst, RunnerFFMError};
use crate::runner::RunnerError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRst {
    pub exit_rst: PollExitStRst,

    // stopped by shutdown instead of stream end
    pub interrupted: bool,
}

pub struct StreamCapture {
    ffmpeg_path: String,
    ffmpeg_verbose: String,
    ffmpeg_log_dir: Option<PathBuf>,

    terminate_on_shutdown: bool,
    terminate_timeout: RecTimeDuration,
}

impl StreamCapture {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffmpeg_verbose: config.ffmpeg_verbose.clone(),
            ffmpeg_log_dir: config.ffmpeg_log_dir.clone(),
            terminate_on_shutdown: config.capture_terminate_on_shutdown,
            terminate_timeout: config.capture_terminate_timeout(),
        }
    }

    fn log_file_path(&self, dest_path: &Path) -> Option<PathBuf> {
        let stem = dest_path.file_stem()?.to_string_lossy().to_string();

        self.ffmpeg_log_dir
            .as_ref()
            .map(|d| d.join(format!("{}_capture.log", stem)))
    }

    // a partial file may exist at `dest_path` whatever the exit status,
    // > only a launch failure is an error
    pub async fn capture(
        &self,
        source_url: &str,
        dest_path: &Path,
        shutdown: &mut RecShutdownRecv,
    ) -> Result<CaptureRst, RunnerError> {
        log::info!(
            "[StreamCapture::capture] recording live stream {} to {}",
            source_url,
            dest_path.display()
        );

        let cmd = FFMpegCmd::new_as_stream_capture(
            &self.ffmpeg_path,
            &self.ffmpeg_verbose,
            self.log_file_path(dest_path),
            source_url,
            dest_path,
        )
        .map_err(|e| RunnerError::CaptureLaunchErr(e.to_string()))?;

        let run_rst = ffmpeg::run_ffmpeg_cancellable(
            &cmd,
            shutdown,
            self.terminate_on_shutdown,
            self.terminate_timeout,
        )
        .await
        .map_err(|e| match e {
            RunnerFFMError::FFMpegSpawnErr(_) | RunnerFFMError::FileOperErr(_) => {
                RunnerError::CaptureLaunchErr(e.to_string())
            }
            e => RunnerError::InternalError(e.to_string()),
        })?;

        let interrupted = matches!(run_rst, FFMpegRunRst::Terminated(_));
        let exit_rst = run_rst.exit_rst().clone();

        if interrupted {
            log::info!(
                "[StreamCapture::capture] capture stopped by shutdown, exit_code={}, desc={}",
                exit_rst.exit_code,
                exit_rst.exit_desc
            );
        } else if !exit_rst.is_success() {
            log::warn!(
                "[StreamCapture::capture] {}, keeping partial file {}",
                RunnerError::CaptureAbnormalExit(exit_rst.exit_code, exit_rst.exit_desc.clone()),
                dest_path.display()
            );
        } else {
            log::info!("[StreamCapture::capture] stream ended, {}", exit_rst.exit_desc);
        }

        Ok(CaptureRst {
            exit_rst,
            interrupted,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::comm::create_shutdown_token;
    use crate::runner::testutil::{fake_ffmpeg_calls, FakeFFMpeg};
    use crate::{REC_ASYNC_SLEEP_MS, REC_TIME_DURATION_SEC};

    fn capture_for(ffmpeg: &Path, log_dir: Option<PathBuf>) -> StreamCapture {
        let mut cfg = Config::default();
        cfg.ffmpeg_path = ffmpeg.to_string_lossy().to_string();
        cfg.ffmpeg_log_dir = log_dir;
        cfg.capture_terminate_timeout = 5;

        StreamCapture::new(&cfg)
    }

    #[tokio::test]
    async fn capture_writes_destination_and_blocks_until_exit() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = FakeFFMpeg::default().install(dir.path());
        let dest = dir.path().join("01-02-2024-meeting.mp4");
        let (_send, mut token) = create_shutdown_token();

        let rst = capture_for(&ffmpeg, Some(dir.path().to_path_buf()))
            .capture("http://x/stream.m3u8", &dest, &mut token)
            .await
            .unwrap();

        assert!(rst.exit_rst.is_success());
        assert!(!rst.interrupted);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "captured:http://x/stream.m3u8;"
        );
        assert!(dir.path().join("01-02-2024-meeting_capture.log").exists());

        let calls = fake_ffmpeg_calls(&ffmpeg);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("-c copy"));
    }

    #[tokio::test]
    async fn abnormal_exit_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = FakeFFMpeg {
            capture_exit: 1,
            ..Default::default()
        }
        .install(dir.path());
        let dest = dir.path().join("01-02-2024-meeting.mp4");
        let (_send, mut token) = create_shutdown_token();

        let rst = capture_for(&ffmpeg, None)
            .capture("http://x/stream.m3u8", &dest, &mut token)
            .await
            .unwrap();

        assert_eq!(rst.exit_rst.exit_code, 1);
        // partial file stays for consolidation
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("01-02-2024-meeting.mp4");
        let (_send, mut token) = create_shutdown_token();

        let rst = capture_for(&dir.path().join("nope"), None)
            .capture("http://x/stream.m3u8", &dest, &mut token)
            .await;

        assert!(matches!(rst, Err(RunnerError::CaptureLaunchErr(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn shutdown_terminates_running_capture() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = FakeFFMpeg {
            capture_sleep_sec: 60,
            ..Default::default()
        }
        .install(dir.path());
        let dest = dir.path().join("01-02-2024-meeting.mp4");
        let (send, mut token) = create_shutdown_token();

        let cap = capture_for(&ffmpeg, None);

        let stopper = tokio::spawn(async move {
            REC_ASYNC_SLEEP_MS!(300);
            send.send(true).unwrap();
            send
        });

        let rst = tokio::time::timeout(
            REC_TIME_DURATION_SEC!(20),
            cap.capture("http://x/stream.m3u8", &dest, &mut token),
        )
        .await
        .expect("capture was not terminated")
        .unwrap();

        assert!(rst.interrupted);
        assert!(dest.exists());

        let _send = stopper.await.unwrap();
    }
}

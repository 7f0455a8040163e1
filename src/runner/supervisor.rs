// runner::supervisor
// > poll -> resolve -> capture -> consolidate, one cycle at a time
use super::capture::StreamCapture;
use super::recorder::{
    self,
    consolidate::{ConsolidateRst, FragmentConsolidator},
};
use super::{
    RecorderHandle, RecorderStatus, RecorderStatusRef, RecordingSupervisor, RunnerError,
};
use crate::comm::{
    cancellable_sleep, create_shutdown_token, is_shutdown_requested, RecArc, RecAsyncRwLock,
    RecShutdownRecv,
};
use crate::comm_media::{RecFileStatus, SessionDateKey, StreamStatus};
use crate::config::ConfigStore;
use crate::mlog;
use crate::RecPathToString;
use crate::service::status::StatusProvider;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleRst {
    NotLive,
    Recorded {
        date_key: SessionDateKey,
        capture_interrupted: bool,
        consolidate_rst: ConsolidateRst,
    },
}

async fn set_status(status: &RecorderStatusRef, new_status: RecorderStatus) {
    let mut current = status.write().await;

    if *current != new_status {
        log::debug!(
            "[RecordingSupervisor] status {} -> {}",
            *current,
            new_status
        );
        *current = new_status;
    }
}

// one full pass, every error stays inside the cycle
async fn run_cycle(
    store: RecArc<ConfigStore>,
    provider: RecArc<dyn StatusProvider>,
    status: RecorderStatusRef,
    mut shutdown: RecShutdownRecv,
) -> Result<CycleRst, RunnerError> {
    let config = store.snapshot().await;

    let (url, date_key) = match provider.poll(&config).await? {
        StreamStatus::NotLive => {
            log::debug!("[RecordingSupervisor::run_cycle] no live stream");
            return Ok(CycleRst::NotLive);
        }
        StreamStatus::Live { url, date_key } => (url, date_key),
    };

    let work_dir = store
        .work_dir()
        .await
        .map_err(|e| RunnerError::FileOperErr(e.to_string()))?;

    let mut desc = recorder::resolve(
        &date_key,
        &work_dir,
        &config.recorder_dest_dir,
        &config.recorder_file_type,
    )
    .await?;

    log::info!(
        "[RecordingSupervisor::run_cycle] live stream for {}, recording to {} (suffix={:?})",
        desc.date_key,
        desc.file_name,
        desc.suffix
    );

    //
    // Recording
    //

    set_status(&status, RecorderStatus::Recording).await;

    mlog::session::event(
        "info",
        "recording_started",
        date_key.as_str(),
        json!({
            "url"  : url,
            "path" : RecPathToString!(desc.path),
        }),
    );

    let capture_rst = StreamCapture::new(&config)
        .capture(&url, &desc.path, &mut shutdown)
        .await?;

    mlog::session::event(
        if capture_rst.exit_rst.is_success() { "info" } else { "warn" },
        "recording_finished",
        date_key.as_str(),
        json!({
            "path"        : RecPathToString!(desc.path),
            "exit_code"   : capture_rst.exit_rst.exit_code,
            "exit_desc"   : capture_rst.exit_rst.exit_desc,
            "interrupted" : capture_rst.interrupted,
        }),
    );

    //
    // Consolidating
    //

    set_status(&status, RecorderStatus::Consolidating).await;

    let consolidate_rst = FragmentConsolidator::new(&config, work_dir)
        .consolidate(&desc.path, &date_key)
        .await?;

    if !matches!(consolidate_rst, ConsolidateRst::Skipped(_)) {
        desc.file_status = RecFileStatus::Published;
    }

    log::debug!(
        "[RecordingSupervisor::run_cycle] {} is {}",
        desc.file_name,
        desc.file_status
    );

    Ok(CycleRst::Recorded {
        date_key,
        capture_interrupted: capture_rst.interrupted,
        consolidate_rst,
    })
}

impl RecordingSupervisor {
    pub fn new(
        store: RecArc<ConfigStore>,
        provider: RecArc<dyn StatusProvider>,
        shutdown_recv: RecShutdownRecv,
    ) -> Self {
        Self {
            store,
            provider,
            status: RecArc::new(RecAsyncRwLock::new(RecorderStatus::Idle)),
            shutdown_recv,
        }
    }

    pub fn spawn(store: RecArc<ConfigStore>, provider: RecArc<dyn StatusProvider>) -> RecorderHandle {
        let (shutdown_send, shutdown_recv) = create_shutdown_token();

        let supervisor = RecordingSupervisor::new(store, provider, shutdown_recv);
        let status = supervisor.status.clone();

        // ownership is moved to RecordingSupervisor::run()
        let join_handle = tokio::spawn(supervisor.run());

        RecorderHandle {
            shutdown_send,
            status,
            join_handle,
        }
    }

    pub async fn run(mut self) -> Result<(), RunnerError> {
        log::info!("[RecordingSupervisor::run] starting..");

        loop {
            if is_shutdown_requested(&self.shutdown_recv) {
                break;
            }

            // own task, a panic ends the cycle only
            let cycle = tokio::spawn(run_cycle(
                self.store.clone(),
                self.provider.clone(),
                self.status.clone(),
                self.shutdown_recv.clone(),
            ));

            match cycle.await {
                Ok(Ok(CycleRst::NotLive)) => {}
                Ok(Ok(rst)) => {
                    log::info!("[RecordingSupervisor::run] cycle finished, {:?}", rst);
                }
                Ok(Err(e)) => {
                    log::error!("[RecordingSupervisor::run] cycle failed, {}", e);
                }
                Err(e) => {
                    log::error!(
                        "[RecordingSupervisor::run] {}",
                        RunnerError::InternalError(format!("cycle task aborted, e={}", e))
                    );
                }
            }

            set_status(&self.status, RecorderStatus::Idle).await;

            let poll_interval = self.store.snapshot().await.poll_interval();

            if cancellable_sleep(&mut self.shutdown_recv, poll_interval).await {
                break;
            }
        }

        set_status(&self.status, RecorderStatus::Stopped).await;

        log::info!("[RecordingSupervisor::run] stopped");

        Ok(())
    }
}

impl RecorderHandle {
    pub async fn status(&self) -> RecorderStatus {
        *self.status.read().await
    }

    // signal only, the worker stops at its next suspension point
    pub fn request_shutdown(&self) {
        self.shutdown_send.send_replace(true);
    }

    pub async fn shutdown(self) -> Result<(), RunnerError> {
        self.request_shutdown();

        log::debug!("[RecorderHandle::shutdown] waiting for supervisor..");

        self.join_handle.await.map_err(|e| {
            RunnerError::InternalError(format!("supervisor task join failed, e={}", e))
        })?
    }
}

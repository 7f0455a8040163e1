use git_version::git_version;

mod comm;
mod comm_fs;
mod comm_media;
mod comm_ps;

mod config;
mod error;
mod message;
mod mlog;
mod runner;
mod service;

use {
    crate::{
        comm::RecArc,
        config::ConfigStore,
        error::Error,
        message::*,
        runner::{RecorderHandle, RecordingSupervisor},
        service::status::{HttpStatusProvider, StatusProvider},
    },
    anyhow::Result,
    tokio::sync::mpsc,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_VERSION: &str = git_version!(fallback = "unknown");

pub fn get_rec_user_agent() -> String {
    format!("HlsRec/{} ({})", VERSION, GIT_VERSION)
}

fn print_splash() {
    println!("---------------------------------------------");
    println!(" hlsrec - live stream recorder");
    println!(" version={}, git={}", VERSION, GIT_VERSION);
    println!("---------------------------------------------");
}

#[tokio::main]
async fn main() -> Result<()> {
    let store = ConfigStore::load(config::config_file_from_env())?;
    let config = store.snapshot().await;

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        if args[1] == "-v" {
            println!("{}", GIT_VERSION);
            println!("{:?}", config);
            std::process::exit(0);
        } else {
            println!("usage: hlsrec [-v]");
            std::process::exit(1);
        }
    }

    let log_handle = mlog::init(&config)?;

    print_splash();

    log::info!(
        "config_file={}, config= {:?}",
        store.config_file().display(),
        config
    );

    //
    // create main message channel
    //

    let (main_msg_send, main_msg_recv) = mpsc::unbounded_channel();

    spawn_signal_listeners(main_msg_send)?;

    //
    // recording supervisor
    //

    let store = RecArc::new(store);
    let provider: RecArc<dyn StatusProvider> = RecArc::new(HttpStatusProvider::new()?);

    let recorder_handle = RecordingSupervisor::spawn(store.clone(), provider);

    //
    // running
    //

    run_message_handler(main_msg_recv, store, log_handle, recorder_handle).await?;

    log::info!("[main] bye");

    Ok(())
}

#[cfg(unix)]
fn spawn_signal_listeners(main_msg_send: ServMsgSend) -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let listeners = [
        (SignalKind::hangup(), "SIGHUP"),
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ];

    for (kind, name) in listeners {
        let mut sig_stream =
            signal(kind).map_err(|e| Error::IoError(format!("signal {}, e={}", name, e)))?;
        let msg_send = main_msg_send.clone();

        tokio::spawn(async move {
            while sig_stream.recv().await.is_some() {
                log::info!("[signal] {} received", name);

                let msg = match name {
                    "SIGHUP" => ServMsg::ReloadConfig,
                    _ => ServMsg::Shutdown(name),
                };

                if let Err(e) = msg_send.send(msg) {
                    log::error!(
                        "[signal] {}",
                        Error::MsgChanErrSendFail(format!("{}, e={}", name, e))
                    );
                    break;
                }
            }
        });
    }

    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_listeners(main_msg_send: ServMsgSend) -> Result<(), Error> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(e) = main_msg_send.send(ServMsg::Shutdown("CTRL_C")) {
                log::error!(
                    "[signal] {}",
                    Error::MsgChanErrSendFail(format!("CTRL_C, e={}", e))
                );
            }
        }
    });

    Ok(())
}

pub async fn run_message_handler(
    mut main_msg_recv: ServMsgRecv,
    store: RecArc<ConfigStore>,
    log_handle: mlog::MLogHandle,
    recorder_handle: RecorderHandle,
) -> Result<()> {
    log::debug!("[ServMsgHandler] starting..");

    let closed = loop {
        let msg = main_msg_recv.recv().await;

        match msg {
            Some(ServMsg::ReloadConfig) => {
                log::info!("[ServMsg::ReloadConfig] reloading configuration..");

                match store.reload().await {
                    Ok(config) => {
                        if let Err(e) = mlog::reconfigure(&log_handle, &config) {
                            log::error!("[ServMsg::ReloadConfig] {}", e);
                        }

                        log::info!("[ServMsg::ReloadConfig] config= {:?}", config);
                    }
                    Err(e) => {
                        log::error!(
                            "[ServMsg::ReloadConfig] keeping current configuration, {}",
                            e
                        );
                    }
                }
            }

            Some(ServMsg::Shutdown(sig_name)) => {
                log::info!(
                    "[ServMsg::Shutdown] {}, stopping recorder (status={})..",
                    sig_name,
                    recorder_handle.status().await
                );
                break false;
            }

            None => {
                log::error!("[ServMsgHandler] main message channel closed");
                break true;
            }
        }
    };

    recorder_handle.shutdown().await?;

    if closed {
        return Err(Error::MsgChanErrChannelClosed("main".to_string()).into());
    }

    Ok(())
}

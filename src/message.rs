use tokio::sync::mpsc;

//
// Service Channel Message
// > posted by the signal listeners, handled by the main message handler
//

#[derive(strum_macros::Display, Debug, Clone)]
pub enum ServMsg {
    // SIGHUP
    ReloadConfig,

    // SIGINT / SIGTERM, (signal name)
    Shutdown(&'static str),
}

pub type ServMsgSend = mpsc::UnboundedSender<ServMsg>;
pub type ServMsgRecv = mpsc::UnboundedReceiver<ServMsg>;

use uuid::Uuid;

pub type RecArc<T> = std::sync::Arc<T>;

// need to call .await in async function
pub type RecAsyncRwLock<T> = tokio::sync::RwLock<T>;

//
// time
//

pub type RecTimeInstant = std::time::Instant;
pub type RecTimeDuration = std::time::Duration;

#[macro_export]
macro_rules! REC_TIME_DURATION_SEC {
    ($sec:expr) => {{
        // RecTimeDuration=std::time::Duration
        std::time::Duration::new($sec, 0)
    }};
}

#[macro_export]
macro_rules! REC_TIME_DURATION_MS {
    ($ms:expr) => {{
        std::time::Duration::from_millis($ms)
    }};
}

#[macro_export]
macro_rules! REC_ASYNC_SLEEP_MS {
    ($x:expr) => {{
        tokio::time::sleep(std::time::Duration::from_millis($x)).await
    }};
}

pub type RecEpoch = i64;

// number of seconds from 1970.1.1
pub fn get_rec_epoch() -> RecEpoch {
    chrono::Utc::now().timestamp()
}

//
// uuid
//

pub type RecUUID = Uuid;

pub fn rec_uuid_new() -> RecUUID {
    Uuid::new_v4()
}

//
// json support
//

pub type PrmJson = serde_json::Value;

pub type RecJoinHandle<T, E> = tokio::task::JoinHandle<Result<T, E>>;

//
// shutdown token
// > false: running, true: shutdown requested
//

pub type RecShutdownSend = tokio::sync::watch::Sender<bool>;
pub type RecShutdownRecv = tokio::sync::watch::Receiver<bool>;

pub fn create_shutdown_token() -> (RecShutdownSend, RecShutdownRecv) {
    tokio::sync::watch::channel(false)
}

pub fn is_shutdown_requested(token: &RecShutdownRecv) -> bool {
    *token.borrow()
}

// resolves when shutdown is requested or every sender is gone
pub async fn await_shutdown(token: &mut RecShutdownRecv) {
    loop {
        if *token.borrow_and_update() {
            return;
        }

        if token.changed().await.is_err() {
            return;
        }
    }
}

// returns true if the wait was interrupted by shutdown
pub async fn cancellable_sleep(token: &mut RecShutdownRecv, dur: RecTimeDuration) -> bool {
    if is_shutdown_requested(token) {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(dur) => false,
        _ = await_shutdown(token) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellable_sleep_returns_on_shutdown() {
        let (send, mut recv) = create_shutdown_token();

        let waiter =
            tokio::spawn(async move { cancellable_sleep(&mut recv, REC_TIME_DURATION_SEC!(3600)).await });

        REC_ASYNC_SLEEP_MS!(20);
        send.send(true).unwrap();

        let interrupted = tokio::time::timeout(REC_TIME_DURATION_SEC!(5), waiter)
            .await
            .expect("sleep was not interrupted")
            .unwrap();

        assert!(interrupted);
    }

    #[tokio::test]
    async fn cancellable_sleep_elapses_without_shutdown() {
        let (_send, mut recv) = create_shutdown_token();

        assert!(!cancellable_sleep(&mut recv, REC_TIME_DURATION_MS!(10)).await);
    }

    #[tokio::test]
    async fn dropped_sender_counts_as_shutdown() {
        let (send, mut recv) = create_shutdown_token();
        drop(send);

        assert!(cancellable_sleep(&mut recv, REC_TIME_DURATION_SEC!(3600)).await);
    }
}

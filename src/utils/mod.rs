pub mod callback;
pub mod constants;
pub mod errors;

/// Type alias to handle channel configurations
#[cfg(not(feature = "crossbeam"))]
pub type Receiver<T> = std::sync::mpsc::Receiver<T>;
#[cfg(not(feature = "crossbeam"))]
pub type Sender<T> = std::sync::mpsc::SyncSender<T>;
#[cfg(feature = "crossbeam")]
pub type Sender<T> = crossbeam::channel::Sender<T>;
#[cfg(feature = "crossbeam")]
pub type Receiver<T> = crossbeam::channel::Receiver<T>;

/// Returns the appropriate channel type based on enabled features (crossbeam)
/// Used for queueing audio between a push-based producer and a pull-based reader.
pub fn get_channel<T>(channel_size: usize) -> (Sender<T>, Receiver<T>) {
    #[cfg(not(feature = "crossbeam"))]
    {
        std::sync::mpsc::sync_channel(channel_size)
    }
    #[cfg(feature = "crossbeam")]
    {
        crossbeam::channel::bounded(channel_size)
    }
}

/// The outcome of a non-blocking send, independent of the channel backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrySendOutcome {
    Sent,
    Full,
    Disconnected,
}

/// Sends without blocking the producer.
pub fn try_send<T>(sender: &Sender<T>, item: T) -> TrySendOutcome {
    #[cfg(not(feature = "crossbeam"))]
    {
        match sender.try_send(item) {
            Ok(()) => TrySendOutcome::Sent,
            Err(std::sync::mpsc::TrySendError::Full(_)) => TrySendOutcome::Full,
            Err(std::sync::mpsc::TrySendError::Disconnected(_)) => TrySendOutcome::Disconnected,
        }
    }
    #[cfg(feature = "crossbeam")]
    {
        match sender.try_send(item) {
            Ok(()) => TrySendOutcome::Sent,
            Err(crossbeam::channel::TrySendError::Full(_)) => TrySendOutcome::Full,
            Err(crossbeam::channel::TrySendError::Disconnected(_)) => {
                TrySendOutcome::Disconnected
            }
        }
    }
}

/// The outcome of a deadline-bounded receive, independent of the channel backend.
#[derive(Debug)]
pub enum RecvOutcome<T> {
    Received(T),
    Timeout,
    Disconnected,
}

/// Blocks for at most `timeout` waiting on the next item.
pub fn recv_timeout<T>(receiver: &Receiver<T>, timeout: std::time::Duration) -> RecvOutcome<T> {
    #[cfg(not(feature = "crossbeam"))]
    {
        match receiver.recv_timeout(timeout) {
            Ok(item) => RecvOutcome::Received(item),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => RecvOutcome::Timeout,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => RecvOutcome::Disconnected,
        }
    }
    #[cfg(feature = "crossbeam")]
    {
        match receiver.recv_timeout(timeout) {
            Ok(item) => RecvOutcome::Received(item),
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => RecvOutcome::Timeout,
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => RecvOutcome::Disconnected,
        }
    }
}

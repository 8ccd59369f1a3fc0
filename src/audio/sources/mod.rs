use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;

pub mod buffered;
pub mod converting;
pub mod manual;
pub mod paced;
pub mod wave;

/// A buffer-received handler. Handlers run synchronously on the producer's thread, in emission
/// order; they must be fast and must not block or they stall the producer.
pub type BufferHandler = Arc<dyn Fn(&AudioBuffer) + Send + Sync>;

/// A push-based producer of audio in a single, fixed format.
pub trait AudioSource: Send + Sync {
    fn format(&self) -> AudioFormat;
    /// While false, the source drops what it produces instead of dispatching it.
    fn listening(&self) -> bool;
    fn set_listening(&self, listening: bool);
    /// Registers a handler for every buffer this source emits from now on.
    /// # Arguments:
    /// * handler: called once per buffer, on the producer's thread
    /// # Returns:
    /// * Subscription, which unsubscribes the handler when dropped
    fn subscribe(&self, handler: BufferHandler) -> Subscription;
}

pub type SharedAudioSource = Arc<dyn AudioSource>;

#[derive(Default)]
struct FanoutRegistry {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(u64, BufferHandler)>>,
}

/// The multicast half of an [AudioSource]: holds subscribed handlers and dispatches buffers to
/// them. Dispatch works from a snapshot of the handler list, so a handler may subscribe or drop
/// subscriptions (its own included) while it runs.
#[derive(Default, Clone)]
pub struct BufferFanout {
    registry: Arc<FanoutRegistry>,
}

impl BufferFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: BufferHandler) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.registry.handlers.write();
        handlers.push((id, handler));
        log::debug!("Subscribed buffer handler {}, {} active", id, handlers.len());
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    pub fn dispatch(&self, buffer: &AudioBuffer) {
        let handlers: Vec<BufferHandler> = self
            .registry
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(buffer);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.read().len()
    }
}

/// A live handler registration. Dropping it unsubscribes the handler; buffers already being
/// dispatched may still reach it.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    registry: Weak<FanoutRegistry>,
    id: u64,
}

impl Subscription {
    /// False once the source it was registered with is gone.
    pub fn is_active(&self) -> bool {
        self.registry.strong_count() > 0
    }

    /// Explicit, readable form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut handlers = registry.handlers.write();
            handlers.retain(|(id, _)| *id != self.id);
            log::debug!(
                "Unsubscribed buffer handler {}, {} active",
                self.id,
                handlers.len()
            );
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod fanout_tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_dispatch_reaches_every_subscriber() {
        let fanout = BufferFanout::new();
        let count = Arc::new(AtomicUsize::new(0));
        let subscriptions: Vec<Subscription> = (0..3)
            .map(|_| {
                let count = Arc::clone(&count);
                fanout.subscribe(Arc::new(move |_: &AudioBuffer| {
                    count.fetch_add(1, Ordering::SeqCst);
                }))
            })
            .collect();

        let buffer = AudioBuffer::silence(AudioFormat::DEFAULT, Duration::from_millis(10));
        fanout.dispatch(&buffer);
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(subscriptions);
        assert_eq!(fanout.subscriber_count(), 0);
        fanout.dispatch(&buffer);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_subscription_outlives_fanout() {
        let fanout = BufferFanout::new();
        let subscription = fanout.subscribe(Arc::new(|_: &AudioBuffer| {}));
        assert!(subscription.is_active());
        drop(fanout);
        assert!(!subscription.is_active());
        // Must not panic.
        subscription.unsubscribe();
    }
}

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{SharedAudioSource, Subscription};
use crate::configs::ContinuousStreamConfigs;
use crate::stream::PullAudioStream;
use crate::utils::errors::VoiceBridgeError;
use crate::utils::{
    Receiver, RecvOutcome, Sender, TrySendOutcome, get_channel, recv_timeout, try_send,
};

// None on the channel is the close signal; it only exists to wake a blocked reader.
type QueueItem = Option<AudioBuffer>;

/// Presents a live source as a pull stream.
///
/// Incoming buffers are queued on a bounded channel. A read drains the current buffer first;
/// with nothing pending it waits on the queue for about as long as the requested bytes would
/// take to play, and hands back that much silence if nothing arrives. Readers that need a steady
/// sample clock therefore never starve. Once the source has been quiet for `idle_timeout`,
/// each wait lasts at least `idle_poll_interval` so an idle reader loop does not spin.
///
/// A read returns 0 only after the stream has been closed through a [StreamCloser].
pub struct ContinuousAudioStream {
    format: AudioFormat,
    configs: ContinuousStreamConfigs,
    receiver: Receiver<QueueItem>,
    closer: StreamCloser,
    dropped: Arc<AtomicUsize>,
    current: Option<AudioBuffer>,
    position: usize,
    last_data: Instant,
    _subscription: Subscription,
}

impl ContinuousAudioStream {
    pub fn new(source: &SharedAudioSource) -> Result<Self, VoiceBridgeError> {
        Self::with_configs(source, ContinuousStreamConfigs::default())
    }

    /// Subscribes to `source`; buffers emitted from now on become readable.
    /// # Arguments:
    /// * source: the live source to pull from
    /// * configs: queue capacity and idle behaviour
    /// # Returns:
    /// * Ok(ContinuousAudioStream), Err(VoiceBridgeError) on invalid configurations
    pub fn with_configs(
        source: &SharedAudioSource,
        configs: ContinuousStreamConfigs,
    ) -> Result<Self, VoiceBridgeError> {
        configs.validate()?;
        let (sender, receiver) = get_channel::<QueueItem>(configs.queue_capacity());
        let closer = StreamCloser {
            closed: Arc::new(AtomicBool::new(false)),
            sender: sender.clone(),
        };
        let dropped = Arc::new(AtomicUsize::new(0));

        let closed = Arc::clone(&closer.closed);
        let dropped_count = Arc::clone(&dropped);
        let subscription = source.subscribe(Arc::new(move |buffer: &AudioBuffer| {
            if buffer.is_empty() || closed.load(Ordering::Acquire) {
                return;
            }
            match try_send(&sender, Some(buffer.clone())) {
                TrySendOutcome::Sent => {}
                TrySendOutcome::Full => {
                    dropped_count.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "ContinuousAudioStream queue full, dropping buffer at {:?}",
                        buffer.timecode()
                    );
                }
                TrySendOutcome::Disconnected => {
                    log::warn!("ContinuousAudioStream reader is gone, dropping buffer");
                }
            }
        }));

        Ok(Self {
            format: source.format(),
            configs,
            receiver,
            closer,
            dropped,
            current: None,
            position: 0,
            last_data: Instant::now(),
            _subscription: subscription,
        })
    }

    /// A handle that can close the stream from another thread, waking a blocked reader.
    pub fn closer(&self) -> StreamCloser {
        self.closer.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// The number of buffers dropped because the queue was full.
    pub fn dropped_buffers(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn wait_for_buffer(&mut self, requested: usize) -> Option<QueueItem> {
        let mut wait = self.format.duration(requested);
        if self.last_data.elapsed() > self.configs.idle_timeout() {
            wait = wait.max(self.configs.idle_poll_interval());
        }
        match recv_timeout(&self.receiver, wait) {
            RecvOutcome::Received(item) => Some(item),
            RecvOutcome::Timeout => None,
            // Unreachable while the closer holds a sender; treat as closed.
            RecvOutcome::Disconnected => Some(None),
        }
    }
}

impl Read for ContinuousAudioStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.is_closed() {
            return Ok(0);
        }

        if self.current.is_none() {
            match self.wait_for_buffer(out.len()) {
                Some(Some(buffer)) => {
                    self.current = Some(buffer);
                    self.position = 0;
                    self.last_data = Instant::now();
                }
                Some(None) => return Ok(0),
                None => {
                    if self.is_closed() {
                        return Ok(0);
                    }
                    log::trace!(
                        "ContinuousAudioStream starved, substituting {:?} of silence",
                        self.format.duration(out.len())
                    );
                    out.fill(0);
                    return Ok(out.len());
                }
            }
        }

        let Some(buffer) = &self.current else {
            return Ok(0);
        };
        let read = (buffer.len() - self.position).min(out.len());
        out[..read].copy_from_slice(&buffer.data()[self.position..self.position + read]);
        self.position += read;
        if self.position == buffer.len() {
            self.current = None;
            self.position = 0;
        }
        Ok(read)
    }
}

impl PullAudioStream for ContinuousAudioStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    // The subscription stays in place; only what has been queued so far is discarded.
    fn reset(&mut self) {
        self.current = None;
        self.position = 0;
        let mut drained = 0;
        while let RecvOutcome::Received(_) = recv_timeout(&self.receiver, Duration::ZERO) {
            drained += 1;
        }
        log::trace!("ContinuousAudioStream reset, {} queued buffers dropped", drained);
    }
}

/// Closes a [ContinuousAudioStream]. Closing is permanent: pending and future reads return 0
/// and the stream stops queueing new audio.
#[derive(Clone)]
pub struct StreamCloser {
    closed: Arc<AtomicBool>,
    sender: Sender<QueueItem>,
}

impl StreamCloser {
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // A full queue means the reader has data to wake up for anyway.
            let _ = try_send(&self.sender, None);
            log::debug!("ContinuousAudioStream closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

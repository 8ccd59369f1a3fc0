use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{AudioSource, BufferFanout, BufferHandler, Subscription};
use crate::configs::PacedSourceConfigs;
use crate::utils::errors::VoiceBridgeError;

struct PacedInner {
    format: AudioFormat,
    send_period: Duration,
    chunk_size: usize,
    silence: Arc<[u8]>,
    listening: AtomicBool,
    shutdown: AtomicBool,
    // Chunks tagged with the play() call that queued them.
    queue: Mutex<VecDeque<(u64, Arc<[u8]>)>>,
    // Bumped by every play(); only chunks of the current one count down `pending`.
    generation: AtomicU64,
    // Queued chunks of the current play not yet handed to subscribers.
    pending: AtomicUsize,
    timecode: Mutex<Duration>,
    // Serializes play() calls.
    play_lock: Mutex<()>,
    fanout: BufferFanout,
}

impl PacedInner {
    fn tick(&self) {
        let (generation, chunk) = match self.queue.lock().pop_front() {
            Some((generation, chunk)) => (Some(generation), chunk),
            None => (None, Arc::clone(&self.silence)),
        };

        let mut timecode = self.timecode.lock();
        let buffer = AudioBuffer::new(self.format, chunk, *timecode);
        *timecode += buffer.duration();
        drop(timecode);

        self.fanout.dispatch(&buffer);
        // A chunk left over from a cancelled play() must not count down its successor.
        if generation == Some(self.generation.load(Ordering::Acquire)) {
            // A cancelled play may already have zeroed the count.
            let _ = self
                .pending
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
    }

    fn run(&self) {
        let mut deadline = Instant::now();
        while !self.shutdown.load(Ordering::Acquire) {
            if self.listening.load(Ordering::Acquire) {
                self.tick();
            }
            deadline += self.send_period;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                // Fell behind (e.g. slow subscribers); don't burst to catch up.
                deadline = now;
            }
        }
    }
}

/// A clock-driven source: a worker thread emits one `send_period` buffer per period, taken from
/// the play queue or synthesized as silence when nothing is queued. Downstream consumers that
/// need a steady sample clock (network sinks, paced encoders) can subscribe to it directly.
///
/// The worker only ticks while the source is listening; queued audio waits otherwise.
pub struct PacedAudioSource {
    inner: Arc<PacedInner>,
    worker: Option<JoinHandle<()>>,
}

impl PacedAudioSource {
    pub fn new(format: AudioFormat) -> Result<Self, VoiceBridgeError> {
        Self::with_configs(format, PacedSourceConfigs::default())
    }

    /// # Arguments:
    /// * format: the format of every emitted buffer
    /// * configs: the send period
    /// # Returns:
    /// * Ok(PacedAudioSource) with its worker running, Err(VoiceBridgeError) on invalid
    ///   configurations or if the worker thread cannot be spawned
    pub fn with_configs(
        format: AudioFormat,
        configs: PacedSourceConfigs,
    ) -> Result<Self, VoiceBridgeError> {
        configs.validate()?;
        let chunk_size = format.bytes_for(configs.send_period());
        if chunk_size == 0 {
            return Err(VoiceBridgeError::ParameterError(format!(
                "PacedAudioSource send period {:?} holds no whole frames at {}.",
                configs.send_period(),
                format
            )));
        }

        let inner = Arc::new(PacedInner {
            format,
            send_period: configs.send_period(),
            chunk_size,
            silence: Arc::from(vec![0u8; chunk_size]),
            listening: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
            generation: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            timecode: Mutex::new(Duration::ZERO),
            play_lock: Mutex::new(()),
            fanout: BufferFanout::new(),
        });

        let worker_inner = Arc::clone(&inner);
        let worker = std::thread::Builder::new()
            .name("paced-audio-source".to_string())
            .spawn(move || worker_inner.run())?;

        Ok(Self {
            inner,
            worker: Some(worker),
        })
    }

    pub fn send_period(&self) -> Duration {
        self.inner.send_period
    }

    /// The number of period chunks still waiting to be emitted.
    pub fn queued_chunks(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Queues `buffer` for paced emission and blocks until its last chunk has been dispatched.
    /// The buffer is converted to this source's format first; the final chunk is padded with
    /// silence. Concurrent plays wait their turn.
    /// # Arguments:
    /// * buffer: the audio to play
    /// * run_flag: lower it to abandon playback; the remaining queue is cleared
    /// # Returns:
    /// * Ok(()) once drained or cancelled, Err(VoiceBridgeError) if the buffer cannot be converted
    pub fn play(
        &self,
        buffer: &AudioBuffer,
        run_flag: Arc<AtomicBool>,
    ) -> Result<(), VoiceBridgeError> {
        let buffer = if buffer.format() == self.inner.format {
            buffer.clone()
        } else {
            buffer.convert_to(self.inner.format)?
        };

        let _turn = self.inner.play_lock.lock();
        {
            let chunk_size = self.inner.chunk_size;
            let mut queue = self.inner.queue.lock();
            queue.clear();
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
            for data in buffer.data().chunks(chunk_size) {
                let mut chunk = vec![0u8; chunk_size];
                chunk[..data.len()].copy_from_slice(data);
                queue.push_back((generation, Arc::from(chunk)));
            }
            self.inner.pending.store(queue.len(), Ordering::Release);
            log::debug!(
                "PacedAudioSource: queued {} chunks ({:?})",
                queue.len(),
                buffer.duration()
            );
        }

        loop {
            if !run_flag.load(Ordering::Acquire) {
                self.inner.queue.lock().clear();
                self.inner.pending.store(0, Ordering::Release);
                log::debug!("PacedAudioSource: playback cancelled");
                break;
            }
            if self.inner.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            std::thread::sleep(self.inner.send_period);
        }
        Ok(())
    }
}

impl AudioSource for PacedAudioSource {
    fn format(&self) -> AudioFormat {
        self.inner.format
    }
    fn listening(&self) -> bool {
        self.inner.listening.load(Ordering::Acquire)
    }
    fn set_listening(&self, listening: bool) {
        self.inner.listening.store(listening, Ordering::Release);
    }
    fn subscribe(&self, handler: BufferHandler) -> Subscription {
        self.inner.fanout.subscribe(handler)
    }
}

impl Drop for PacedAudioSource {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("PacedAudioSource worker panicked");
            }
        }
    }
}

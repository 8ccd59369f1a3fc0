use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{
    AudioSource, BufferFanout, BufferHandler, SharedAudioSource, Subscription,
};
use crate::configs::BufferedSourceConfigs;
use crate::utils::errors::VoiceBridgeError;

struct RingState {
    // Timecode of the very first sample received; slice k starts at origin + k slices.
    origin: Option<Duration>,
    // Number of slices completed since the origin, i.e. the global index of the current slice.
    completed: u64,
    slices: VecDeque<AudioBuffer>,
    current: Vec<u8>,
    capacity: usize,
}

impl RingState {
    fn oldest_index(&self) -> u64 {
        self.completed - self.slices.len() as u64
    }
}

struct BufferedInner {
    format: AudioFormat,
    slice_frames: u64,
    slice_bytes: usize,
    state: Mutex<RingState>,
    fanout: BufferFanout,
}

impl BufferedInner {
    fn slice_timecode(&self, origin: Duration, index: u64) -> Duration {
        origin + self.format.duration_of_frames(index * self.slice_frames)
    }

    fn current_frame(&self, state: &RingState) -> u64 {
        state.completed * self.slice_frames + (state.current.len() / self.format.sample_size()) as u64
    }

    fn frame_at(&self, origin: Duration, timecode: Duration) -> u64 {
        match timecode.checked_sub(origin) {
            Some(offset) => self.format.frames_for(offset),
            None => 0,
        }
    }

    fn on_buffer(&self, buffer: &AudioBuffer) {
        if buffer.format() != self.format {
            log::warn!(
                "BufferedAudioSource: dropping buffer in {}, expected {}",
                buffer.format(),
                self.format
            );
            return;
        }

        let mut completed_slices = Vec::new();
        {
            let mut state = self.state.lock();
            let origin = *state.origin.get_or_insert(buffer.timecode());

            let mut remaining = buffer.data();
            while !remaining.is_empty() {
                let take = (self.slice_bytes - state.current.len()).min(remaining.len());
                state.current.extend_from_slice(&remaining[..take]);
                remaining = &remaining[take..];

                if state.current.len() == self.slice_bytes {
                    let data = std::mem::replace(&mut state.current, Vec::with_capacity(self.slice_bytes));
                    let slice = AudioBuffer::new(
                        self.format,
                        data,
                        self.slice_timecode(origin, state.completed),
                    );
                    state.slices.push_back(slice.clone());
                    state.completed += 1;
                    while state.slices.len() > state.capacity {
                        if let Some(evicted) = state.slices.pop_front() {
                            log::trace!(
                                "BufferedAudioSource: evicted slice at {:?}",
                                evicted.timecode()
                            );
                        }
                    }
                    completed_slices.push(slice);
                }
            }
        }

        for slice in completed_slices {
            log::trace!("BufferedAudioSource: completed slice at {:?}", slice.timecode());
            self.fanout.dispatch(&slice);
        }
    }

    fn buffer(&self, from: Duration, to: Duration) -> Option<AudioBuffer> {
        if from > to {
            return None;
        }
        let sample_size = self.format.sample_size();

        // Snapshot under the lock: shared slice payloads plus a copy of the filled part of the
        // current slice. The byte stitching happens after the lock is released.
        let (origin, from_frame, to_frame, first_index, parts) = {
            let state = self.state.lock();
            let origin = state.origin?;
            let current_frame = self.current_frame(&state);
            let oldest_frame = state.oldest_index() * self.slice_frames;

            let to_frame = self.frame_at(origin, to).min(current_frame);
            let from_frame = self.frame_at(origin, from).max(oldest_frame);
            if from_frame >= to_frame {
                return None;
            }

            let first_index = from_frame / self.slice_frames;
            let last_index = (to_frame - 1) / self.slice_frames;
            let mut parts: Vec<Arc<[u8]>> = Vec::with_capacity((last_index - first_index + 1) as usize);
            for index in first_index..=last_index {
                if index < state.completed {
                    let position = (index - state.oldest_index()) as usize;
                    parts.push(state.slices[position].shared_data());
                } else {
                    let filled = ((to_frame - index * self.slice_frames) as usize * sample_size)
                        .min(state.current.len());
                    parts.push(Arc::from(&state.current[..filled]));
                }
            }
            (origin, from_frame, to_frame, first_index, parts)
        };

        let mut data = vec![0u8; (to_frame - from_frame) as usize * sample_size];
        for (index, part) in (first_index..).zip(parts.iter()) {
            let slice_start = index * self.slice_frames;
            let low = from_frame.max(slice_start) - slice_start;
            let high = to_frame.min(slice_start + self.slice_frames) - slice_start;
            let source = &part[low as usize * sample_size..high as usize * sample_size];
            let offset = (slice_start + low - from_frame) as usize * sample_size;
            data[offset..offset + source.len()].copy_from_slice(source);
        }

        Some(AudioBuffer::new(
            self.format,
            data,
            origin + self.format.duration_of_frames(from_frame),
        ))
    }
}

/// Turns a push-based source into a time-addressable sliding window.
///
/// Incoming audio is cut into fixed-duration slices. Completed slices are retained (oldest
/// evicted first, once more than the configured number are held) and re-emitted to this
/// source's own subscribers, so a BufferedAudioSource is itself an [AudioSource] delivering
/// audio in slice-sized buffers.
///
/// Slices are laid out contiguously from the timecode of the first buffer received; gaps in
/// upstream timecodes are not reproduced.
///
/// All state sits behind one lock shared by the producer and any number of readers; a query
/// holds it only long enough to snapshot the slices it needs.
pub struct BufferedAudioSource {
    inner: Arc<BufferedInner>,
    upstream: SharedAudioSource,
    _subscription: Subscription,
}

impl BufferedAudioSource {
    /// Buffers `upstream` with the default 100 ms slices and 2 s retention.
    pub fn new(upstream: SharedAudioSource) -> Result<Self, VoiceBridgeError> {
        BufferedAudioSourceBuilder::new().with_source(upstream).build()
    }

    /// Returns the audio between two timecodes.
    /// # Arguments:
    /// * from: the first timecode wanted; clamped to the oldest retained slice
    /// * to: the timecode just past the last wanted sample; clamped to the current position
    /// # Returns:
    /// * Some(AudioBuffer) of exactly `frames(to - from) * sample_size` bytes after clamping, stamped
    ///   at `from`; None if `from > to` or the clamped range is empty
    pub fn buffer(&self, from: Duration, to: Duration) -> Option<AudioBuffer> {
        self.inner.buffer(from, to)
    }

    /// Returns everything from `from` up to the current position.
    pub fn buffer_from(&self, from: Duration) -> Option<AudioBuffer> {
        self.inner.buffer(from, Duration::MAX)
    }

    /// The timecode just past the last sample received, if anything was received.
    pub fn position(&self) -> Option<Duration> {
        let state = self.inner.state.lock();
        let origin = state.origin?;
        let frame = self.inner.current_frame(&state);
        Some(origin + self.inner.format.duration_of_frames(frame))
    }

    /// The timecode of the oldest sample still available to queries.
    pub fn oldest_timecode(&self) -> Option<Duration> {
        let state = self.inner.state.lock();
        let origin = state.origin?;
        Some(self.inner.slice_timecode(origin, state.oldest_index()))
    }

    pub fn retained_slices(&self) -> usize {
        self.inner.state.lock().slices.len()
    }

    pub fn slice_capacity(&self) -> usize {
        self.inner.state.lock().capacity
    }

    pub fn slice_duration(&self) -> Duration {
        self.inner.format.duration_of_frames(self.inner.slice_frames)
    }

    /// Temporarily changes how many slices are retained, e.g. to keep a whole utterance around
    /// while it is being recognized. The previous capacity comes back when the guard drops;
    /// surplus slices are evicted as the next slice completes.
    pub fn override_slice_count(&self, slice_count: usize) -> SliceCountOverride {
        let mut state = self.inner.state.lock();
        let previous = state.capacity;
        state.capacity = slice_count.max(1);
        log::debug!(
            "BufferedAudioSource: slice capacity overridden {} -> {}",
            previous,
            state.capacity
        );
        SliceCountOverride {
            inner: Arc::downgrade(&self.inner),
            previous,
        }
    }

    pub fn upstream(&self) -> &SharedAudioSource {
        &self.upstream
    }
}

impl AudioSource for BufferedAudioSource {
    fn format(&self) -> AudioFormat {
        self.inner.format
    }
    // Listening is the upstream's switch; this source has no producer of its own.
    fn listening(&self) -> bool {
        self.upstream.listening()
    }
    fn set_listening(&self, listening: bool) {
        self.upstream.set_listening(listening);
    }
    fn subscribe(&self, handler: BufferHandler) -> Subscription {
        self.inner.fanout.subscribe(handler)
    }
}

/// Restores the slice capacity of a [BufferedAudioSource] when dropped.
#[must_use = "the override ends as soon as the guard is dropped"]
pub struct SliceCountOverride {
    inner: Weak<BufferedInner>,
    previous: usize,
}

impl Drop for SliceCountOverride {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.state.lock().capacity = self.previous;
        }
    }
}

#[derive(Clone, Default)]
pub struct BufferedAudioSourceBuilder {
    upstream: Option<SharedAudioSource>,
    configs: BufferedSourceConfigs,
}

impl BufferedAudioSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_source(mut self, upstream: SharedAudioSource) -> Self {
        self.upstream = Some(upstream);
        self
    }
    pub fn with_configs(mut self, configs: BufferedSourceConfigs) -> Self {
        self.configs = configs;
        self
    }
    pub fn with_slice_duration(mut self, slice_duration: Duration) -> Self {
        self.configs = self.configs.with_slice_duration(slice_duration);
        self
    }
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.configs = self.configs.with_retention(retention);
        self
    }

    // This will fail to build if the source is missing or a slice holds no whole frames.
    pub fn build(self) -> Result<BufferedAudioSource, VoiceBridgeError> {
        let upstream = self.upstream.ok_or(VoiceBridgeError::ParameterError(
            "BufferedAudioSourceBuilder is missing an upstream source.".to_string(),
        ))?;
        self.configs.validate()?;

        let format = upstream.format();
        if format.sample_size() == 0 {
            return Err(VoiceBridgeError::UnsupportedFormat(format));
        }
        let slice_frames = format.frames_for(self.configs.slice_duration());
        if slice_frames == 0 {
            return Err(VoiceBridgeError::ParameterError(format!(
                "BufferedAudioSourceBuilder slice duration {:?} holds no whole frames at {}.",
                self.configs.slice_duration(),
                format
            )));
        }
        let slice_bytes = slice_frames as usize * format.sample_size();
        let capacity = self.configs.slice_count();

        let inner = Arc::new(BufferedInner {
            format,
            slice_frames,
            slice_bytes,
            state: Mutex::new(RingState {
                origin: None,
                completed: 0,
                slices: VecDeque::with_capacity(capacity + 1),
                current: Vec::with_capacity(slice_bytes),
                capacity,
            }),
            fanout: BufferFanout::new(),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = upstream.subscribe(Arc::new(move |buffer: &AudioBuffer| {
            if let Some(inner) = weak.upgrade() {
                inner.on_buffer(buffer);
            }
        }));

        log::debug!(
            "BufferedAudioSource: {} slices of {} frames, format: {}",
            capacity,
            slice_frames,
            format
        );

        Ok(BufferedAudioSource {
            inner,
            upstream,
            _subscription: subscription,
        })
    }
}

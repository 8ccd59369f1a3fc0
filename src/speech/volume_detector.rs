use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::{AudioFormat, SampleWidth};
use crate::audio::pcm::PcmSample;
use crate::audio::sources::{SharedAudioSource, Subscription};
use crate::configs::SilenceDetectionConfigs;
use crate::speech::{SpeechDetector, SpeechEvent, SpeechEventCallback};
use crate::utils::callback::Nop;
use crate::utils::constants::{INITIAL_MIN_BUCKET_DB, INITIAL_WINDOW_DB, SILENCE_FLOOR_DB};
use crate::utils::errors::VoiceBridgeError;

#[inline]
fn decibels(sample: f64) -> f64 {
    if sample == 0. {
        SILENCE_FLOOR_DB
    } else {
        20. * sample.abs().log10()
    }
}

// Full-scale is the magnitude of MIN, so -1.0 is reachable and +1.0 is not.
#[inline]
fn read_sample(width: SampleWidth, bytes: &[u8]) -> f64 {
    match width {
        SampleWidth::Bits8 => i8::read_le(bytes) as f64 / 128.,
        _ => i16::read_le(bytes) as f64 / 32768.,
    }
}

struct DetectorState {
    // Moving decibel window.
    window: VecDeque<f64>,
    window_sum: f64,
    // One bucket per second of audio, newest first.
    min_buckets: VecDeque<f64>,
    max_buckets: VecDeque<f64>,
    total_samples: u64,
    is_silence: bool,
    is_recording: bool,
    silence_start: u64,
    silence_start_timecode: Duration,
    speech_start_timecode: Duration,
}

impl DetectorState {
    fn new(window_len: usize, bucket_count: usize) -> Self {
        Self {
            window: std::iter::repeat_n(INITIAL_WINDOW_DB, window_len).collect(),
            window_sum: INITIAL_WINDOW_DB * window_len as f64,
            min_buckets: std::iter::repeat_n(INITIAL_MIN_BUCKET_DB, bucket_count).collect(),
            max_buckets: std::iter::repeat_n(INITIAL_WINDOW_DB, bucket_count).collect(),
            total_samples: 0,
            is_silence: true,
            is_recording: false,
            silence_start: 0,
            silence_start_timecode: Duration::ZERO,
            speech_start_timecode: Duration::ZERO,
        }
    }

    fn noise_floor(&self) -> f64 {
        self.min_buckets.iter().sum::<f64>() / self.min_buckets.len() as f64
    }
}

struct DetectorInner<C: SpeechEventCallback> {
    format: AudioFormat,
    width: SampleWidth,
    configs: SilenceDetectionConfigs,
    window_len: usize,
    state: Mutex<DetectorState>,
    callback: Mutex<C>,
}

impl<C: SpeechEventCallback> DetectorInner<C> {
    fn reset(&self) {
        *self.state.lock() = DetectorState::new(self.window_len, self.configs.detection_bucket_count());
    }

    fn process(&self, buffer: &AudioBuffer) {
        if buffer.format() != self.format {
            log::warn!(
                "VolumeSpeechDetector: ignoring buffer in {}, expected {}",
                buffer.format(),
                self.format
            );
            return;
        }

        let mut events = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if !self.configs.enabled() {
                state.total_samples += buffer.frame_count() as u64;
                return;
            }

            let sample_rate = self.format.sample_rate as u64;
            let bucket_count = self.configs.detection_bucket_count();
            for (offset, bytes) in buffer.data().chunks_exact(self.width.bytes()).enumerate() {
                let db = decibels(read_sample(self.width, bytes));
                let expired = state.window.pop_front().unwrap_or(INITIAL_WINDOW_DB);
                state.window.push_back(db);
                state.window_sum += db - expired;
                let average = state.window_sum / self.window_len as f64;

                // A new bucket every second of audio, by sample count.
                if state.total_samples % sample_rate == 0 {
                    state.min_buckets.push_front(average);
                    state.max_buckets.push_front(average);
                    state.min_buckets.truncate(bucket_count);
                    state.max_buckets.truncate(bucket_count);
                } else {
                    if let Some(bucket) = state.min_buckets.front_mut() {
                        *bucket = bucket.min(average);
                    }
                    if let Some(bucket) = state.max_buckets.front_mut() {
                        *bucket = bucket.max(average);
                    }
                }

                let floor = state.noise_floor();
                let upper_threshold = floor + self.configs.speech_threshold_offset_db();
                let lower_threshold = floor + self.configs.silence_threshold_offset_db();
                let timecode =
                    buffer.timecode() + self.format.duration_of_frames(offset as u64);

                if state.is_silence {
                    if average > upper_threshold {
                        state.is_silence = false;
                        if !state.is_recording {
                            state.is_recording = true;
                            state.speech_start_timecode = timecode;
                            events.push(SpeechEvent::Started { timecode });
                        }
                    }

                    if state.is_silence && state.is_recording {
                        let silence = self
                            .format
                            .duration_of_frames(state.total_samples - state.silence_start);
                        if silence > self.configs.silence_detection_threshold() {
                            state.is_recording = false;
                            events.push(SpeechEvent::Stopped {
                                start: state.speech_start_timecode,
                                stop: state.silence_start_timecode,
                            });
                        }
                    }
                } else if average < lower_threshold {
                    state.is_silence = true;
                    state.silence_start = state.total_samples;
                    state.silence_start_timecode = timecode;
                }

                state.total_samples += 1;
            }
        }

        if events.is_empty() {
            return;
        }
        let mut callback = self.callback.lock();
        for event in events {
            match event {
                SpeechEvent::Started { timecode } => {
                    log::debug!("Silence stopped at {:?}, speech started", timecode)
                }
                SpeechEvent::Stopped { start, stop } => {
                    log::debug!("Silence started at {:?}, speech from {:?} stopped", stop, start)
                }
            }
            callback.call(event);
        }
    }
}

/// Energy-based speech detection, without a model.
///
/// Each sample's level (dBFS) is smoothed over a short moving window. The quietest smoothed level
/// of each of the last few seconds gives an adaptive noise floor; speech opens when the level
/// rises `speech_threshold_offset_db` above that floor and counts as silent again once it falls
/// under `silence_threshold_offset_db`. The gap between the two thresholds is the hysteresis
/// that keeps the detector from chattering. An utterance closes after
/// `silence_detection_threshold` of uninterrupted silence.
///
/// Only 8-bit and 16-bit mono sources are supported; convert other formats first.
/// The noise floor takes `detection_bucket_count` seconds to settle after [SpeechDetector::start].
pub struct VolumeSpeechDetector<C: SpeechEventCallback> {
    inner: Arc<DetectorInner<C>>,
    source: Option<SharedAudioSource>,
    subscription: Mutex<Option<Subscription>>,
}

impl<C: SpeechEventCallback> VolumeSpeechDetector<C> {
    /// Feeds one buffer straight into the detector, bypassing the source subscription.
    /// Buffers must arrive in stream order.
    pub fn process(&self, buffer: &AudioBuffer) {
        self.inner.process(buffer)
    }

    pub fn format(&self) -> AudioFormat {
        self.inner.format
    }

    pub fn configs(&self) -> &SilenceDetectionConfigs {
        &self.inner.configs
    }

    /// True between a Started event and the matching Stopped event.
    pub fn recording(&self) -> bool {
        self.inner.state.lock().is_recording
    }

    /// The current adaptive noise floor, in dBFS.
    pub fn noise_floor_db(&self) -> f64 {
        self.inner.state.lock().noise_floor()
    }
}

impl<C: SpeechEventCallback> SpeechDetector for VolumeSpeechDetector<C> {
    fn start(&self) {
        self.inner.reset();
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        if let Some(source) = &self.source {
            let weak = Arc::downgrade(&self.inner);
            *subscription = Some(source.subscribe(Arc::new(move |buffer: &AudioBuffer| {
                if let Some(inner) = weak.upgrade() {
                    inner.process(buffer);
                }
            })));
        }
        log::debug!("VolumeSpeechDetector started, format: {}", self.inner.format);
    }

    fn stop(&self) {
        if self.subscription.lock().take().is_some() {
            log::debug!("VolumeSpeechDetector stopped");
        }
    }

    fn detecting(&self) -> bool {
        self.subscription.lock().is_some()
    }
}

pub struct VolumeSpeechDetectorBuilder<C: SpeechEventCallback> {
    source: Option<SharedAudioSource>,
    format: Option<AudioFormat>,
    configs: SilenceDetectionConfigs,
    callback: C,
}

impl VolumeSpeechDetectorBuilder<Nop<SpeechEvent>> {
    pub fn new() -> Self {
        Self {
            source: None,
            format: None,
            configs: SilenceDetectionConfigs::default(),
            callback: Nop::new(),
        }
    }
}

impl Default for VolumeSpeechDetectorBuilder<Nop<SpeechEvent>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SpeechEventCallback> VolumeSpeechDetectorBuilder<C> {
    /// The source to listen to once started. Its format becomes the detector format.
    pub fn with_source(mut self, source: SharedAudioSource) -> Self {
        self.source = Some(source);
        self
    }
    /// For detectors fed by hand through [VolumeSpeechDetector::process].
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = Some(format);
        self
    }
    pub fn with_configs(mut self, configs: SilenceDetectionConfigs) -> Self {
        self.configs = configs;
        self
    }
    pub fn with_callback<C2: SpeechEventCallback>(
        self,
        callback: C2,
    ) -> VolumeSpeechDetectorBuilder<C2> {
        VolumeSpeechDetectorBuilder {
            source: self.source,
            format: self.format,
            configs: self.configs,
            callback,
        }
    }

    // This will fail to build without a source or format, or if the format is not 8/16-bit mono
    // at a non-zero sample rate.
    pub fn build(self) -> Result<VolumeSpeechDetector<C>, VoiceBridgeError> {
        self.configs.validate()?;
        let format = self
            .source
            .as_ref()
            .map(|source| source.format())
            .or(self.format)
            .ok_or(VoiceBridgeError::ParameterError(
                "VolumeSpeechDetectorBuilder needs a source or a format.".to_string(),
            ))?;

        let width = match format.sample_width() {
            Some(width @ (SampleWidth::Bits8 | SampleWidth::Bits16))
                if format.channel_count == 1 && format.sample_rate > 0 =>
            {
                width
            }
            _ => return Err(VoiceBridgeError::UnsupportedFormat(format)),
        };

        let window_len = (format.frames_for(self.configs.db_sampling_window()) as usize).max(1);
        let inner = Arc::new(DetectorInner {
            format,
            width,
            configs: self.configs,
            window_len,
            state: Mutex::new(DetectorState::new(
                window_len,
                self.configs.detection_bucket_count(),
            )),
            callback: Mutex::new(self.callback),
        });

        Ok(VolumeSpeechDetector {
            inner,
            source: self.source,
            subscription: Mutex::new(None),
        })
    }
}

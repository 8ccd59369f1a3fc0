use std::time::Duration;

use crate::utils::constants;
use crate::utils::errors::VoiceBridgeError;

/// Shapes the retained window of a [crate::audio::sources::buffered::BufferedAudioSource]:
/// audio is cut into `slice_duration` slices and enough of them are kept to cover `retention`.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BufferedSourceConfigs {
    slice_duration: Duration,
    retention: Duration,
}

impl BufferedSourceConfigs {
    pub fn new() -> Self {
        Self {
            slice_duration: constants::DEFAULT_SLICE_DURATION,
            retention: constants::DEFAULT_RETENTION,
        }
    }

    /// Sets the duration of one retained slice. Slices are also the granularity at which the
    /// buffered source re-emits audio downstream.
    pub fn with_slice_duration(mut self, slice_duration: Duration) -> Self {
        self.slice_duration = slice_duration;
        self
    }

    /// Sets how much completed audio is kept for queries.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn slice_duration(&self) -> Duration {
        self.slice_duration
    }
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// The number of completed slices needed to cover the retention; always at least 1.
    pub fn slice_count(&self) -> usize {
        let slice = self.slice_duration.as_nanos();
        if slice == 0 {
            return 1;
        }
        (self.retention.as_nanos().div_ceil(slice) as usize).max(1)
    }

    pub(crate) fn validate(&self) -> Result<(), VoiceBridgeError> {
        if self.slice_duration.is_zero() {
            return Err(VoiceBridgeError::ParameterError(
                "BufferedSourceConfigs has a zero-length slice duration.".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BufferedSourceConfigs {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for [crate::speech::volume_detector::VolumeSpeechDetector].
/// The defaults suit conversational speech over telephony or desktop microphones.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SilenceDetectionConfigs {
    /// When false, the detector only keeps count of samples and never raises events.
    enabled: bool,
    /// How long the audio has to stay silent before an open utterance is closed.
    silence_detection_threshold: Duration,
    /// The length of the moving decibel average.
    db_sampling_window: Duration,
    /// The number of one-second min/max buckets used to estimate the noise floor.
    detection_bucket_count: usize,
    /// Loudness above the noise floor that opens speech.
    speech_threshold_offset_db: f64,
    /// Loudness above the noise floor under which audio counts as silence again.
    silence_threshold_offset_db: f64,
}

impl SilenceDetectionConfigs {
    pub fn new() -> Self {
        Self {
            enabled: true,
            silence_detection_threshold: constants::SILENCE_DETECTION_THRESHOLD,
            db_sampling_window: constants::DB_SAMPLING_WINDOW,
            detection_bucket_count: constants::DETECTION_BUCKET_COUNT,
            speech_threshold_offset_db: constants::SPEECH_THRESHOLD_OFFSET_DB,
            silence_threshold_offset_db: constants::SILENCE_THRESHOLD_OFFSET_DB,
        }
    }

    pub fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_silence_detection_threshold(mut self, threshold: Duration) -> Self {
        self.silence_detection_threshold = threshold;
        self
    }
    pub fn with_db_sampling_window(mut self, window: Duration) -> Self {
        self.db_sampling_window = window;
        self
    }
    /// Sets the number of noise-floor buckets. This cannot be zero and will always be set to a
    /// minimum of 1 bucket.
    pub fn with_detection_bucket_count(mut self, bucket_count: usize) -> Self {
        self.detection_bucket_count = bucket_count.max(1);
        self
    }
    pub fn with_speech_threshold_offset_db(mut self, offset_db: f64) -> Self {
        self.speech_threshold_offset_db = offset_db;
        self
    }
    pub fn with_silence_threshold_offset_db(mut self, offset_db: f64) -> Self {
        self.silence_threshold_offset_db = offset_db;
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
    pub fn silence_detection_threshold(&self) -> Duration {
        self.silence_detection_threshold
    }
    pub fn db_sampling_window(&self) -> Duration {
        self.db_sampling_window
    }
    pub fn detection_bucket_count(&self) -> usize {
        self.detection_bucket_count
    }
    pub fn speech_threshold_offset_db(&self) -> f64 {
        self.speech_threshold_offset_db
    }
    pub fn silence_threshold_offset_db(&self) -> f64 {
        self.silence_threshold_offset_db
    }

    pub(crate) fn validate(&self) -> Result<(), VoiceBridgeError> {
        if self.detection_bucket_count == 0 {
            return Err(VoiceBridgeError::ParameterError(
                "SilenceDetectionConfigs has zero detection buckets.".to_string(),
            ));
        }
        if !(self.speech_threshold_offset_db.is_finite()
            && self.silence_threshold_offset_db.is_finite())
        {
            return Err(VoiceBridgeError::ParameterError(
                "SilenceDetectionConfigs has non-finite threshold offsets.".to_string(),
            ));
        }
        // Without a gap the detector toggles on every fluctuation around one threshold.
        if self.speech_threshold_offset_db < self.silence_threshold_offset_db {
            return Err(VoiceBridgeError::ParameterError(format!(
                "SilenceDetectionConfigs speech threshold offset ({} dB) is below the silence threshold offset ({} dB).",
                self.speech_threshold_offset_db, self.silence_threshold_offset_db
            )));
        }
        Ok(())
    }
}

impl Default for SilenceDetectionConfigs {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for [crate::stream::continuous::ContinuousAudioStream].
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContinuousStreamConfigs {
    /// The maximum number of buffers queued between the producer and the reader.
    /// Buffers arriving at a full queue are dropped.
    queue_capacity: usize,
    /// How long the source may stay quiet before reads switch to coarse polling.
    idle_timeout: Duration,
    /// The wait granularity while idle.
    idle_poll_interval: Duration,
}

impl ContinuousStreamConfigs {
    pub fn new() -> Self {
        Self {
            queue_capacity: constants::STREAM_QUEUE_CAPACITY,
            idle_timeout: constants::STREAM_IDLE_TIMEOUT,
            idle_poll_interval: constants::STREAM_IDLE_POLL_INTERVAL,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
    pub fn with_idle_poll_interval(mut self, idle_poll_interval: Duration) -> Self {
        self.idle_poll_interval = idle_poll_interval;
        self
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
    pub fn idle_poll_interval(&self) -> Duration {
        self.idle_poll_interval
    }

    pub(crate) fn validate(&self) -> Result<(), VoiceBridgeError> {
        if self.queue_capacity == 0 {
            return Err(VoiceBridgeError::ParameterError(
                "ContinuousStreamConfigs has a zero-capacity queue.".to_string(),
            ));
        }
        if self.idle_poll_interval.is_zero() {
            return Err(VoiceBridgeError::ParameterError(
                "ContinuousStreamConfigs has a zero idle poll interval.".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ContinuousStreamConfigs {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for [crate::audio::sources::paced::PacedAudioSource].
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PacedSourceConfigs {
    send_period: Duration,
}

impl PacedSourceConfigs {
    pub fn new() -> Self {
        Self {
            send_period: constants::PACED_SEND_PERIOD,
        }
    }

    /// Sets the interval between emitted buffers (and so the duration of each buffer).
    pub fn with_send_period(mut self, send_period: Duration) -> Self {
        self.send_period = send_period;
        self
    }

    pub fn send_period(&self) -> Duration {
        self.send_period
    }

    pub(crate) fn validate(&self) -> Result<(), VoiceBridgeError> {
        if self.send_period.is_zero() {
            return Err(VoiceBridgeError::ParameterError(
                "PacedSourceConfigs has a zero send period.".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PacedSourceConfigs {
    fn default() -> Self {
        Self::new()
    }
}

use std::time::Duration;

pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

// Every supported sample rate conversion touches a multiple of this rate.
pub const TELEPHONY_BASE_RATE: u32 = 8000;
pub const MAX_RATE_SCALE: u32 = 3;

// BufferedAudioSource
pub const DEFAULT_SLICE_DURATION: Duration = Duration::from_millis(100);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(2);

// VolumeSpeechDetector
pub const SILENCE_DETECTION_THRESHOLD: Duration = Duration::from_millis(500);
pub const DB_SAMPLING_WINDOW: Duration = Duration::from_millis(1);
pub const DETECTION_BUCKET_COUNT: usize = 3;
pub const SPEECH_THRESHOLD_OFFSET_DB: f64 = 15.0;
pub const SILENCE_THRESHOLD_OFFSET_DB: f64 = 10.0;
// Exact-zero samples map here instead of -inf.
pub const SILENCE_FLOOR_DB: f64 = -100.0;
// The smoothing window and max buckets start out "quiet".
pub const INITIAL_WINDOW_DB: f64 = -90.0;
pub const INITIAL_MIN_BUCKET_DB: f64 = 0.0;

// ContinuousAudioStream
pub const STREAM_QUEUE_CAPACITY: usize = 1024;
pub const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(5);
pub const STREAM_IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// WaveAudioSource emits 50ms buffers.
pub const WAVE_CHUNK_DURATION: Duration = Duration::from_millis(50);

// PacedAudioSource
pub const PACED_SEND_PERIOD: Duration = Duration::from_millis(20);

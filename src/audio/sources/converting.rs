use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::buffer::AudioBuffer;
use crate::audio::converter::LinearAudioConverter;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{
    AudioSource, BufferFanout, BufferHandler, SharedAudioSource, Subscription,
};
use crate::utils::errors::VoiceBridgeError;

struct ConvertingInner {
    converter: LinearAudioConverter,
    listening: AtomicBool,
    fanout: BufferFanout,
}

impl ConvertingInner {
    fn on_buffer(&self, buffer: &AudioBuffer) {
        if !self.listening.load(Ordering::Acquire) {
            return;
        }
        match buffer.convert_with(&self.converter) {
            Ok(converted) => self.fanout.dispatch(&converted),
            // Only reachable if the upstream source emits something other than its own format.
            Err(e) => log::warn!("Dropping unconvertible buffer: {}", e),
        }
    }
}

/// Re-emits an upstream source's audio in another format.
/// The converter is validated once, at construction; the timecodes of the upstream buffers are
/// kept as-is.
pub struct ConvertingAudioSource {
    inner: Arc<ConvertingInner>,
    upstream: SharedAudioSource,
    _subscription: Subscription,
}

impl ConvertingAudioSource {
    /// # Arguments:
    /// * upstream: the source to convert from
    /// * format: the format to emit
    /// # Returns:
    /// * Ok(ConvertingAudioSource), Err(VoiceBridgeError) if no converter supports the pair
    pub fn new(upstream: SharedAudioSource, format: AudioFormat) -> Result<Self, VoiceBridgeError> {
        let converter = LinearAudioConverter::new(upstream.format(), format)?;
        let inner = Arc::new(ConvertingInner {
            converter,
            listening: AtomicBool::new(true),
            fanout: BufferFanout::new(),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = upstream.subscribe(Arc::new(move |buffer: &AudioBuffer| {
            if let Some(inner) = weak.upgrade() {
                inner.on_buffer(buffer);
            }
        }));

        Ok(Self {
            inner,
            upstream,
            _subscription: subscription,
        })
    }

    pub fn upstream(&self) -> &SharedAudioSource {
        &self.upstream
    }
}

impl AudioSource for ConvertingAudioSource {
    fn format(&self) -> AudioFormat {
        self.inner.converter.destination_format()
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

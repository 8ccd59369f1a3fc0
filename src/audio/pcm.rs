use crate::audio::format::SampleWidth;

/// A signed little-endian linear PCM sample that can be normalized into [-1, 1] and back.
/// Normalization divides by the type's positive maximum, so `MIN` maps slightly below -1.
pub trait PcmSample: Copy + Default + Send + Sync + 'static {
    const BYTES: usize;
    /// Reads one sample from the first `Self::BYTES` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;
    /// Writes one sample into the first `Self::BYTES` bytes of `out`.
    fn write_le(self, out: &mut [u8]);
    fn to_normalized(self) -> f64;
    /// Scales back to the integer range, truncating towards zero and saturating at the bounds.
    fn from_normalized(sample: f64) -> Self;
}

// Values within float noise of an integer snap to it before truncating, so a sample that goes
// through normalize -> denormalize unchanged comes back bit-exact.
#[inline]
fn truncate_scaled(scaled: f64) -> f64 {
    let nearest = scaled.round();
    if (scaled - nearest).abs() < 1e-6 {
        nearest
    } else {
        scaled.trunc()
    }
}

impl PcmSample for i8 {
    const BYTES: usize = 1;
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
    fn write_le(self, out: &mut [u8]) {
        out[0] = self as u8;
    }
    fn to_normalized(self) -> f64 {
        self as f64 / i8::MAX as f64
    }
    fn from_normalized(sample: f64) -> Self {
        truncate_scaled(sample * i8::MAX as f64) as i8
    }
}

impl PcmSample for i16 {
    const BYTES: usize = 2;
    fn read_le(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
    fn write_le(self, out: &mut [u8]) {
        out[..2].copy_from_slice(&self.to_le_bytes());
    }
    fn to_normalized(self) -> f64 {
        self as f64 / i16::MAX as f64
    }
    fn from_normalized(sample: f64) -> Self {
        truncate_scaled(sample * i16::MAX as f64) as i16
    }
}

impl PcmSample for i32 {
    const BYTES: usize = 4;
    fn read_le(bytes: &[u8]) -> Self {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
    fn write_le(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }
    fn to_normalized(self) -> f64 {
        self as f64 / i32::MAX as f64
    }
    fn from_normalized(sample: f64) -> Self {
        truncate_scaled(sample * i32::MAX as f64) as i32
    }
}

/// Reads one sample of the given width from the front of `bytes`, normalized to [-1, 1].
#[inline]
pub fn read_normalized(width: SampleWidth, bytes: &[u8]) -> f64 {
    match width {
        SampleWidth::Bits8 => i8::read_le(bytes).to_normalized(),
        SampleWidth::Bits16 => i16::read_le(bytes).to_normalized(),
        SampleWidth::Bits32 => i32::read_le(bytes).to_normalized(),
    }
}

/// Writes one normalized sample in the given width to the front of `out`.
#[inline]
pub fn write_normalized(width: SampleWidth, sample: f64, out: &mut [u8]) {
    match width {
        SampleWidth::Bits8 => i8::from_normalized(sample).write_le(out),
        SampleWidth::Bits16 => i16::from_normalized(sample).write_le(out),
        SampleWidth::Bits32 => i32::from_normalized(sample).write_le(out),
    }
}

/// Packs samples into little-endian bytes.
pub fn samples_to_bytes<T: PcmSample>(samples: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * T::BYTES];
    for (sample, out) in samples.iter().zip(bytes.chunks_exact_mut(T::BYTES)) {
        sample.write_le(out);
    }
    bytes
}

/// Unpacks little-endian bytes into samples. A trailing partial sample is ignored.
pub fn bytes_to_samples<T: PcmSample>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::BYTES).map(T::read_le).collect()
}

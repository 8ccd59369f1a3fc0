use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use voicebridge::audio::companding::CompandingCodec;
use voicebridge::audio::converter::LinearAudioConverter;
use voicebridge::audio::pcm::samples_to_bytes;
use voicebridge::audio::{AudioBuffer, AudioFormat};

pub fn converter_benchmark(c: &mut Criterion) {
    // Ten seconds of a 440Hz tone in each source format.
    let tone = |format: AudioFormat| -> AudioBuffer {
        let frames = format.frames_for(Duration::from_secs(10)) as usize;
        let samples: Vec<i16> = (0..frames)
            .flat_map(|i| {
                let t = i as f64 / format.sample_rate as f64;
                let sample = ((t * 440. * std::f64::consts::TAU).sin() * 8000.) as i16;
                std::iter::repeat_n(sample, format.channel_count as usize)
            })
            .collect();
        AudioBuffer::new(format, samples_to_bytes(&samples), Duration::ZERO)
    };

    let telephony = AudioFormat::new(8000, 1, 16);
    let wideband = AudioFormat::new(16000, 1, 16);
    let studio = AudioFormat::new(48000, 2, 16);

    let upsample = LinearAudioConverter::new(telephony, wideband)
        .expect("8kHz -> 16kHz should build without problems");
    let downmix = LinearAudioConverter::new(studio, wideband)
        .expect("48kHz stereo -> 16kHz mono should build without problems");

    let telephony_audio = tone(telephony);
    let studio_audio = tone(studio);
    let encoded = CompandingCodec::MuLaw
        .encode(telephony_audio.data())
        .expect("Aligned audio expected to encode.");

    c.bench_function("Upsample 8k -> 16k:", |b| {
        b.iter(|| upsample.convert(telephony_audio.data()))
    });
    c.bench_function("Downmix 48k stereo -> 16k mono:", |b| {
        b.iter(|| downmix.convert(studio_audio.data()))
    });
    c.bench_function("µ-law encode:", |b| {
        b.iter(|| CompandingCodec::MuLaw.encode(telephony_audio.data()))
    });
    c.bench_function("µ-law decode:", |b| {
        b.iter(|| CompandingCodec::MuLaw.decode(&encoded))
    });
}

criterion_group!(benches, converter_benchmark);
criterion_main!(benches);

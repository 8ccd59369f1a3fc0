use std::sync::Arc;
use std::time::Duration;

use voicebridge::audio::AudioFormat;
use voicebridge::audio::sources::buffered::BufferedAudioSourceBuilder;
use voicebridge::audio::sources::converting::ConvertingAudioSource;
use voicebridge::audio::sources::wave::WaveAudioSource;
use voicebridge::audio::sources::SharedAudioSource;
use voicebridge::speech::volume_detector::VolumeSpeechDetectorBuilder;
use voicebridge::speech::{SpeechDetector, SpeechEvent};
use voicebridge::utils::callback::FnCallback;

// Usage: cargo run --example wav_speech_detection -- <recording.wav> [output directory]
// Writes every detected utterance to its own WAV file.
fn main() {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("Usage: wav_speech_detection <recording.wav> [output directory]");
        std::process::exit(2);
    };
    let output_dir = args.next().unwrap_or_else(|| ".".to_string());

    let wave = Arc::new(WaveAudioSource::from_file(&input).expect("Recording expected to load."));
    println!("Loaded {} ({})", input, wave.audio().format());

    // The detector wants 16-bit mono; 16kHz keeps the converter happy for telephony and
    // studio rates alike.
    let upstream: SharedAudioSource = wave.clone();
    let converted: SharedAudioSource = Arc::new(
        ConvertingAudioSource::new(upstream, AudioFormat::new(16000, 1, 16))
            .expect("Recording format expected to convert to 16kHz mono."),
    );

    // Keep enough history around to cut out long utterances.
    let history = Arc::new(
        BufferedAudioSourceBuilder::new()
            .with_source(Arc::clone(&converted))
            .with_retention(Duration::from_secs(30))
            .build()
            .expect("BufferedAudioSource expected to build without issues."),
    );

    let clips = Arc::clone(&history);
    let mut utterance = 0;
    let callback = FnCallback::new(move |event: SpeechEvent| match event {
        SpeechEvent::Started { timecode } => println!("[{:>8.3}s] speech", timecode.as_secs_f64()),
        SpeechEvent::Stopped { start, stop } => {
            println!(
                "[{:>8.3}s] silence ({:.3}s utterance)",
                stop.as_secs_f64(),
                (stop - start).as_secs_f64()
            );
            let Some(clip) = clips.buffer(start, stop) else {
                return;
            };
            utterance += 1;
            let path = format!("{}/utterance_{:03}.wav", output_dir, utterance);
            match clip.save_wav_file(&path) {
                Ok(()) => println!("           saved {}", path),
                Err(e) => eprintln!("           failed to save {}: {}", path, e),
            }
        }
    });

    let detector = VolumeSpeechDetectorBuilder::new()
        .with_source(converted)
        .with_callback(callback)
        .build()
        .expect("VolumeSpeechDetector expected to build without issues.");

    detector.start();
    let played = wave.play();
    detector.stop();

    println!("Processed {:.3}s of audio", played.as_secs_f64());
}

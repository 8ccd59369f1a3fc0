mod common;

#[cfg(test)]
mod buffered_source_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use voicebridge::audio::AudioBuffer;
    use voicebridge::audio::sources::buffered::{BufferedAudioSource, BufferedAudioSourceBuilder};
    use voicebridge::audio::sources::manual::ManualAudioSource;
    use voicebridge::audio::sources::{AudioSource, SharedAudioSource};
    use voicebridge::configs::BufferedSourceConfigs;

    use crate::common::{mono16, ramp_buffer};

    const CHUNK_FRAMES: usize = 480;

    fn setup() -> (Arc<ManualAudioSource>, BufferedAudioSource) {
        let manual = Arc::new(ManualAudioSource::new(mono16(16000)));
        let upstream: SharedAudioSource = manual.clone();
        let buffered = BufferedAudioSource::new(upstream)
            .expect("Default buffered source expected to build.");
        (manual, buffered)
    }

    // Feeds `frames` frames of one continuous ramp, starting at ramp position `start_frame`.
    fn feed(manual: &ManualAudioSource, start_frame: usize, frames: usize, chunk_frames: usize) {
        let mut fed = 0;
        while fed < frames {
            let count = chunk_frames.min(frames - fed);
            let chunk = ramp_buffer(
                mono16(16000),
                (start_frame + fed) as i16,
                count,
                Duration::ZERO,
            );
            manual.send(&chunk).expect("Matching format expected to be accepted.");
            fed += count;
        }
    }

    fn assert_ramp(buffer: &AudioBuffer, first_frame: usize) {
        let samples = buffer.samples_i16().unwrap();
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(*sample, (first_frame + i) as i16, "Sample {} out of order", i);
        }
    }

    #[test]
    fn test_empty_source_has_no_data() {
        let (_manual, buffered) = setup();
        assert!(buffered.buffer(Duration::ZERO, Duration::from_secs(1)).is_none());
        assert!(buffered.position().is_none());
    }

    #[test]
    fn test_retention_clamps_history() {
        let (manual, buffered) = setup();
        feed(&manual, 0, 48000, CHUNK_FRAMES);

        assert_eq!(buffered.retained_slices(), 20);
        assert_eq!(buffered.position(), Some(Duration::from_secs(3)));
        assert_eq!(buffered.oldest_timecode(), Some(Duration::from_secs(1)));

        let buffer = buffered
            .buffer(Duration::ZERO, Duration::from_secs(5))
            .expect("Retained audio expected.");
        assert_eq!(buffer.timecode(), Duration::from_secs(1));
        assert_eq!(buffer.len(), 2 * 16000 * 2);
        assert_ramp(&buffer, 16000);
    }

    #[test]
    fn test_exact_range_length() {
        let (manual, buffered) = setup();
        feed(&manual, 0, 32000, CHUNK_FRAMES);

        let buffer = buffered
            .buffer(Duration::from_millis(1250), Duration::from_millis(1500))
            .expect("Range inside the window expected.");
        assert_eq!(buffer.len(), 4000 * 2);
        assert_eq!(buffer.timecode(), Duration::from_millis(1250));
        assert_ramp(&buffer, 20000);

        // Crosses several slice boundaries at odd offsets.
        let buffer = buffered
            .buffer(Duration::from_millis(333), Duration::from_millis(1777))
            .unwrap();
        let from_frame = 333 * 16;
        let to_frame = 1777 * 16;
        assert_eq!(buffer.len(), (to_frame - from_frame) * 2);
        assert_ramp(&buffer, from_frame);
    }

    #[test]
    fn test_reads_into_the_current_slice() {
        let (manual, buffered) = setup();
        feed(&manual, 0, 16800, CHUNK_FRAMES);

        let buffer = buffered
            .buffer_from(Duration::from_millis(900))
            .expect("Audio up to the current position expected.");
        assert_eq!(buffer.duration(), Duration::from_millis(150));
        assert_ramp(&buffer, 14400);
    }

    #[test]
    fn test_degenerate_ranges() {
        let (manual, buffered) = setup();
        feed(&manual, 0, 16000, CHUNK_FRAMES);

        assert!(
            buffered
                .buffer(Duration::from_millis(500), Duration::from_millis(400))
                .is_none()
        );
        assert!(
            buffered
                .buffer(Duration::from_millis(500), Duration::from_millis(500))
                .is_none()
        );
        // Entirely in the future: clamps to an empty range.
        assert!(
            buffered
                .buffer(Duration::from_secs(2), Duration::from_secs(3))
                .is_none()
        );
    }

    #[test]
    fn test_completed_slices_are_reemitted() {
        let (manual, buffered) = setup();
        let slices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&slices);
        let _subscription = buffered.subscribe(Arc::new(move |slice: &AudioBuffer| {
            sink.lock().push(slice.clone());
        }));

        feed(&manual, 0, 4000, 700);

        let slices = slices.lock();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].timecode(), Duration::ZERO);
        assert_eq!(slices[1].timecode(), Duration::from_millis(100));
        assert!(slices.iter().all(|slice| slice.len() == 3200));
        assert_ramp(&slices[1], 1600);
    }

    #[test]
    fn test_slice_count_override() {
        let (manual, buffered) = setup();
        let guard = buffered.override_slice_count(40);
        assert_eq!(buffered.slice_capacity(), 40);

        feed(&manual, 0, 48000, CHUNK_FRAMES);
        assert_eq!(buffered.retained_slices(), 30);
        let everything = buffered.buffer_from(Duration::ZERO).unwrap();
        assert_eq!(everything.duration(), Duration::from_secs(3));

        drop(guard);
        assert_eq!(buffered.slice_capacity(), 20);
        // Surplus is evicted as the next slice completes.
        assert_eq!(buffered.retained_slices(), 30);
        feed(&manual, 48000, 1600, CHUNK_FRAMES);
        assert_eq!(buffered.retained_slices(), 20);
    }

    #[test]
    fn test_custom_configs() {
        let manual = Arc::new(ManualAudioSource::new(mono16(8000)));
        let buffered = BufferedAudioSourceBuilder::new()
            .with_source(manual.clone())
            .with_configs(
                BufferedSourceConfigs::new()
                    .with_slice_duration(Duration::from_millis(20))
                    .with_retention(Duration::from_millis(100)),
            )
            .build()
            .expect("Custom configs expected to build.");
        assert_eq!(buffered.slice_capacity(), 5);
        assert_eq!(buffered.slice_duration(), Duration::from_millis(20));

        let missing = BufferedAudioSourceBuilder::new().build();
        assert!(missing.is_err());
    }

    #[test]
    fn test_listening_follows_upstream() {
        let (manual, buffered) = setup();
        buffered.set_listening(false);
        assert!(!manual.listening());
        feed(&manual, 0, 3200, CHUNK_FRAMES);
        assert!(buffered.position().is_none());
    }

    #[test]
    fn test_concurrent_queries_see_consistent_audio() {
        let (manual, buffered) = setup();
        let buffered = Arc::new(buffered);
        let producing = Arc::new(AtomicBool::new(true));

        let reader = {
            let buffered = Arc::clone(&buffered);
            let producing = Arc::clone(&producing);
            std::thread::spawn(move || {
                let mut queries = 0;
                while producing.load(Ordering::Acquire) {
                    let Some(position) = buffered.position() else {
                        continue;
                    };
                    let from = position.saturating_sub(Duration::from_millis(500));
                    if let Some(buffer) = buffered.buffer(from, position) {
                        assert!(buffer.duration() <= Duration::from_millis(500));
                        let first_frame = mono16(16000).frames_for(buffer.timecode()) as usize;
                        assert_ramp(&buffer, first_frame);
                        queries += 1;
                    }
                }
                queries
            })
        };

        feed(&manual, 0, 16000 * 5, 160);
        producing.store(false, Ordering::Release);
        let queries = reader.join().expect("Reader thread expected not to panic.");
        assert!(queries > 0);
    }
}

#![no_main]

use aqtap::config::AnalysisConfig;
use aqtap::dataset::load_bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading arbitrary bytes must return an error, never panic
    let config = AnalysisConfig::default();
    if let Ok(dataset) = load_bytes(data, "fuzz", &config) {
        assert!(!dataset.participants.is_empty());
        assert!(dataset
            .participants
            .iter()
            .all(|p| p.dominant > config.min_dominant_taps));
    }
});

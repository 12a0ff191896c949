use screen_transition_common::config::Config;
use std::path::PathBuf;
use tracing::{error, info, warn};
use transition_detector::press::ReplayPress;
use transition_detector::source::ImageDirSource;
use transition_detector::transition::{self, TransitionResult};
use transition_detector::TransitionError;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transition.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        dir = config.source.dir.display().to_string(),
        extension = config.source.extension,
        timeout_secs = config.transition.timeout_secs,
        stable_secs = config.transition.stable_secs,
        region = %config.transition.region(),
        replay_key = config.replay.as_ref().map(|r| r.key.as_str()),
        "starting transition detector"
    );

    let result = match measure(&config) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "transition measurement failed");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&result.summary()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "failed to serialize result");
            std::process::exit(1);
        }
    }

    if !result.is_complete() {
        warn!(status = %result.status, "transition did not complete");
        std::process::exit(2);
    }
}

fn measure(config: &Config) -> Result<TransitionResult, TransitionError> {
    let mut source = ImageDirSource::open(&config.source.dir, &config.source.extension)?;
    if source.is_empty() {
        return Err(TransitionError::FrameSourceExhausted);
    }

    match &config.replay {
        Some(replay) => {
            // Without an earlier frame the first captured one stands in
            let frame_before = match source.frame_before(replay.press_time_ms)? {
                Some(f) => f,
                None => {
                    warn!(
                        press_time_ms = replay.press_time_ms,
                        "no frame before key-press, using the first frame"
                    );
                    source
                        .first_frame()?
                        .ok_or(TransitionError::FrameSourceExhausted)?
                }
            };
            let mut presser = ReplayPress::new(&replay.key, replay.press_time_ms, frame_before);
            transition::press_and_wait(&replay.key, &mut presser, &mut source, &config.transition)
        }
        None => transition::wait_for_transition_to_end(None, &mut source, &config.transition),
    }
}

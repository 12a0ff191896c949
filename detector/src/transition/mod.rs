pub mod result;
pub mod state;

pub use result::{TransitionResult, TransitionStatus, TransitionSummary};
pub use state::{Phase, TransitionStateMachine};

use screen_transition_common::config::TransitionConfig;
use screen_transition_common::frame::Frame;
use tracing::{debug, info};

use crate::differ::{DifferFactory, StrictDiffFactory};
use crate::error::TransitionError;
use crate::press::KeyPresser;
use crate::source::FrameSource;

/// Press `key`, wait for the screen to start changing, then wait for it to
/// stop changing.
///
/// The result is complete only if the change started within
/// `config.timeout_secs` of the press and the screen then stayed still for
/// `config.stable_secs` before that same deadline. Timeouts are reported in
/// the result, not as errors.
///
/// The config, the mask file and the frame-independent region checks are
/// done before the key is pressed. A region that misses the frame, or a mask
/// that doesn't match the clipped region, can only be detected against
/// `frame_before`, so that [`TransitionError::InvalidRegion`] comes back after
/// the key has been pressed.
pub fn press_and_wait<P, S>(
    key: &str,
    presser: &mut P,
    source: &mut S,
    config: &TransitionConfig,
) -> Result<TransitionResult, TransitionError>
where
    P: KeyPresser + ?Sized,
    S: FrameSource + ?Sized,
{
    let factory = StrictDiffFactory::from_config(config)?;
    press_and_wait_with(key, presser, source, config, factory)
}

/// [`press_and_wait`] with a caller-chosen comparison strategy.
///
/// Only the config is checked before pressing; `factory` sees its first frame
/// once the press has completed.
pub fn press_and_wait_with<P, S, F>(
    key: &str,
    presser: &mut P,
    source: &mut S,
    config: &TransitionConfig,
    factory: F,
) -> Result<TransitionResult, TransitionError>
where
    P: KeyPresser + ?Sized,
    S: FrameSource + ?Sized,
    F: DifferFactory,
{
    config.validate()?;
    let press = presser.press(key)?;
    info!(key, press_time_ms = press.end_time_ms, "pressed key");

    let mut machine = TransitionStateMachine::new(factory, config);
    let result = machine.wait(press, source)?;
    debug!("press_and_wait({key}) -> {result}");
    Ok(result)
}

/// Wait for the screen to stop changing.
///
/// `initial_frame` is the frame at which the transition started; without one
/// the next frame from `source` is used. The timeout counts from the initial
/// frame.
pub fn wait_for_transition_to_end<S>(
    initial_frame: Option<Frame>,
    source: &mut S,
    config: &TransitionConfig,
) -> Result<TransitionResult, TransitionError>
where
    S: FrameSource + ?Sized,
{
    let factory = StrictDiffFactory::from_config(config)?;
    wait_for_transition_to_end_with(initial_frame, source, config, factory)
}

/// [`wait_for_transition_to_end`] with a caller-chosen comparison strategy.
pub fn wait_for_transition_to_end_with<S, F>(
    initial_frame: Option<Frame>,
    source: &mut S,
    config: &TransitionConfig,
    factory: F,
) -> Result<TransitionResult, TransitionError>
where
    S: FrameSource + ?Sized,
    F: DifferFactory,
{
    config.validate()?;
    let mut machine = TransitionStateMachine::new(factory, config);
    let result = machine.wait_for_transition_to_end(initial_frame, source)?;
    debug!("wait_for_transition_to_end() -> {result}");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::{FrameDiffer, MotionResult};
    use crate::press::{PressError, PressResult};
    use crate::source::IterSource;
    use crate::test_frames::{solid, with_patch};
    use image::{GrayImage, Luma};
    use screen_transition_common::config::ConfigError;
    use screen_transition_common::region::{InvalidRegionError, MinSize, Region};
    use std::path::PathBuf;

    /// Presses instantly at a fixed time.
    struct FakeRemote {
        press_time_ms: i64,
        frame_before: Frame,
        pressed: Vec<String>,
    }

    impl FakeRemote {
        fn new(press_time_ms: i64) -> Self {
            Self {
                press_time_ms,
                frame_before: solid(50, press_time_ms - 40),
                pressed: Vec::new(),
            }
        }
    }

    impl KeyPresser for FakeRemote {
        fn press(&mut self, key: &str) -> Result<PressResult, PressError> {
            self.pressed.push(key.to_string());
            Ok(PressResult {
                key: key.to_string(),
                end_time_ms: self.press_time_ms,
                frame_before: self.frame_before.clone(),
            })
        }
    }

    struct BrokenRemote;

    impl KeyPresser for BrokenRemote {
        fn press(&mut self, key: &str) -> Result<PressResult, PressError> {
            Err(PressError::Send {
                key: key.to_string(),
                reason: "lircd not running".into(),
            })
        }
    }

    /// Menu highlight moving across the top-left, with live video on the right.
    fn menu_with_live_video(ts: i64, menu_from: i64, menu_to: i64) -> Frame {
        let step = (ts / 40) as i32;
        let video = (step * 37 % 256) as u8;
        let frame = with_patch(&solid(50, ts), Region::new(40, 0, 24, 48), video, ts);
        if ts < menu_from {
            return frame;
        }
        let y = ((ts.min(menu_to) - menu_from) / 40) as i32 % 40;
        with_patch(&frame, Region::new(0, y, 32, 8), 250, ts)
    }

    fn frames(
        from: i64,
        to: i64,
        picture: impl Fn(i64) -> Frame,
    ) -> IterSource<std::vec::IntoIter<Frame>> {
        IterSource::new((from..to).step_by(40).map(picture).collect::<Vec<_>>())
    }

    #[test]
    fn press_and_wait_complete() {
        let mut remote = FakeRemote::new(1_000);
        let mut source = frames(960, 10_000, |ts| {
            if ts < 1_400 {
                solid(50, ts)
            } else if ts < 2_000 {
                let sprite = Region::new(0, (ts / 40 % 40) as i32, 16, 8);
                with_patch(&solid(50, ts), sprite, 250, ts)
            } else {
                with_patch(&solid(50, ts), Region::new(0, 0, 64, 48), 200, ts)
            }
        });
        let config = TransitionConfig::default();
        let result = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap();

        assert!(result.is_complete());
        assert_eq!(remote.pressed, vec!["KEY_OK"]);
        assert_eq!(result.key.as_deref(), Some("KEY_OK"));
        assert_eq!(result.press_time_ms, Some(1_000));
        assert_eq!(result.animation_start_time_ms, Some(1_400));
        assert_eq!(result.end_time_ms, Some(2_000));
        assert_eq!(result.duration_ms(), Some(1_000));
    }

    #[test]
    fn region_ignores_live_video() {
        let config = TransitionConfig {
            region: Some(Region::new(0, 0, 32, 48)),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 12_000, |ts| menu_with_live_video(ts, 1_000, 1_600));
        let result = press_and_wait("KEY_DOWN", &mut remote, &mut source, &config).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.animation_start_time_ms, Some(1_000));
        assert_eq!(result.end_time_ms, Some(1_600));

        // Without the region the live video never lets the screen settle
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 12_000, |ts| menu_with_live_video(ts, 1_000, 1_600));
        let result =
            press_and_wait("KEY_DOWN", &mut remote, &mut source, &TransitionConfig::default())
                .unwrap();
        assert_eq!(result.status, TransitionStatus::StableTimeout);
    }

    #[test]
    fn min_size_ignores_blinking_cursor() {
        let config = TransitionConfig {
            min_size: Some(MinSize::new(4, 4)),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        // A 2x10 cursor blinking every 480ms; nothing else happens
        let mut source = frames(0, 12_000, |ts| {
            if (ts / 480) % 2 == 0 {
                solid(50, ts)
            } else {
                with_patch(&solid(50, ts), Region::new(5, 5, 2, 10), 255, ts)
            }
        });
        let result = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap();
        assert_eq!(result.status, TransitionStatus::StartTimeout);
    }

    #[test]
    fn press_failure_is_an_error() {
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let config = TransitionConfig::default();
        let err = press_and_wait("KEY_OK", &mut BrokenRemote, &mut source, &config).unwrap_err();
        assert!(matches!(err, TransitionError::Press(PressError::Send { .. })));
    }

    #[test]
    fn off_screen_region_fails_after_press() {
        let config = TransitionConfig {
            region: Some(Region::new(1_000, 1_000, 10, 10)),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let err = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidRegion(InvalidRegionError::NoOverlap { .. })
        ));
        // Only frame_before can tell the region misses the screen
        assert_eq!(remote.pressed, vec!["KEY_OK"]);
        assert_eq!(source.next_frame().unwrap().unwrap().captured_at_ms, 0);
    }

    #[test]
    fn negative_region_fails_before_pressing() {
        let config = TransitionConfig {
            region: Some(Region::new(0, 0, -8, 8)),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let err = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidRegion(InvalidRegionError::NegativeSize { .. })
        ));
        assert!(remote.pressed.is_empty());
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "screen-transition-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn oversized_mask_file_fails_before_pressing() {
        let dir = scratch_dir("oversized-mask");
        let path = dir.join("mask.png");
        GrayImage::from_pixel(16, 16, Luma([255])).save(&path).unwrap();
        let config = TransitionConfig {
            region: Some(Region::new(0, 0, 8, 8)),
            mask: Some(path),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let err = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidRegion(InvalidRegionError::MaskMismatch { .. })
        ));
        assert!(remote.pressed.is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mask_file_hides_changes() {
        let dir = scratch_dir("mask-file");
        let path = dir.join("mask.png");
        // Only the top half of the screen is analysed
        let mask = GrayImage::from_fn(64, 48, |_, y| Luma([if y < 24 { 255 } else { 0 }]));
        mask.save(&path).unwrap();
        let config = TransitionConfig {
            mask: Some(path),
            ..Default::default()
        };
        let ticker = |ts: i64| {
            let x = (ts / 40 % 56) as i32;
            with_patch(&solid(50, ts), Region::new(x, 30, 8, 8), 250, ts)
        };

        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 12_000, ticker);
        let result = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap();
        assert_eq!(result.status, TransitionStatus::StartTimeout);

        // Without the mask the ticker never settles
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 12_000, ticker);
        let result =
            press_and_wait("KEY_OK", &mut remote, &mut source, &TransitionConfig::default())
                .unwrap();
        assert_eq!(result.status, TransitionStatus::StableTimeout);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn huge_timeout_is_accepted() {
        // Rounds to more milliseconds than fit in an i64
        let config = TransitionConfig {
            timeout_secs: 1e17,
            ..Default::default()
        };
        let mut remote = FakeRemote::new(1_000);
        let mut source = frames(960, 5_000, |ts| {
            if ts < 1_400 {
                solid(50, ts)
            } else {
                with_patch(&solid(50, ts), Region::new(0, 0, 8, 8), 250, ts)
            }
        });
        let result = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.animation_start_time_ms, Some(1_400));
        assert_eq!(result.end_time_ms, Some(1_400));
    }

    #[test]
    fn missing_mask_file_fails_before_pressing() {
        let config = TransitionConfig {
            mask: Some(PathBuf::from("/nonexistent/mask.png")),
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let err = press_and_wait("KEY_OK", &mut remote, &mut source, &config).unwrap_err();
        assert!(matches!(err, TransitionError::MaskLoad(..)));
        assert!(remote.pressed.is_empty());
    }

    #[test]
    fn invalid_timing_is_config_error() {
        let config = TransitionConfig {
            stable_secs: f64::NAN,
            ..Default::default()
        };
        let mut source = frames(0, 1_000, |ts| solid(50, ts));
        let err = wait_for_transition_to_end(None, &mut source, &config).unwrap_err();
        assert!(matches!(err, TransitionError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn wait_for_transition_to_end_after_match() {
        // The caller already saw the app's first frame at 3_000 and wants to
        // know when it finished populating.
        let picture = |ts: i64| {
            if ts < 3_520 {
                let band = Region::new(0, (ts / 40 % 40) as i32, 64, 8);
                with_patch(&solid(50, ts), band, 200, ts)
            } else {
                solid(90, ts)
            }
        };
        let mut source = frames(3_040, 8_000, picture);
        let config = TransitionConfig {
            stable_secs: 2.0,
            ..Default::default()
        };
        let result =
            wait_for_transition_to_end(Some(picture(3_000)), &mut source, &config).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.animation_start_time_ms, Some(3_000));
        assert_eq!(result.end_time_ms, Some(3_520));
        assert_eq!(result.animation_duration_ms(), Some(520));
        assert_eq!(result.duration_ms(), None);
    }

    struct AlwaysMoving;

    impl FrameDiffer for AlwaysMoving {
        fn diff(&mut self, frame: &Frame) -> Result<MotionResult, TransitionError> {
            Ok(MotionResult {
                timestamp_ms: frame.captured_at_ms,
                motion: true,
                region: Some(Region::new(0, 0, 1, 1)),
                frame: frame.clone(),
            })
        }
    }

    #[test]
    fn strategy_is_swappable() {
        let factory = |_: &Frame| -> Result<Box<dyn FrameDiffer>, TransitionError> {
            Ok(Box::new(AlwaysMoving))
        };
        let config = TransitionConfig {
            timeout_secs: 2.0,
            ..Default::default()
        };
        let mut remote = FakeRemote::new(0);
        let mut source = frames(0, 5_000, |ts| solid(50, ts));
        let result =
            press_and_wait_with("KEY_OK", &mut remote, &mut source, &config, factory).unwrap();
        assert_eq!(result.status, TransitionStatus::StableTimeout);
        assert_eq!(result.animation_start_time_ms, Some(0));
        assert_eq!(result.frame.captured_at_ms, 2_000);
    }
}

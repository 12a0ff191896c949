use screen_transition_common::config::TransitionConfig;
use screen_transition_common::frame::Frame;
use tracing::{debug, info, warn};

use super::result::{TransitionResult, TransitionStatus};
use crate::differ::{DifferFactory, FrameDiffer};
use crate::error::TransitionError;
use crate::press::PressResult;
use crate::source::FrameSource;

enum TransitionState {
    /// A key was pressed; waiting for the picture to start changing.
    AwaitingStart {
        differ: Box<dyn FrameDiffer>,
        press_time_ms: i64,
    },
    /// The picture is changing; waiting for it to stay still for `stable_ms`.
    AwaitingStable {
        differ: Box<dyn FrameDiffer>,
        animation_start_time_ms: i64,
        /// Last frame that showed motion; the stability clock runs from here.
        first_stable: Frame,
    },
}

/// Where the machine currently is, for callers driving it frame by frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingStart,
    AwaitingStable,
}

enum Step {
    Continue(TransitionState),
    Done(TransitionResult),
}

/// Measures one transition at a time.
///
/// Either arm it and push frames with [`process_frame`](Self::process_frame),
/// or let [`wait`](Self::wait) / [`wait_for_transition_to_end`](Self::wait_for_transition_to_end)
/// pull frames from a [`FrameSource`]. Each measurement gets its own differ
/// from the factory. Once a result is returned the machine is idle again.
pub struct TransitionStateMachine<F> {
    state: Option<TransitionState>, // Option so we can take() during transitions
    factory: F,
    timeout_ms: i64,
    stable_ms: i64,
    expiry_ms: Option<i64>,
    press_time_ms: Option<i64>,
    key: Option<String>,
}

impl<F: DifferFactory> TransitionStateMachine<F> {
    pub fn new(factory: F, config: &TransitionConfig) -> Self {
        Self::with_timing(factory, config.timeout_ms(), config.stable_ms())
    }

    pub fn with_timing(factory: F, timeout_ms: i64, stable_ms: i64) -> Self {
        Self {
            state: None,
            factory,
            timeout_ms,
            stable_ms,
            expiry_ms: None,
            press_time_ms: None,
            key: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            None => Phase::Idle,
            Some(TransitionState::AwaitingStart { .. }) => Phase::AwaitingStart,
            Some(TransitionState::AwaitingStable { .. }) => Phase::AwaitingStable,
        }
    }

    /// Start measuring the effect of a key-press.
    pub fn arm_for_press(&mut self, press: PressResult) -> Result<(), TransitionError> {
        let differ = self.factory.create(&press.frame_before)?;
        let press_time_ms = press.end_time_ms;
        self.expiry_ms = Some(press_time_ms.saturating_add(self.timeout_ms));
        self.press_time_ms = Some(press_time_ms);
        self.key = Some(press.key);

        debug!(
            key = self.key.as_deref(),
            press_time_ms,
            expiry_ms = self.expiry_ms,
            differ = differ.name(),
            "AWAITING_START: armed after key-press"
        );
        self.state = Some(TransitionState::AwaitingStart {
            differ,
            press_time_ms,
        });
        Ok(())
    }

    /// Start waiting for an animation that's already under way to finish.
    pub fn arm_for_stable(&mut self, initial_frame: Frame) -> Result<(), TransitionError> {
        self.key = None;
        self.press_time_ms = None;
        self.expiry_ms = None;
        let state = self.await_stable(initial_frame)?;
        self.state = Some(state);
        Ok(())
    }

    fn await_stable(&mut self, initial_frame: Frame) -> Result<TransitionState, TransitionError> {
        let expiry_ms = *self
            .expiry_ms
            .get_or_insert(initial_frame.captured_at_ms.saturating_add(self.timeout_ms));
        let differ = self.factory.create(&initial_frame)?;
        debug!(
            ts = initial_frame.captured_at_ms,
            expiry_ms,
            stable_ms = self.stable_ms,
            differ = differ.name(),
            "AWAITING_STABLE: armed"
        );
        Ok(TransitionState::AwaitingStable {
            differ,
            animation_start_time_ms: initial_frame.captured_at_ms,
            first_stable: initial_frame,
        })
    }

    /// Feed one frame. Returns the result once a terminal state is reached.
    ///
    /// An error leaves the machine idle; the measurement can't be resumed.
    pub fn process_frame(
        &mut self,
        frame: Frame,
    ) -> Result<Option<TransitionResult>, TransitionError> {
        let state = self.state.take().ok_or(TransitionError::NotArmed)?;
        let step = match state {
            TransitionState::AwaitingStart {
                differ,
                press_time_ms,
            } => self.handle_awaiting_start(differ, press_time_ms, frame),
            TransitionState::AwaitingStable {
                differ,
                animation_start_time_ms,
                first_stable,
            } => self.handle_awaiting_stable(differ, animation_start_time_ms, first_stable, frame),
        };

        match step {
            Ok(Step::Continue(next)) => {
                self.state = Some(next);
                Ok(None)
            }
            Ok(Step::Done(result)) => Ok(Some(result)),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Measure the effect of `press`, pulling frames from `source`.
    pub fn wait<S: FrameSource + ?Sized>(
        &mut self,
        press: PressResult,
        source: &mut S,
    ) -> Result<TransitionResult, TransitionError> {
        self.arm_for_press(press)?;
        self.run(source)
    }

    /// Wait for the picture to stop changing. Without an `initial_frame` the
    /// next frame from `source` is used.
    pub fn wait_for_transition_to_end<S: FrameSource + ?Sized>(
        &mut self,
        initial_frame: Option<Frame>,
        source: &mut S,
    ) -> Result<TransitionResult, TransitionError> {
        let initial_frame = match initial_frame {
            Some(frame) => frame,
            None => pull(source)?,
        };
        self.arm_for_stable(initial_frame)?;
        self.run(source)
    }

    fn run<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<TransitionResult, TransitionError> {
        loop {
            let frame = match pull(source) {
                Ok(frame) => frame,
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            if let Some(result) = self.process_frame(frame)? {
                return Ok(result);
            }
        }
    }

    // =========================================================================
    // State handlers
    // =========================================================================

    fn handle_awaiting_start(
        &mut self,
        mut differ: Box<dyn FrameDiffer>,
        press_time_ms: i64,
        frame: Frame,
    ) -> Result<Step, TransitionError> {
        if frame.captured_at_ms < press_time_ms {
            // Captured before the key-press finished, so it can't show its effect
            debug!(
                ts = frame.captured_at_ms,
                press_time_ms, "AWAITING_START: discarding frame from before key-press"
            );
            return Ok(Step::Continue(TransitionState::AwaitingStart {
                differ,
                press_time_ms,
            }));
        }

        let motion = differ.diff(&frame)?;
        if motion.motion {
            info!(
                ts = frame.captured_at_ms,
                since_press_ms = frame.captured_at_ms - press_time_ms,
                region = motion.region.map(|r| r.to_string()),
                "AWAITING_START→AWAITING_STABLE: animation started"
            );
            return Ok(Step::Continue(self.await_stable(frame)?));
        }

        debug!(ts = frame.captured_at_ms, "AWAITING_START: no change");
        if frame.captured_at_ms >= self.expiry() {
            info!(
                ts = frame.captured_at_ms,
                timeout_ms = self.timeout_ms,
                key = self.key.as_deref(),
                "START_TIMEOUT: transition didn't start"
            );
            return Ok(Step::Done(self.finish(
                frame,
                TransitionStatus::StartTimeout,
                None,
                None,
            )));
        }

        Ok(Step::Continue(TransitionState::AwaitingStart {
            differ,
            press_time_ms,
        }))
    }

    fn handle_awaiting_stable(
        &mut self,
        mut differ: Box<dyn FrameDiffer>,
        animation_start_time_ms: i64,
        mut first_stable: Frame,
        frame: Frame,
    ) -> Result<Step, TransitionError> {
        let motion = differ.diff(&frame)?;
        if motion.motion {
            debug!(
                ts = frame.captured_at_ms,
                region = motion.region.map(|r| r.to_string()),
                "AWAITING_STABLE: animation in progress"
            );
            first_stable = frame.clone();
        } else {
            debug!(
                ts = frame.captured_at_ms,
                stable_since = first_stable.captured_at_ms,
                "AWAITING_STABLE: no change"
            );
        }

        if frame.captured_at_ms - first_stable.captured_at_ms >= self.stable_ms {
            let end_time_ms = first_stable.captured_at_ms;
            info!(
                end_time_ms,
                stable_ms = self.stable_ms,
                animation_ms = end_time_ms - animation_start_time_ms,
                "COMPLETE: transition stable"
            );
            return Ok(Step::Done(self.finish(
                first_stable,
                TransitionStatus::Complete,
                Some(animation_start_time_ms),
                Some(end_time_ms),
            )));
        }

        if frame.captured_at_ms >= self.expiry() {
            info!(
                ts = frame.captured_at_ms,
                timeout_ms = self.timeout_ms,
                animation_start_time_ms,
                "STABLE_TIMEOUT: transition didn't end"
            );
            return Ok(Step::Done(self.finish(
                frame,
                TransitionStatus::StableTimeout,
                Some(animation_start_time_ms),
                None,
            )));
        }

        Ok(Step::Continue(TransitionState::AwaitingStable {
            differ,
            animation_start_time_ms,
            first_stable,
        }))
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    fn expiry(&self) -> i64 {
        // Both arm paths set the expiry before entering a waiting state.
        self.expiry_ms.unwrap_or(i64::MAX)
    }

    fn finish(
        &mut self,
        frame: Frame,
        status: TransitionStatus,
        animation_start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
    ) -> TransitionResult {
        let result = TransitionResult {
            key: self.key.take(),
            frame,
            status,
            press_time_ms: self.press_time_ms.take(),
            animation_start_time_ms,
            end_time_ms,
        };
        self.reset();
        result
    }

    fn reset(&mut self) {
        self.state = None;
        self.expiry_ms = None;
        self.press_time_ms = None;
        self.key = None;
    }
}

fn pull<S: FrameSource + ?Sized>(source: &mut S) -> Result<Frame, TransitionError> {
    match source.next_frame()? {
        Some(frame) => Ok(frame),
        None => {
            warn!(source = source.name(), "frame source ended mid-transition");
            Err(TransitionError::FrameSourceExhausted)
        }
    }
}

//! Fitting the paper into the viewport
//!
//! The paper has a fixed intrinsic width. Whenever the viewport changes the
//! controller waits two frames so the paper has been laid out at its new
//! position, measures its unscaled width, and derives a `PaperTransform`
//! that fits it between the margins.

use super::clock::Clock;
use super::debounce::{Debouncer, Trigger};
use crate::config::ScaleSettings;
use crate::view::{LayoutProbe, NodeId, PaperTransform};
use log::{debug, warn};
use std::time::Duration;

/// Frame boundaries between starting a measurement and reading the layout.
pub const MEASURE_AFTER_FRAMES: u64 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Scale Computation
// ─────────────────────────────────────────────────────────────────────────────

/// The numbers behind one scale recomputation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleDecision {
    pub viewport_width: f32,
    pub paper_width: f32,
    /// Viewport width minus the margin on both sides
    pub max_width: f32,
    /// Scale that would make the paper exactly `max_width` wide
    pub raw_scale: f32,
    /// Upper bound for this viewport
    pub max_scale: f32,
    /// `min(raw_scale, max_scale)`
    pub applied: f32,
    /// The viewport is at or below the breakpoint
    pub compact: bool,
}

impl ScaleDecision {
    pub fn transform(&self, settings: &ScaleSettings) -> PaperTransform {
        PaperTransform::fitted(self.applied, self.compact, settings.compact_max_scale)
    }
}

/// Compute the scale for a viewport of width `viewport_width` and a paper
/// laid out at `paper_width`.
pub fn compute_scale(
    viewport_width: f32,
    paper_width: f32,
    settings: &ScaleSettings,
) -> ScaleDecision {
    let max_width = viewport_width - 2.0 * settings.margin;
    let raw_scale = max_width / paper_width;
    let compact = viewport_width <= settings.breakpoint;
    let max_scale = if compact {
        settings.compact_max_scale
    } else {
        settings.max_scale
    };

    ScaleDecision {
        viewport_width,
        paper_width,
        max_width,
        raw_scale,
        max_scale,
        applied: raw_scale.min(max_scale),
        compact,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame Scheduling
// ─────────────────────────────────────────────────────────────────────────────

/// Asks the host loop for future frames.
pub trait FrameScheduler {
    /// Run another frame as soon as possible.
    fn request_frame(&self);

    /// Run a frame no later than `delay` from now.
    fn request_frame_after(&self, delay: Duration);
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measurement {
    Idle,
    /// Started before the end of frame `since`
    Waiting { since: u64 },
}

/// Debounced, frame-deferred scale recomputation for one preview root.
pub struct ScaleController {
    settings: ScaleSettings,
    debouncer: Debouncer,
    clock: Box<dyn Clock>,
    scheduler: Box<dyn FrameScheduler>,
    viewport_width: f32,
    measurement: Measurement,
    /// Frames ended so far
    frames: u64,
    retries: u32,
    last: Option<ScaleDecision>,
}

impl ScaleController {
    pub fn new(
        settings: ScaleSettings,
        clock: Box<dyn Clock>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(settings.debounce_window()),
            settings,
            clock,
            scheduler,
            viewport_width: 0.0,
            measurement: Measurement::Idle,
            frames: 0,
            retries: 0,
            last: None,
        }
    }

    /// First recomputation at startup, bypassing the rate limit.
    pub fn start(&mut self, viewport_width: f32) {
        self.viewport_width = viewport_width;
        self.begin_measurement();
    }

    /// The viewport changed width.
    pub fn on_resize(&mut self, viewport_width: f32) {
        self.viewport_width = viewport_width;
        let now = self.clock.now();
        match self.debouncer.call(now) {
            Trigger::Now => self.begin_measurement(),
            Trigger::Deferred(deadline) => {
                self.scheduler
                    .request_frame_after(deadline.saturating_duration_since(now));
            }
        }
    }

    /// End the current frame.
    ///
    /// Call once per frame, after the preview has been painted. A
    /// measurement started during frame N (by `start`, `on_resize` or a
    /// deferred run) reads the layout in frame N + 2, whether it began
    /// before or inside this call.
    ///
    /// Returns the new transform for the preview when a measurement
    /// completed this frame.
    pub fn on_frame(&mut self, probe: &dyn LayoutProbe, target: NodeId) -> Option<PaperTransform> {
        let transform = self.advance(probe, target);
        self.frames += 1;
        transform
    }

    fn advance(&mut self, probe: &dyn LayoutProbe, target: NodeId) -> Option<PaperTransform> {
        if self.debouncer.poll(self.clock.now()) {
            self.begin_measurement();
            return None;
        }

        let Measurement::Waiting { since } = self.measurement else {
            return None;
        };

        if self.frames - since < MEASURE_AFTER_FRAMES {
            self.scheduler.request_frame();
            return None;
        }

        self.measure(probe, target)
    }

    fn begin_measurement(&mut self) {
        self.measurement = Measurement::Waiting { since: self.frames };
        self.scheduler.request_frame();
    }

    fn measure(&mut self, probe: &dyn LayoutProbe, target: NodeId) -> Option<PaperTransform> {
        let width = match probe.computed_width(target) {
            Ok(width) if width.is_finite() && width > 0.0 => width,
            Ok(width) => {
                debug!("Paper {} measured {} wide, measuring again", target, width);
                self.retry();
                return None;
            }
            Err(err) if err.is_transient() => {
                debug!("{}, measuring again", err);
                self.retry();
                return None;
            }
            Err(err) => {
                warn!("Could not measure paper {}: {}", target, err);
                self.measurement = Measurement::Idle;
                return None;
            }
        };

        self.measurement = Measurement::Idle;
        self.retries = 0;

        let decision = compute_scale(self.viewport_width, width, &self.settings);
        let transform = decision.transform(&self.settings);
        debug!(
            "Viewport {} / paper {}: raw {:.3}, max {:.2}, {}",
            decision.viewport_width,
            decision.paper_width,
            decision.raw_scale,
            decision.max_scale,
            transform.describe()
        );
        self.last = Some(decision);
        Some(transform)
    }

    fn retry(&mut self) {
        self.retries += 1;
        self.begin_measurement();
    }

    /// The most recent completed computation.
    pub fn last_decision(&self) -> Option<ScaleDecision> {
        self.last
    }

    #[cfg(test)]
    pub fn is_measuring(&self) -> bool {
        self.measurement != Measurement::Idle
    }

    /// Measurements restarted since the last success.
    #[cfg(test)]
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::scale::clock::ManualClock;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_compute_scale_at_breakpoint() {
        let d = compute_scale(930.0, 1200.0, &ScaleSettings::default());
        assert_eq!(d.max_width, 898.0);
        assert_eq!(d.max_scale, 0.8);
        assert!(close(d.raw_scale, 0.748));
        assert!(close(d.applied, 0.748));
        assert!(d.compact);

        let t = d.transform(&ScaleSettings::default());
        assert!(t.recenter);
        assert!(close(t.margin_y_percent.unwrap(), (d.applied - 1.0) * 50.0));
    }

    #[test]
    fn test_compute_scale_wide_viewport() {
        let d = compute_scale(1400.0, 1200.0, &ScaleSettings::default());
        assert_eq!(d.max_width, 1368.0);
        assert_eq!(d.max_scale, 1.0);
        assert!(close(d.raw_scale, 1.14));
        assert_eq!(d.applied, 1.0);
        assert!(!d.compact);
        assert!(d.transform(&ScaleSettings::default()).is_identity());
    }

    #[test]
    fn test_compact_caps_at_compact_max() {
        let d = compute_scale(900.0, 400.0, &ScaleSettings::default());
        assert_eq!(d.applied, 0.8);
        assert_eq!(d.transform(&ScaleSettings::default()).margin_y_percent, None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Controller
    // ─────────────────────────────────────────────────────────────────────────

    #[derive(Clone, Default)]
    struct RecordingScheduler {
        frames: Rc<Cell<u32>>,
        delayed: Rc<RefCell<Vec<Duration>>>,
    }

    impl FrameScheduler for RecordingScheduler {
        fn request_frame(&self) {
            self.frames.set(self.frames.get() + 1);
        }

        fn request_frame_after(&self, delay: Duration) {
            self.delayed.borrow_mut().push(delay);
        }
    }

    /// A probe answering from a script, one answer per query; the last
    /// answer repeats.
    struct ScriptedProbe {
        answers: RefCell<Vec<Option<f32>>>,
        queries: Cell<u32>,
    }

    impl ScriptedProbe {
        fn new(answers: &[Option<f32>]) -> Self {
            let mut answers = answers.to_vec();
            answers.reverse();
            Self {
                answers: RefCell::new(answers),
                queries: Cell::new(0),
            }
        }
    }

    impl LayoutProbe for ScriptedProbe {
        fn computed_width(&self, node: NodeId) -> Result<f32> {
            self.queries.set(self.queries.get() + 1);
            let mut answers = self.answers.borrow_mut();
            let answer = if answers.len() > 1 {
                answers.pop().flatten()
            } else {
                answers.last().copied().flatten()
            };
            answer.ok_or(Error::NotMounted { node })
        }
    }

    fn controller() -> (ScaleController, ManualClock, RecordingScheduler) {
        let clock = ManualClock::new();
        let scheduler = RecordingScheduler::default();
        let controller = ScaleController::new(
            ScaleSettings::default(),
            Box::new(clock.clone()),
            Box::new(scheduler.clone()),
        );
        (controller, clock, scheduler)
    }

    const ROOT: NodeId = NodeId(0);

    #[test]
    fn test_start_measures_after_two_frames() {
        let (mut c, _clock, scheduler) = controller();
        let probe = ScriptedProbe::new(&[Some(600.0)]);

        // Frame N: the preview starts the controller, then the frame ends
        c.start(930.0);
        assert!(c.is_measuring());
        assert!(scheduler.frames.get() >= 1);
        assert_eq!(c.on_frame(&probe, ROOT), None);

        // Frame N + 1
        assert_eq!(c.on_frame(&probe, ROOT), None);
        assert_eq!(probe.queries.get(), 0);

        // Frame N + 2
        let transform = c.on_frame(&probe, ROOT).unwrap();
        assert_eq!(probe.queries.get(), 1);
        assert!(close(transform.scale, 0.8));
        assert!(transform.recenter);
        assert!(!c.is_measuring());
    }

    #[test]
    fn test_not_mounted_restarts_measurement() {
        let (mut c, _clock, _scheduler) = controller();
        let probe = ScriptedProbe::new(&[None, Some(0.0), Some(1200.0)]);

        c.start(930.0);
        let mut results = Vec::new();
        for _ in 0..7 {
            results.push(c.on_frame(&probe, ROOT));
        }

        // Not mounted, then a zero width, then success: each retry waits
        // two more frames
        assert_eq!(probe.queries.get(), 3);
        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
        assert!(results[6].is_some());
        assert_eq!(c.retries(), 0);
        assert!(close(c.last_decision().unwrap().applied, 0.748));
    }

    #[test]
    fn test_leading_resize_starts_measurement() {
        let (mut c, _clock, scheduler) = controller();
        let probe = ScriptedProbe::new(&[Some(600.0)]);

        c.on_resize(1400.0);
        assert!(c.is_measuring());
        assert!(scheduler.delayed.borrow().is_empty());

        c.on_frame(&probe, ROOT);
        assert_eq!(c.on_frame(&probe, ROOT), None);
        let transform = c.on_frame(&probe, ROOT).unwrap();
        assert!(transform.is_identity());
    }

    #[test]
    fn test_resize_burst_is_debounced() {
        let (mut c, clock, scheduler) = controller();
        let probe = ScriptedProbe::new(&[Some(600.0)]);

        c.on_resize(1400.0);
        c.on_frame(&probe, ROOT);
        c.on_frame(&probe, ROOT);
        c.on_frame(&probe, ROOT);
        assert_eq!(probe.queries.get(), 1);

        for width in [1300.0, 1000.0, 800.0] {
            clock.advance_ms(50);
            c.on_resize(width);
            c.on_frame(&probe, ROOT);
        }
        assert_eq!(probe.queries.get(), 1);
        assert_eq!(
            scheduler.delayed.borrow().last().copied(),
            Some(Duration::from_millis(300))
        );

        // Trailing run one window after the last call, then two frames
        clock.advance_ms(300);
        assert_eq!(c.on_frame(&probe, ROOT), None);
        c.on_frame(&probe, ROOT);
        let transform = c.on_frame(&probe, ROOT).unwrap();
        assert_eq!(probe.queries.get(), 2);

        // Measured with the latest viewport width
        let decision = c.last_decision().unwrap();
        assert_eq!(decision.viewport_width, 800.0);
        assert!(close(transform.scale, 0.8));
    }

    #[test]
    fn test_idle_frames_do_nothing() {
        let (mut c, _clock, scheduler) = controller();
        let probe = ScriptedProbe::new(&[Some(600.0)]);
        for _ in 0..5 {
            assert_eq!(c.on_frame(&probe, ROOT), None);
        }
        assert_eq!(probe.queries.get(), 0);
        assert_eq!(scheduler.frames.get(), 0);
    }
}

//! Status/progress overlay
//!
//! Layout, from the bottom of the frame up:
//!
//! ```text
//! y = h-25  +-------------------------------------------+  bar, black @ alpha 150
//! y = h-20  | message                                   |  white text at x = 5
//! y = h-10  | #########                                 |  progress, 5px high
//!           +-------------------------------------------+  track width w-10
//! ```

use crate::target::{Color, FrameTarget, Point, Rect};
use bb_core::config::OverlayConfig;
use std::time::{Duration, Instant};
use tracing::trace;

const BAR_HEIGHT: u32 = 25;
const BAR_ALPHA: u8 = 150;
const MARGIN: u32 = 5;
const TEXT_OFFSET: u32 = 20;
const PROGRESS_OFFSET: u32 = 10;
const PROGRESS_HEIGHT: u32 = 5;

/// Pixels the indeterminate segment moves per draw
const SWEEP_STEP: u32 = 4;

/// What a successful render put on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayDraw {
    /// Filled fraction of the track; `value` is already clamped to `total`
    Fraction { value: u32, total: u32, width: u32 },
    /// Quarter-width segment at `offset` pixels into the track
    Indeterminate { offset: u32, width: u32 },
}

/// Overlay state owned by the runtime for one session
#[derive(Debug, Clone)]
pub struct OverlayPresenter {
    enabled: bool,
    message: String,
    progress: (u32, u32),
    min_interval: Duration,
    last_draw: Option<Instant>,
    sweep: u32,
}

impl Default for OverlayPresenter {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

impl OverlayPresenter {
    pub fn new(enabled: bool, min_interval: Duration) -> Self {
        Self {
            enabled,
            message: String::new(),
            progress: (0, 0),
            min_interval,
            last_draw: None,
            sweep: 0,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(
            config.enabled,
            Duration::from_millis(config.min_redraw_interval_ms),
        )
    }

    /// Persists until changed. While disabled nothing is ever drawn.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the status text
    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = text.into();
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Store the progress pair; `total == 0` selects the indeterminate indicator
    pub fn set_progress(&mut self, value: u32, total: u32) {
        self.progress = (value, total);
    }

    pub fn progress(&self) -> (u32, u32) {
        self.progress
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn set_min_interval(&mut self, interval: Duration) {
        self.min_interval = interval;
    }

    /// Draw if enabled and either `force` is set or the redraw interval elapsed
    pub fn try_render(&mut self, target: &mut dyn FrameTarget, force: bool) -> Option<OverlayDraw> {
        self.try_render_at(target, force, Instant::now())
    }

    /// [`try_render`](Self::try_render) with an explicit clock reading
    pub fn try_render_at(
        &mut self,
        target: &mut dyn FrameTarget,
        force: bool,
        now: Instant,
    ) -> Option<OverlayDraw> {
        if !self.enabled {
            return None;
        }

        if !force {
            if let Some(last) = self.last_draw {
                if now.saturating_duration_since(last) < self.min_interval {
                    return None;
                }
            }
        }

        let draw = self.draw(target);
        self.last_draw = Some(now);
        trace!("Overlay drawn: {:?}", draw);
        Some(draw)
    }

    fn draw(&mut self, target: &mut dyn FrameTarget) -> OverlayDraw {
        let (w, h) = target.size();
        let h = h as i32;
        let track = w.saturating_sub(MARGIN * 2);

        target.fill_rect(
            Rect::new(0, h - BAR_HEIGHT as i32, w, BAR_HEIGHT),
            Color::BLACK.with_alpha(BAR_ALPHA),
        );

        if !self.message.is_empty() {
            target.draw_text(
                &self.message,
                Point::new(MARGIN as i32, h - TEXT_OFFSET as i32),
                Color::WHITE,
            );
        }

        let (value, total) = self.progress;
        let y = h - PROGRESS_OFFSET as i32;

        if total == 0 {
            let width = track / 4;
            let travel = track - width;
            let offset = if travel == 0 {
                0
            } else {
                self.sweep.wrapping_mul(SWEEP_STEP) % (travel + 1)
            };
            self.sweep = self.sweep.wrapping_add(1);

            target.fill_rect(
                Rect::new((MARGIN + offset) as i32, y, width, PROGRESS_HEIGHT),
                Color::WHITE,
            );
            OverlayDraw::Indeterminate { offset, width }
        } else {
            let value = value.min(total);
            let width = (track as u64 * value as u64 / total as u64) as u32;

            target.fill_rect(
                Rect::new(MARGIN as i32, y, width, PROGRESS_HEIGHT),
                Color::WHITE,
            );
            OverlayDraw::Fraction { value, total, width }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Framebuffer;

    fn presenter() -> OverlayPresenter {
        OverlayPresenter::new(true, Duration::from_millis(100))
    }

    #[test]
    fn test_half_progress() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(320, 240);
        overlay.set_progress(5, 10);

        let draw = overlay.try_render(&mut fb, true);
        assert_eq!(
            draw,
            Some(OverlayDraw::Fraction {
                value: 5,
                total: 10,
                width: 155
            })
        );

        // filled up to x = 5 + 155
        assert_eq!(fb.pixel(5, 230), Some([255, 255, 255, 255]));
        assert_eq!(fb.pixel(159, 234), Some([255, 255, 255, 255]));
        assert_ne!(fb.pixel(160, 230), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_zero_total_is_indeterminate() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(320, 240);
        overlay.set_progress(0, 0);

        let draw = overlay.try_render(&mut fb, true);
        assert!(matches!(
            draw,
            Some(OverlayDraw::Indeterminate { width: 77, .. })
        ));
    }

    #[test]
    fn test_indeterminate_sweeps() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(100, 50);

        let offsets: Vec<u32> = (0..3)
            .filter_map(|_| match overlay.try_render(&mut fb, true) {
                Some(OverlayDraw::Indeterminate { offset, .. }) => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![0, SWEEP_STEP, SWEEP_STEP * 2]);
    }

    #[test]
    fn test_value_is_clamped() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(110, 40);
        overlay.set_progress(15, 10);

        assert_eq!(
            overlay.try_render(&mut fb, true),
            Some(OverlayDraw::Fraction {
                value: 10,
                total: 10,
                width: 100
            })
        );
    }

    #[test]
    fn test_disabled_never_writes() {
        let mut overlay = presenter();
        overlay.set_enabled(false);
        overlay.set_message("loading");
        overlay.set_progress(1, 2);
        let mut fb = Framebuffer::new(64, 64);

        assert_eq!(overlay.try_render(&mut fb, true), None);
        assert_eq!(overlay.try_render(&mut fb, false), None);
        assert_eq!(fb.write_count(), 0);
        assert!(fb.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_redraw_interval() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(64, 64);
        let t0 = Instant::now();

        assert!(overlay.try_render_at(&mut fb, false, t0).is_some());
        assert!(overlay
            .try_render_at(&mut fb, false, t0 + Duration::from_millis(50))
            .is_none());
        assert!(overlay
            .try_render_at(&mut fb, true, t0 + Duration::from_millis(60))
            .is_some());
        // forced draw restarts the interval
        assert!(overlay
            .try_render_at(&mut fb, false, t0 + Duration::from_millis(120))
            .is_none());
        assert!(overlay
            .try_render_at(&mut fb, false, t0 + Duration::from_millis(160))
            .is_some());
    }

    #[test]
    fn test_zero_interval_draws_every_call() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(64, 64);
        let t0 = Instant::now();

        overlay.set_min_interval(Duration::ZERO);
        assert_eq!(overlay.min_interval(), Duration::ZERO);
        assert!(overlay.try_render_at(&mut fb, false, t0).is_some());
        assert!(overlay.try_render_at(&mut fb, false, t0).is_some());

        overlay.set_min_interval(Duration::from_secs(1));
        assert!(overlay
            .try_render_at(&mut fb, false, t0 + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn test_message_drawn() {
        let mut overlay = presenter();
        let mut fb = Framebuffer::new(64, 64);

        overlay.try_render(&mut fb, true);
        assert!(fb.text_runs().is_empty());

        overlay.set_message("Connecting...");
        overlay.try_render(&mut fb, true);
        let run = &fb.text_runs()[0];
        assert_eq!(run.text, "Connecting...");
        assert_eq!(run.at, Point::new(5, 44));
        assert_eq!(run.color, Color::WHITE);
    }

    #[test]
    fn test_from_config() {
        let config = OverlayConfig {
            enabled: false,
            min_redraw_interval_ms: 250,
        };
        let overlay = OverlayPresenter::from_config(&config);
        assert!(!overlay.is_enabled());
        assert_eq!(overlay.min_interval(), Duration::from_millis(250));
    }
}

//! Diagnostic overlay for blitbridge
//!
//! Draws a status message and a progress indicator on top of whatever the
//! payload rendered, independent of the payload's own state.

pub mod presenter;
pub mod target;

pub use presenter::{OverlayDraw, OverlayPresenter};
pub use target::{Color, Framebuffer, FrameTarget, Point, Rect, TextRun};

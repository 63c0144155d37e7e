//! One-shot pointer and scroll effects: hover sparkles, click ripples, hover
//! pulses and scroll parallax. None of them keep state between firings
//! beyond the scroll throttle.

use crate::rng::EffectRng;

mod dom;

pub use dom::EffectTriggers;

pub const SPARKLE_TARGETS: &str = ".project-card";
pub const PULSE_TARGETS: &str = ".skill-item";
pub const GLOW_TARGETS: &str = ".social-card";
pub const RIPPLE_TARGETS: &str = "button, .social-card, .project-card";
pub const PARALLAX_TARGETS: &str = ".pixel-avatar, .skill-item";
pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Start point (viewport coordinates) and travel of one hover sparkle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkleSpec {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

pub fn hover_sparkles(rect: &Rect, count: usize, rng: &mut EffectRng) -> Vec<SparkleSpec> {
    (0..count)
        .map(|_| SparkleSpec {
            x: rect.left + rng.next_f64() * rect.width,
            y: rect.top + rng.next_f64() * rect.height,
            dx: (rng.next_f64() - 0.5) * 100.0,
            dy: -50.0 - rng.next_f64() * 50.0,
        })
        .collect()
}

/// Square ripple box, positioned relative to the clicked element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RippleSpec {
    pub size: f64,
    pub left: f64,
    pub top: f64,
}

pub fn ripple_for(rect: &Rect, client_x: f64, client_y: f64) -> RippleSpec {
    let size = rect.width.max(rect.height);
    RippleSpec {
        size,
        left: client_x - rect.left - size / 2.0,
        top: client_y - rect.top - size / 2.0,
    }
}

/// Vertical offsets for the parallax set; element `i` moves at
/// `base + i * step` times the scroll distance, upward.
pub fn parallax_offsets(scroll_y: f64, count: usize, base: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| -(scroll_y * (base + i as f64 * step))).collect()
}

/// At most one parallax update in flight per frame.
#[derive(Debug, Default)]
pub struct FrameThrottle {
    pending: bool,
}

impl FrameThrottle {
    /// True when the caller should schedule an update.
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn done(&mut self) {
        self.pending = false;
    }
}

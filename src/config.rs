//! Tunables for every effect. Defaults reproduce the portfolio page look.

use crate::error::{EffectsError, Result};

/// Palette used by the pixel field. The last entry is the neutral colour
/// that is drawn without a glow pass.
pub const PIXEL_PALETTE: [&str; 4] = ["#ff0040", "#cc0000", "#ff3366", "#ffffff"];
pub const NEUTRAL_COLOR: &str = "#ffffff";

/// Upper bound on the particle pool; the arena is allocated up front.
pub const MAX_PARTICLE_CAPACITY: usize = 1000;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectsConfig {
    // --- Pixel field ---
    pub canvas_id: String,
    pub pixel_spacing: u32,
    pub pixel_size: f64,
    pub pixel_retention: f64,
    pub trail_color: String,
    pub trail_alpha: f64,
    pub glow_blur: f64,

    // --- Particles ---
    pub particle_container: String,
    pub particle_capacity: usize,
    pub stagger_ms: u32,
    pub replenish_ms: u32,
    pub drift_span_px: f64,
    pub min_duration_ms: f64,
    pub duration_span_ms: f64,

    // --- Governor ---
    pub fps_threshold: u32,
    pub sample_window_ms: f64,
    pub low_performance_class: String,

    // --- Triggers ---
    pub hover_sparkles: usize,
    pub sparkle_duration_ms: f64,
    pub ripple_duration_ms: f64,
    pub parallax_base_speed: f64,
    pub parallax_speed_step: f64,
    pub loaded_delay_ms: u32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            canvas_id: "pixelBackground".into(),
            pixel_spacing: 20,
            pixel_size: 4.0,
            pixel_retention: 0.3,
            trail_color: "rgb(10, 10, 10)".into(),
            trail_alpha: 0.1,
            glow_blur: 10.0,

            particle_container: ".particle-container".into(),
            particle_capacity: 30,
            stagger_ms: 200,
            replenish_ms: 500,
            drift_span_px: 200.0,
            min_duration_ms: 2000.0,
            duration_span_ms: 3000.0,

            fps_threshold: 30,
            sample_window_ms: 1000.0,
            low_performance_class: "low-performance".into(),

            hover_sparkles: 5,
            sparkle_duration_ms: 1000.0,
            ripple_duration_ms: 600.0,
            parallax_base_speed: 0.5,
            parallax_speed_step: 0.1,
            loaded_delay_ms: 1000,
        }
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(EffectsError::InvalidConfig(format!("{name} must be finite and > 0, got {v}")))
    }
}

fn non_negative(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(EffectsError::InvalidConfig(format!("{name} must be finite and >= 0, got {v}")))
    }
}

impl EffectsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pixel_spacing == 0 {
            return Err(EffectsError::InvalidConfig("pixel_spacing must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.pixel_retention) {
            return Err(EffectsError::InvalidConfig(format!(
                "pixel_retention {} outside [0, 1]",
                self.pixel_retention
            )));
        }
        if self.particle_capacity == 0 || self.particle_capacity > MAX_PARTICLE_CAPACITY {
            return Err(EffectsError::InvalidConfig(format!(
                "particle_capacity {} outside 1..={MAX_PARTICLE_CAPACITY}",
                self.particle_capacity
            )));
        }
        if self.stagger_ms == 0 || self.replenish_ms == 0 {
            return Err(EffectsError::InvalidConfig("timer periods must be > 0".into()));
        }
        positive("sample_window_ms", self.sample_window_ms)?;
        positive("min_duration_ms", self.min_duration_ms)?;
        positive("sparkle_duration_ms", self.sparkle_duration_ms)?;
        positive("ripple_duration_ms", self.ripple_duration_ms)?;
        non_negative("duration_span_ms", self.duration_span_ms)?;
        non_negative("drift_span_px", self.drift_span_px)?;
        Ok(())
    }

    /// Parse a partial JSON object; missing keys keep their defaults.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: EffectsConfig = serde_json::from_str(json)
            .map_err(|e| EffectsError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

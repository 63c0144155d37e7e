//! Pixel field background.
//!
//! A sparse grid of small squares, each pulsing with its own sine speed, drawn
//! every frame over a translucent dark fill so older frames leave a trail.

use crate::config::{EffectsConfig, NEUTRAL_COLOR, PIXEL_PALETTE};
use crate::rng::EffectRng;

mod canvas;

pub use canvas::{CanvasRaster, PixelBackground};

// --- Drawing surface ------------------------------------------------------------

/// The 2D primitives the animator needs from a drawing surface.
pub trait Raster {
    fn size(&self) -> (f64, f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64);
    /// Same as `fill_rect` but with a blurred shadow of `color`.
    fn glow_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64, blur: f64);
}

// --- Pixel model ------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub alpha: f64, // base opacity, [0.1, 0.6)
    pub speed: f64, // radians per ms, [0.01, 0.03)
    pub color: &'static str,
}

impl Pixel {
    /// Brightness multiplier in [0, 1].
    pub fn pulse(&self, now_ms: f64) -> f64 {
        (now_ms * self.speed).sin() * 0.5 + 0.5
    }

    pub fn opacity_at(&self, now_ms: f64) -> f64 {
        self.alpha * self.pulse(now_ms)
    }

    pub fn glows(&self) -> bool {
        self.color != NEUTRAL_COLOR
    }
}

/// Grid sample for a `width` x `height` viewport.
pub fn generate_pixels(
    width: f64,
    height: f64,
    cfg: &EffectsConfig,
    rng: &mut EffectRng,
) -> Vec<Pixel> {
    let mut pixels = Vec::new();
    if width <= 0.0 || height <= 0.0 {
        return pixels;
    }
    let step = cfg.pixel_spacing as f64;
    let mut x = 0.0;
    while x < width {
        let mut y = 0.0;
        while y < height {
            if rng.next_f64() < cfg.pixel_retention {
                pixels.push(Pixel {
                    x,
                    y,
                    size: cfg.pixel_size,
                    alpha: rng.span(0.1, 0.5),
                    speed: rng.span(0.01, 0.02),
                    color: PIXEL_PALETTE[rng.index(PIXEL_PALETTE.len())],
                });
            }
            y += step;
        }
        x += step;
    }
    pixels
}

/// Number of grid cells sampled for a viewport; upper bound on the pixel count.
pub fn grid_cells(width: f64, height: f64, spacing: u32) -> usize {
    if width <= 0.0 || height <= 0.0 || spacing == 0 {
        return 0;
    }
    let s = spacing as f64;
    (width / s).ceil() as usize * (height / s).ceil() as usize
}

// --- Animator -------------------------------------------------------------------------

pub struct PixelField<R: Raster> {
    raster: R,
    pixels: Vec<Pixel>,
    rng: EffectRng,
    cfg: EffectsConfig,
    frames: u64,
}

impl<R: Raster> PixelField<R> {
    /// Builds the pixel set for the raster's current size.
    pub fn initialize(raster: R, cfg: EffectsConfig, mut rng: EffectRng) -> Self {
        let (w, h) = raster.size();
        let pixels = generate_pixels(w, h, &cfg, &mut rng);
        log::debug!("pixel field {}x{}: {} pixels", w, h, pixels.len());
        Self {
            raster,
            pixels,
            rng,
            cfg,
            frames: 0,
        }
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn raster(&self) -> &R {
        &self.raster
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Full regeneration; nothing from the previous set survives.
    pub fn on_viewport_resize(&mut self, width: f64, height: f64) {
        self.pixels = generate_pixels(width, height, &self.cfg, &mut self.rng);
        let n = self.pixels.len();
        log::debug!("pixel field resized to {width}x{height}: {n} pixels");
    }

    pub fn render_frame(&mut self, now_ms: f64) {
        let (w, h) = self.raster.size();
        self.raster.fill_rect(0.0, 0.0, w, h, &self.cfg.trail_color, self.cfg.trail_alpha);
        let blur = self.cfg.glow_blur;
        for p in &self.pixels {
            let alpha = p.opacity_at(now_ms);
            self.raster.fill_rect(p.x, p.y, p.size, p.size, p.color, alpha);
            if p.glows() {
                self.raster.glow_rect(p.x, p.y, p.size, p.size, p.color, alpha, blur);
            }
        }
        self.frames += 1;
    }
}

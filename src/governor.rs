//! Frame-rate governor.
//!
//! Counts frames in one-second windows. The first window whose rate falls
//! under the threshold moves the page into degraded mode for good and fires
//! the mitigation once.

use crate::config::EffectsConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityState {
    Nominal,
    Degraded,
}

/// Rolling frame counter for the current window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceSample {
    pub frames: u32,
    pub window_start: f64,
}

/// What the governor does to the page on the degrade edge.
pub trait Mitigation {
    fn reduce_quality(&mut self, fps: u32);
}

impl<F: FnMut(u32)> Mitigation for F {
    fn reduce_quality(&mut self, fps: u32) {
        self(fps)
    }
}

pub struct PerformanceGovernor {
    sample: PerformanceSample,
    state: QualityState,
    fps: u32,
    threshold: u32,
    window_ms: f64,
}

impl PerformanceGovernor {
    pub fn new(now_ms: f64, cfg: &EffectsConfig) -> Self {
        Self {
            sample: PerformanceSample {
                frames: 0,
                window_start: now_ms,
            },
            state: QualityState::Nominal,
            fps: 60,
            threshold: cfg.fps_threshold,
            window_ms: cfg.sample_window_ms,
        }
    }

    pub fn state(&self) -> QualityState {
        self.state
    }

    /// Rate measured by the last completed window (60 before the first).
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn sample_state(&self) -> PerformanceSample {
        self.sample
    }

    /// Call once per frame. Returns the fps when a window closed on this frame.
    pub fn sample(&mut self, now_ms: f64, mitigation: &mut impl Mitigation) -> Option<u32> {
        self.sample.frames += 1;
        let elapsed = now_ms - self.sample.window_start;
        if elapsed < self.window_ms {
            return None;
        }
        let fps = (self.sample.frames as f64 * 1000.0 / elapsed).round() as u32;
        self.fps = fps;
        self.sample = PerformanceSample {
            frames: 0,
            window_start: now_ms,
        };
        if fps < self.threshold {
            log::warn!("low fps detected: {fps}");
            if self.degrade() {
                mitigation.reduce_quality(fps);
            }
        }
        Some(fps)
    }

    /// The only transition; true exactly once.
    fn degrade(&mut self) -> bool {
        match self.state {
            QualityState::Nominal => {
                self.state = QualityState::Degraded;
                log::warn!("switching to reduced-quality mode");
                true
            }
            QualityState::Degraded => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `fps` evenly spaced frames per second for `seconds` seconds.
    fn run(
        gov: &mut PerformanceGovernor,
        start: f64,
        fps: u32,
        seconds: u32,
        hits: &mut Vec<u32>,
    ) -> f64 {
        let step = 1000.0 / fps as f64;
        let mut t = start;
        for _ in 0..fps * seconds {
            t += step;
            gov.sample(t, &mut |f: u32| hits.push(f));
        }
        t
    }

    #[test]
    fn healthy_rate_stays_nominal() {
        let mut gov = PerformanceGovernor::new(0.0, &EffectsConfig::default());
        let mut hits: Vec<u32> = Vec::new();
        run(&mut gov, 0.0, 60, 3, &mut hits);
        assert_eq!(gov.state(), QualityState::Nominal);
        assert_eq!(gov.fps(), 60);
        assert!(hits.is_empty());
    }

    #[test]
    fn window_reports_rounded_rate() {
        let mut gov = PerformanceGovernor::new(0.0, &EffectsConfig::default());
        let mut hits: Vec<u32> = Vec::new();
        for i in 1..45 {
            let closed = gov.sample(i as f64 * 20.0, &mut |f: u32| hits.push(f));
            assert_eq!(closed, None);
        }
        // 45th frame at 1250ms closes the window: 45 * 1000 / 1250 = 36
        assert_eq!(gov.sample(1250.0, &mut |f: u32| hits.push(f)), Some(36));
        let reset = PerformanceSample {
            frames: 0,
            window_start: 1250.0,
        };
        assert_eq!(gov.sample_state(), reset);
    }

    #[test]
    fn sustained_low_rate_degrades_exactly_once() {
        let mut gov = PerformanceGovernor::new(0.0, &EffectsConfig::default());
        let mut hits: Vec<u32> = Vec::new();
        let t = run(&mut gov, 0.0, 20, 2, &mut hits);
        run(&mut gov, t, 15, 3, &mut hits);
        assert_eq!(gov.state(), QualityState::Degraded);
        assert_eq!(hits, vec![20]);
    }

    #[test]
    fn recovery_does_not_restore_nominal() {
        let mut gov = PerformanceGovernor::new(0.0, &EffectsConfig::default());
        let mut hits: Vec<u32> = Vec::new();
        let t = run(&mut gov, 0.0, 20, 1, &mut hits);
        run(&mut gov, t, 60, 2, &mut hits);
        assert_eq!(gov.state(), QualityState::Degraded);
        assert_eq!(gov.fps(), 60);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn exactly_threshold_is_not_low() {
        let mut gov = PerformanceGovernor::new(0.0, &EffectsConfig::default());
        let mut hits: Vec<u32> = Vec::new();
        run(&mut gov, 0.0, 30, 2, &mut hits);
        assert_eq!(gov.state(), QualityState::Nominal);
    }
}

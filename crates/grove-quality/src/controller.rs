//! Feedback loop that tightens or relaxes LOD distances from measured FPS.
//!
//! Evaluation happens only when the sample window wraps, so the controller
//! can never react faster than one full window (about a second at 60 FPS).

use grove_lod::{LodClassifier, LodDistances};

use crate::window::{DEFAULT_CAPACITY, FrameTimeWindow};

/// Invalid controller configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityError {
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("min_fps ({min}) must not exceed target_fps ({target})")]
    MinAboveTarget { min: f32, target: f32 },

    #[error("shrink_factor must be in (0, 1), got {0}")]
    ShrinkFactor(f32),

    #[error("growth_factor must be greater than 1, got {0}")]
    GrowthFactor(f32),

    #[error("surplus_ratio must be at least 1, got {0}")]
    SurplusRatio(f32),

    #[error("invalid floors: {0}")]
    Floors(#[from] grove_lod::LodError),
}

/// Tuning for [`QualityController`].
#[derive(Clone, Debug, PartialEq)]
pub struct QualityConfig {
    /// Frame rate the session aims for.
    pub target_fps: f32,
    /// Below this average, thresholds shrink.
    pub min_fps: f32,
    /// Above `target_fps * surplus_ratio`, thresholds grow.
    pub surplus_ratio: f32,
    pub shrink_factor: f32,
    pub growth_factor: f32,
    /// No threshold is ever scaled below its floor.
    pub floors: LodDistances,
    /// Samples per evaluation.
    pub window: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            min_fps: 30.0,
            surplus_ratio: 1.2,
            shrink_factor: 0.8,
            growth_factor: 1.05,
            floors: LodDistances::new(2.0, 4.0, 8.0, 16.0),
            window: DEFAULT_CAPACITY,
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> Result<(), QualityError> {
        for (name, value) in [("target_fps", self.target_fps), ("min_fps", self.min_fps)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(QualityError::NonPositive { name, value });
            }
        }
        if self.min_fps > self.target_fps {
            return Err(QualityError::MinAboveTarget {
                min: self.min_fps,
                target: self.target_fps,
            });
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(QualityError::ShrinkFactor(self.shrink_factor));
        }
        if !(self.growth_factor > 1.0 && self.growth_factor.is_finite()) {
            return Err(QualityError::GrowthFactor(self.growth_factor));
        }
        if !(self.surplus_ratio >= 1.0 && self.surplus_ratio.is_finite()) {
            return Err(QualityError::SurplusRatio(self.surplus_ratio));
        }
        self.floors.validate()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityAction {
    /// Under load: distances shrank, less is drawn in detail.
    Shrink,
    /// Spare headroom: distances grew, more detail returns.
    Grow,
}

/// A threshold rewrite performed by the controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityAdjustment {
    pub action: QualityAction,
    pub average_fps: f32,
    pub before: LodDistances,
    pub after: LodDistances,
}

/// Watches per-frame durations and rescales the classifier's thresholds.
#[derive(Debug)]
pub struct QualityController {
    config: QualityConfig,
    window: FrameTimeWindow,
    enabled: bool,
    adjustments: u64,
    last_adjustment: Option<QualityAdjustment>,
}

impl QualityController {
    pub fn new(config: QualityConfig) -> Result<Self, QualityError> {
        config.validate()?;
        Ok(Self {
            window: FrameTimeWindow::new(config.window),
            config,
            enabled: true,
            adjustments: 0,
            last_adjustment: None,
        })
    }

    /// Record one frame's duration. When the window wraps, the rolling FPS is
    /// evaluated and `lod`'s thresholds may be rewritten; the rewrite is
    /// returned.
    pub fn record_frame_duration(
        &mut self,
        millis: f32,
        lod: &mut LodClassifier,
    ) -> Option<QualityAdjustment> {
        if !self.enabled {
            return None;
        }
        if self.window.push(millis) {
            self.evaluate(lod)
        } else {
            None
        }
    }

    fn evaluate(&mut self, lod: &mut LodClassifier) -> Option<QualityAdjustment> {
        let average_fps = self.window.average_fps()?;

        let (action, factor) = if average_fps < self.config.min_fps {
            (QualityAction::Shrink, self.config.shrink_factor)
        } else if average_fps > self.config.target_fps * self.config.surplus_ratio {
            (QualityAction::Grow, self.config.growth_factor)
        } else {
            log::trace!("quality steady at {average_fps:.1} FPS");
            return None;
        };

        let before = lod.distances();
        let after = before.scaled(factor, &self.config.floors);
        if after == before {
            log::debug!("quality {action:?} skipped, thresholds already at floors");
            return None;
        }

        if let Err(err) = lod.set_thresholds(after.into()) {
            log::warn!("quality controller produced invalid thresholds: {err}");
            return None;
        }

        let adjustment = QualityAdjustment {
            action,
            average_fps,
            before,
            after,
        };
        log::info!(
            "quality {:?} at {:.1} FPS: cull {:.1} -> {:.1}",
            action,
            average_fps,
            before.cull,
            after.cull
        );
        self.adjustments += 1;
        self.last_adjustment = Some(adjustment);
        Some(adjustment)
    }

    /// Turn sampling on or off. Disabling clears the window but leaves the
    /// thresholds already applied in place.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.window.clear();
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Rolling FPS over the samples currently in the window.
    pub fn average_fps(&self) -> Option<f32> {
        self.window.average_fps()
    }

    pub fn window(&self) -> &FrameTimeWindow {
        &self.window
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Total threshold rewrites performed.
    pub fn adjustments(&self) -> u64 {
        self.adjustments
    }

    pub fn last_adjustment(&self) -> Option<&QualityAdjustment> {
        self.last_adjustment.as_ref()
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self {
            window: FrameTimeWindow::default(),
            config: QualityConfig::default(),
            enabled: true,
            adjustments: 0,
            last_adjustment: None,
        }
    }
}

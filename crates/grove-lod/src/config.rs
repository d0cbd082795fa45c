//! Distance thresholds, named presets, and validation.

use crate::error::LodError;

/// Tier boundaries in world units. Must satisfy `high < medium < low < cull`.
///
/// Below `medium` is [`LodTier::High`](crate::LodTier::High), below `low` is
/// Medium, below `cull` is Low, and at or beyond `cull` is always
/// [`LodTier::Culled`](crate::LodTier::Culled). `high` does not split tiers;
/// it is validated and scaled with the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodDistances {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
    pub cull: f32,
}

impl LodDistances {
    pub const fn new(high: f32, medium: f32, low: f32, cull: f32) -> Self {
        Self {
            high,
            medium,
            low,
            cull,
        }
    }

    /// Check that every distance is finite, positive and strictly increasing.
    pub fn validate(&self) -> Result<(), LodError> {
        for (name, value) in self.named() {
            if !value.is_finite() || value <= 0.0 {
                return Err(LodError::InvalidDistance { name, value });
            }
        }
        if self.high < self.medium && self.medium < self.low && self.low < self.cull {
            Ok(())
        } else {
            Err(LodError::NonIncreasing {
                high: self.high,
                medium: self.medium,
                low: self.low,
                cull: self.cull,
            })
        }
    }

    /// Multiply every distance by `factor`, never going below the matching floor.
    ///
    /// If both `self` and `floors` are strictly increasing the result is too.
    pub fn scaled(&self, factor: f32, floors: &LodDistances) -> Self {
        Self {
            high: (self.high * factor).max(floors.high),
            medium: (self.medium * factor).max(floors.medium),
            low: (self.low * factor).max(floors.low),
            cull: (self.cull * factor).max(floors.cull),
        }
    }

    /// Overlay the fields present in `patch`.
    pub fn patched(&self, patch: &LodDistancesPatch) -> Self {
        Self {
            high: patch.high.unwrap_or(self.high),
            medium: patch.medium.unwrap_or(self.medium),
            low: patch.low.unwrap_or(self.low),
            cull: patch.cull.unwrap_or(self.cull),
        }
    }

    fn named(&self) -> [(&'static str, f32); 4] {
        [
            ("high", self.high),
            ("medium", self.medium),
            ("low", self.low),
            ("cull", self.cull),
        ]
    }
}

/// Partial threshold update; `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LodDistancesPatch {
    pub high: Option<f32>,
    pub medium: Option<f32>,
    pub low: Option<f32>,
    pub cull: Option<f32>,
}

impl From<LodDistances> for LodDistancesPatch {
    fn from(d: LodDistances) -> Self {
        Self {
            high: Some(d.high),
            medium: Some(d.medium),
            low: Some(d.low),
            cull: Some(d.cull),
        }
    }
}

/// Complete classifier configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodConfig {
    pub distances: LodDistances,
    /// Entities outside the view frustum are `Culled` when enabled.
    pub frustum_culling: bool,
    /// Overshoot required past a boundary before a tier change is honored.
    pub hysteresis_margin: f32,
}

impl LodConfig {
    pub fn validate(&self) -> Result<(), LodError> {
        self.distances.validate()?;
        if !self.hysteresis_margin.is_finite() || self.hysteresis_margin < 0.0 {
            return Err(LodError::InvalidMargin(self.hysteresis_margin));
        }
        Ok(())
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        LodPreset::Normal.config()
    }
}

/// Named, pre-validated configurations swapped as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LodPreset {
    /// Free camera roaming the world.
    Normal,
    /// Close-up camera (dialogue, inspection); distances are much shorter.
    CloseUp,
}

impl LodPreset {
    pub fn config(self) -> LodConfig {
        match self {
            LodPreset::Normal => LodConfig {
                distances: LodDistances::new(10.0, 25.0, 50.0, 100.0),
                frustum_culling: true,
                hysteresis_margin: 1.5,
            },
            LodPreset::CloseUp => LodConfig {
                distances: LodDistances::new(4.0, 10.0, 20.0, 40.0),
                frustum_culling: true,
                hysteresis_margin: 0.5,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LodPreset::Normal => "normal",
            LodPreset::CloseUp => "close-up",
        }
    }

    /// Parse a preset name as written in config files and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(LodPreset::Normal),
            "close-up" | "closeup" | "close_up" => Some(LodPreset::CloseUp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in [LodPreset::Normal, LodPreset::CloseUp] {
            assert!(preset.config().validate().is_ok(), "{preset:?} invalid");
        }
    }

    #[test]
    fn test_non_increasing_rejected() {
        let d = LodDistances::new(30.0, 25.0, 50.0, 100.0);
        assert!(matches!(d.validate(), Err(LodError::NonIncreasing { .. })));
        let equal = LodDistances::new(10.0, 10.0, 50.0, 100.0);
        assert!(equal.validate().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let d = LodDistances::new(f32::NAN, 25.0, 50.0, 100.0);
        assert!(matches!(
            d.validate(),
            Err(LodError::InvalidDistance { name: "high", value }) if value.is_nan()
        ));
        let neg = LodDistances::new(-1.0, 25.0, 50.0, 100.0);
        assert!(matches!(
            neg.validate(),
            Err(LodError::InvalidDistance { name: "high", .. })
        ));
    }

    #[test]
    fn test_scaled_respects_floors() {
        let d = LodDistances::new(10.0, 25.0, 50.0, 100.0);
        let floors = LodDistances::new(9.0, 4.0, 8.0, 16.0);
        let s = d.scaled(0.5, &floors);
        assert_eq!(s, LodDistances::new(9.0, 12.5, 25.0, 50.0));
    }

    #[test]
    fn test_patch_overlays_only_some_fields() {
        let d = LodDistances::new(10.0, 25.0, 50.0, 100.0);
        let p = LodDistancesPatch {
            cull: Some(120.0),
            ..Default::default()
        };
        assert_eq!(d.patched(&p), LodDistances::new(10.0, 25.0, 50.0, 120.0));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let mut config = LodConfig::default();
        config.hysteresis_margin = -0.1;
        assert_eq!(config.validate(), Err(LodError::InvalidMargin(-0.1)));
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(LodPreset::from_name("Close-Up"), Some(LodPreset::CloseUp));
        assert_eq!(LodPreset::from_name("normal"), Some(LodPreset::Normal));
        assert_eq!(LodPreset::from_name("ultra"), None);
        assert_eq!(LodPreset::CloseUp.name(), "close-up");
    }
}

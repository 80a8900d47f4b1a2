use serde::Serialize;

use crate::data::model::Layout;
use crate::error::{PlateError, Result};

/// Thresholds shared by every row of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationParams {
    /// Mass to transfer into each destination well (µg).
    pub transfer_mass_ug: f64,
    /// Smallest volume the robot may pipette (µL), inclusive.
    pub min_volume_ul: f64,
    /// Largest volume the robot may pipette (µL), inclusive.
    pub max_volume_ul: f64,
}

impl NormalizationParams {
    pub fn defaults_for(layout: Layout) -> Self {
        match layout {
            Layout::SinglePlate => NormalizationParams {
                transfer_mass_ug: 2.0,
                min_volume_ul: 3.0,
                max_volume_ul: 100.0,
            },
            Layout::TwoPlate => NormalizationParams {
                transfer_mass_ug: 2.0,
                min_volume_ul: 2.0,
                max_volume_ul: 100.0,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all_finite = [self.transfer_mass_ug, self.min_volume_ul, self.max_volume_ul]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(PlateError::InvalidParams(
                "transfer mass and volume bounds must be finite".into(),
            ));
        }
        if self.transfer_mass_ug <= 0.0 {
            return Err(PlateError::InvalidParams(format!(
                "transfer mass must be positive (got {})",
                self.transfer_mass_ug
            )));
        }
        if self.min_volume_ul < 0.0 || self.min_volume_ul > self.max_volume_ul {
            return Err(PlateError::InvalidParams(format!(
                "need 0 <= min volume <= max volume (got {} and {})",
                self.min_volume_ul, self.max_volume_ul
            )));
        }
        Ok(())
    }

    /// Volume (µL) that carries `transfer_mass_ug` at the given
    /// concentration (µg/mL).
    pub fn volume_for(&self, conc_ug_ml: f64) -> f64 {
        self.transfer_mass_ug / conc_ug_ml * 1000.0
    }

    pub fn in_range(&self, volume_ul: f64) -> bool {
        volume_ul >= self.min_volume_ul && volume_ul <= self.max_volume_ul
    }
}

/// Header fields of the Illumina sample sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSheetConfig {
    pub investigator: String,
    pub read_length: u32,
}

impl Default for SampleSheetConfig {
    fn default() -> Self {
        SampleSheetConfig {
            investigator: "Laserson Lab".to_string(),
            read_length: 75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_mass_over_concentration() {
        let p = NormalizationParams::defaults_for(Layout::SinglePlate);
        assert_eq!(p.volume_for(20.0), 100.0);
        assert_eq!(p.volume_for(0.0), f64::INFINITY);
        assert!(p.in_range(100.0));
        assert!(p.in_range(3.0));
        assert!(!p.in_range(100.001));
    }

    #[test]
    fn rejects_bad_parameters() {
        let base = NormalizationParams::defaults_for(Layout::TwoPlate);
        assert!(base.validate().is_ok());

        let zero_mass = NormalizationParams { transfer_mass_ug: 0.0, ..base };
        assert!(matches!(zero_mass.validate(), Err(PlateError::InvalidParams(_))));

        let inverted = NormalizationParams {
            min_volume_ul: 50.0,
            max_volume_ul: 10.0,
            ..base
        };
        assert!(inverted.validate().is_err());

        let nan = NormalizationParams { max_volume_ul: f64::NAN, ..base };
        assert!(nan.validate().is_err());
    }
}

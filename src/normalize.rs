//! Transfer volumes and well classification.
//!
//! Both layouts compute `volume = transfer_mass / concentration * 1000`
//! (µg over µg/mL gives mL, times 1000 gives µL) and compare it against the
//! inclusive `[min, max]` window.  They differ in how a row is flagged:
//!
//! * single plate: null → `empty`, above max → `too_dilute`, below min →
//!   `too_concentrated`, else `valid`;
//! * two plates: a row is `valid` if either plate is in range, drawing from
//!   the smaller in-range volume (ties go to plate 1).

use crate::config::NormalizationParams;
use crate::data::model::{Concentrations, NormFlag, SourcePlate, Transfer};

/// Volume and flag for one row.
pub fn normalize(concentrations: Concentrations, params: &NormalizationParams) -> (Transfer, NormFlag) {
    match concentrations {
        Concentrations::Single(conc) => normalize_single(conc, params),
        Concentrations::Pair(conc_1, conc_2) => normalize_pair(conc_1, conc_2, params),
    }
}

/// A NaN concentration carries no reading, so it counts as missing.
fn transfer_volume(conc: Option<f64>, params: &NormalizationParams) -> Option<f64> {
    conc.map(|c| params.volume_for(c)).filter(|v| !v.is_nan())
}

fn normalize_single(conc: Option<f64>, params: &NormalizationParams) -> (Transfer, NormFlag) {
    let volume = transfer_volume(conc, params);
    let flag = match volume {
        None => NormFlag::Empty,
        Some(v) => {
            let too_dilute = v > params.max_volume_ul;
            let too_concentrated = v < params.min_volume_ul;
            match (too_dilute, too_concentrated) {
                (true, true) => NormFlag::Weird,
                (true, false) => NormFlag::TooDilute,
                (false, true) => NormFlag::TooConcentrated,
                (false, false) => NormFlag::Valid,
            }
        }
    };
    (Transfer::Single { volume_ul: volume }, flag)
}

fn normalize_pair(
    conc_1: Option<f64>,
    conc_2: Option<f64>,
    params: &NormalizationParams,
) -> (Transfer, NormFlag) {
    let vol_1 = transfer_volume(conc_1, params);
    let vol_2 = transfer_volume(conc_2, params);

    let p1_valid = vol_1.is_some_and(|v| params.in_range(v));
    let p2_valid = vol_2.is_some_and(|v| params.in_range(v));

    let source = match (p1_valid, p2_valid) {
        (true, true) => {
            // both are in range here, so both volumes exist
            if vol_1 <= vol_2 {
                Some(SourcePlate::Plate1)
            } else {
                Some(SourcePlate::Plate2)
            }
        }
        (true, false) => Some(SourcePlate::Plate1),
        (false, true) => Some(SourcePlate::Plate2),
        (false, false) => None,
    };

    let any_above = [vol_1, vol_2].iter().flatten().any(|&v| v > params.max_volume_ul);
    let any_below = [vol_1, vol_2].iter().flatten().any(|&v| v < params.min_volume_ul);

    let flag = if source.is_some() {
        NormFlag::Valid
    } else if vol_1.is_none() && vol_2.is_none() {
        NormFlag::Empty
    } else if any_above && any_below {
        NormFlag::Weird
    } else if any_above {
        NormFlag::TooDilute
    } else if any_below {
        NormFlag::TooConcentrated
    } else {
        NormFlag::Invalid
    };

    let transfer = Transfer::TwoPlate {
        plate_1_ul: vol_1,
        plate_2_ul: vol_2,
        source,
    };
    (transfer, flag)
}

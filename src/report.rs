use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::NormalizationParams;
use crate::data::model::{NormFlag, NormalizedRow, Transfer};
use crate::plate::Well;

/// Further dilutions of plate 1 tried when suggesting how to rescue
/// out-of-range samples.
pub const DILUTION_FACTORS: [u32; 14] = [
    2, 3, 5, 10, 20, 50, 100, 200, 500, 1000, 5000, 10000, 100000, 1000000,
];

/// Row counts per classification flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagCounts {
    pub num_valid: usize,
    pub num_invalid: usize,
    pub num_too_dilute: usize,
    pub num_too_concentrated: usize,
    pub num_empty: usize,
    pub num_weird: usize,
}

impl FlagCounts {
    pub fn tally(rows: &[NormalizedRow]) -> Self {
        let mut counts = FlagCounts::default();
        for row in rows {
            let slot = match row.flag {
                NormFlag::Valid => &mut counts.num_valid,
                NormFlag::Invalid => &mut counts.num_invalid,
                NormFlag::TooDilute => &mut counts.num_too_dilute,
                NormFlag::TooConcentrated => &mut counts.num_too_concentrated,
                NormFlag::Empty => &mut counts.num_empty,
                NormFlag::Weird => &mut counts.num_weird,
            };
            *slot += 1;
        }
        counts
    }

    pub fn get(&self, flag: NormFlag) -> usize {
        match flag {
            NormFlag::Valid => self.num_valid,
            NormFlag::Invalid => self.num_invalid,
            NormFlag::TooDilute => self.num_too_dilute,
            NormFlag::TooConcentrated => self.num_too_concentrated,
            NormFlag::Empty => self.num_empty,
            NormFlag::Weird => self.num_weird,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DilutionHint {
    pub factor: u32,
    pub recoverable: usize,
}

/// `summary.yaml` of a single-plate run.
#[derive(Debug, Clone, Serialize)]
pub struct SinglePlateSummary {
    pub median_valid_transfer_vol_ul: Option<f64>,
    pub num_libraries: usize,
    #[serde(flatten)]
    pub counts: FlagCounts,
    pub parameters: NormalizationParams,
    pub invocation: String,
}

/// `summary.yaml` of a two-plate run.
#[derive(Debug, Clone, Serialize)]
pub struct TwoPlateSummary {
    pub median_transfer_vol: Option<f64>,
    pub num_libraries: usize,
    #[serde(flatten)]
    pub counts: FlagCounts,
    pub non_valid_wells: Vec<Well>,
    pub dilution_hints: Vec<DilutionHint>,
    pub parameters: NormalizationParams,
    pub invocation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Summary {
    SinglePlate(SinglePlateSummary),
    TwoPlate(TwoPlateSummary),
}

impl Summary {
    pub fn single_plate(
        rows: &[NormalizedRow],
        params: &NormalizationParams,
        invocation: &str,
    ) -> Self {
        let valid_volumes = rows
            .iter()
            .filter(|r| r.flag.is_valid())
            .filter_map(|r| r.transfer.volume_ul());
        let summary = SinglePlateSummary {
            median_valid_transfer_vol_ul: median(valid_volumes),
            num_libraries: count_libraries(rows),
            counts: FlagCounts::tally(rows),
            parameters: *params,
            invocation: invocation.to_string(),
        };
        log_counts(summary.num_libraries, &summary.counts);
        if let Some(m) = summary.median_valid_transfer_vol_ul {
            log::info!("median valid transfer vol ≈ {m:.0} µL");
        }
        Summary::SinglePlate(summary)
    }

    pub fn two_plate(
        rows: &[NormalizedRow],
        params: &NormalizationParams,
        invocation: &str,
    ) -> Self {
        let non_valid_wells: Vec<Well> = rows
            .iter()
            .filter(|r| !r.flag.is_valid())
            .map(|r| r.dest_well)
            .collect();
        let summary = TwoPlateSummary {
            median_transfer_vol: median(rows.iter().filter_map(|r| r.transfer.volume_ul())),
            num_libraries: count_libraries(rows),
            counts: FlagCounts::tally(rows),
            dilution_hints: dilution_hints(rows, params),
            non_valid_wells,
            parameters: *params,
            invocation: invocation.to_string(),
        };
        if let Some(m) = summary.median_transfer_vol {
            log::info!("median transfer vol ≈ {m:.0} µL");
        }
        log_counts(summary.num_libraries, &summary.counts);
        for hint in &summary.dilution_hints {
            log::info!(
                "Another {}x dilution of plate 1 may recover {} add'l samples",
                hint.factor,
                hint.recoverable
            );
        }
        if !summary.non_valid_wells.is_empty() {
            let wells: Vec<String> = summary.non_valid_wells.iter().map(Well::to_string).collect();
            log::info!("not valid dest wells: {}", wells.join(", "));
        }
        Summary::TwoPlate(summary)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn count_libraries(rows: &[NormalizedRow]) -> usize {
    rows.iter().filter(|r| r.library_id().is_some()).count()
}

fn log_counts(num_libraries: usize, counts: &FlagCounts) {
    log::info!("{num_libraries} libraries in this plate");
    for flag in NormFlag::ALL {
        log::info!("{} wells are {flag}", counts.get(flag));
    }
}

/// Median of the finite values; `None` when there are none.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

/// For each dilution factor, how many out-of-range libraries would land in
/// range if plate 1 were diluted that much further.  Factors that rescue
/// nothing are left out.
pub fn dilution_hints(rows: &[NormalizedRow], params: &NormalizationParams) -> Vec<DilutionHint> {
    let plate_1_volumes: Vec<f64> = rows
        .iter()
        .filter(|r| r.library_id().is_some())
        .filter(|r| {
            matches!(
                r.flag,
                NormFlag::TooDilute | NormFlag::TooConcentrated | NormFlag::Weird | NormFlag::Invalid
            )
        })
        .filter_map(|r| match r.transfer {
            Transfer::TwoPlate { plate_1_ul, .. } => plate_1_ul,
            Transfer::Single { volume_ul } => volume_ul,
        })
        .collect();

    let recovered: BTreeMap<u32, usize> = DILUTION_FACTORS
        .iter()
        .map(|&factor| {
            let n = plate_1_volumes
                .iter()
                .filter(|&&v| params.in_range(v * factor as f64))
                .count();
            (factor, n)
        })
        .collect();

    recovered
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(factor, recoverable)| DilutionHint { factor, recoverable })
        .collect()
}

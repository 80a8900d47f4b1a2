use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::data::model::SampleRow;
use crate::error::{PlateError, Result};
use crate::plate::{Well, all_wells};

/// Input columns that already tie a row to a barcode position.
const BARCODE_COLUMNS: [&str; 3] = ["bc_well", "bc_seq", "bc_read"];

/// RNG seed derived from the identifier set alone: ids are sorted before
/// hashing, so row order never matters.
pub fn seed_from_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> [u8; 32] {
    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_unstable();
    Sha256::digest(ids.concat().as_bytes()).into()
}

/// The 96 wells permuted by a ChaCha8 stream seeded with `seed`.
pub fn shuffled_wells(seed: [u8; 32]) -> Vec<Well> {
    let mut rng = ChaCha8Rng::from_seed(seed);
    let mut wells = all_wells();
    wells.shuffle(&mut rng);
    wells
}

/// Destination well for every row, in row order.
///
/// Without shuffling each sample stays where it is.  With shuffling the
/// permuted wells are handed out to rows taken in source-well plate order.
pub fn assign_destinations(
    rows: &[SampleRow],
    column_names: &[String],
    shuffle: bool,
) -> Result<Vec<Well>> {
    if !shuffle {
        return Ok(rows.iter().map(|r| r.source_well).collect());
    }

    let present: Vec<&str> = BARCODE_COLUMNS
        .iter()
        .copied()
        .filter(|c| column_names.iter().any(|n| n == c))
        .collect();
    if !present.is_empty() {
        return Err(PlateError::ShuffleWithBarcodes(present.join(", ")));
    }

    let seed = seed_from_ids(rows.iter().filter_map(|r| r.library_id.as_deref()));
    let wells = shuffled_wells(seed);

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_key(|&i| rows[i].source_well);

    let mut dest: Vec<Well> = rows.iter().map(|r| r.source_well).collect();
    for (well, &row_idx) in wells.iter().zip(&order) {
        dest[row_idx] = *well;
    }
    log::debug!("shuffled {} rows into destination wells", rows.len());
    Ok(dest)
}

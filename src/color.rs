use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::MetadataValue;

/// Fill used for wells whose value has no entry in a map.
pub const GRAY: &str = "#808080";

fn to_hex(rgb: Srgb) -> String {
    let rgb: Srgb<u8> = rgb.into_format();
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

fn from_hex(hex: u32) -> Srgb {
    Srgb::<u8>::from(hex).into_format()
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            to_hex(hsl.into_color())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Continuous scale
// ---------------------------------------------------------------------------

const VIRIDIS: [u32; 10] = [
    0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b,
    0xfde725,
];

/// Viridis at `t` in `[0, 1]`, interpolated linearly between stops.
pub fn viridis(t: f64) -> String {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = (scaled - lo as f64) as f32;
    let (a, b) = (from_hex(VIRIDIS[lo]), from_hex(VIRIDIS[lo + 1]));
    to_hex(Srgb::new(
        a.red + (b.red - a.red) * frac,
        a.green + (b.green - a.green) * frac,
        a.blue + (b.blue - a.blue) * frac,
    ))
}

/// Colour of `value` on a viridis scale spanning `[min, max]`.
pub fn scale_color(value: f64, min: f64, max: f64) -> String {
    if max <= min {
        return viridis(0.0);
    }
    viridis((value - min) / (max - min))
}

// ---------------------------------------------------------------------------
// Color mapping: metadata value → hex colour
// ---------------------------------------------------------------------------

/// Maps unique metadata values of a chosen column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<MetadataValue, String>,
    default_color: String,
}

impl ColorMap {
    /// Build a colour map for the given column from its unique values.
    /// Null never gets a colour of its own.
    pub fn new(column: &str, unique_values: &BTreeSet<MetadataValue>) -> Self {
        let values: Vec<&MetadataValue> = unique_values.iter().filter(|v| !v.is_null()).collect();
        let palette = generate_palette(values.len());
        let mapping = values
            .into_iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: GRAY.to_string(),
        }
    }

    pub fn color_for(&self, value: &MetadataValue) -> &str {
        self.mapping
            .get(value)
            .map(String::as_str)
            .unwrap_or(self.default_color.as_str())
    }

    /// Value label → colour, in value order.
    pub fn legend_entries(&self) -> Vec<(String, String)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), c.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_distinct_hex() {
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        assert!(p.iter().all(|c| c.len() == 7 && c.starts_with('#')));
        assert_eq!(p.iter().collect::<BTreeSet<_>>().len(), 5);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn viridis_hits_its_end_stops() {
        assert_eq!(viridis(0.0), "#440154");
        assert_eq!(viridis(1.0), "#fde725");
        assert_eq!(viridis(-3.0), "#440154");
        assert_eq!(viridis(f64::NAN), "#440154");
        assert_eq!(scale_color(95.0, 0.0, 95.0), "#fde725");
        assert_eq!(scale_color(4.0, 4.0, 4.0), "#440154");
    }

    #[test]
    fn unknown_and_null_values_are_gray() {
        let values: BTreeSet<MetadataValue> = [
            MetadataValue::String("phage".into()),
            MetadataValue::String("serum".into()),
            MetadataValue::Null,
        ]
        .into_iter()
        .collect();
        let map = ColorMap::new("project", &values);
        assert_eq!(map.legend_entries().len(), 2);
        assert_ne!(map.color_for(&MetadataValue::String("phage".into())), GRAY);
        assert_eq!(map.color_for(&MetadataValue::Null), GRAY);
        assert_eq!(map.color_for(&MetadataValue::String("other".into())), GRAY);
    }
}

use svg::Document;
use svg::Node;
use svg::node::Text as TextNode;
use svg::node::element::{Circle, Element, Line, Rectangle, Text};

use crate::color::{ColorMap, GRAY, scale_color};
use crate::data::model::{MetadataValue, NormFlag, NormalizedRow, unique_values};
use crate::plate::{NUM_COLS, NUM_ROWS, ROWS, Well};

/// Pixels per well unit.
const UNIT: f64 = 32.0;
const MARGIN: f64 = 40.0;
const RADIUS: f64 = 11.0;
/// Horizontal offset of the destination plate, in well units.
const DEST_OFFSET: f64 = 15.0;

const ORANGE: &str = "#ff8c00";
const RED: &str = "#d62728";

/// Column the source-plate view colours its markers by.
pub const PROJECT_COLUMN: &str = "project";

fn well_center(well: Well, offset: f64) -> (f64, f64) {
    (
        MARGIN + (offset + well.col() as f64 + 0.5) * UNIT,
        MARGIN + (well.row() as f64 + 0.5) * UNIT,
    )
}

fn tooltip(text: String) -> Element {
    let mut title = Element::new("title");
    title.append(TextNode::new(text));
    title
}

/// Empty well grid with row letters and column numbers.
fn plate_grid(mut doc: Document, offset: f64, label: &str) -> Document {
    let left = MARGIN + offset * UNIT;
    doc = doc
        .add(
            Rectangle::new()
                .set("x", left)
                .set("y", MARGIN)
                .set("width", NUM_COLS as f64 * UNIT)
                .set("height", NUM_ROWS as f64 * UNIT)
                .set("rx", 8)
                .set("fill", "#f4f5f7")
                .set("stroke", "#9aa0a6"),
        )
        .add(
            Text::new(label)
                .set("x", left + NUM_COLS as f64 * UNIT / 2.0)
                .set("y", MARGIN - 24.0)
                .set("text-anchor", "middle")
                .set("font-family", "Helvetica, Arial, sans-serif")
                .set("font-size", 14),
        );

    for (r, letter) in ROWS.chars().enumerate() {
        doc = doc.add(
            Text::new(letter.to_string())
                .set("x", left - 12.0)
                .set("y", MARGIN + (r as f64 + 0.5) * UNIT + 4.0)
                .set("text-anchor", "middle")
                .set("font-family", "monospace")
                .set("font-size", 11),
        );
    }
    for c in 0..NUM_COLS {
        doc = doc.add(
            Text::new((c + 1).to_string())
                .set("x", left + (c as f64 + 0.5) * UNIT)
                .set("y", MARGIN - 6.0)
                .set("text-anchor", "middle")
                .set("font-family", "monospace")
                .set("font-size", 11),
        );
    }
    for r in 0..NUM_ROWS {
        for c in 0..NUM_COLS {
            let Some(well) = Well::new(r, c) else { continue };
            let (cx, cy) = well_center(well, offset);
            doc = doc.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", RADIUS)
                    .set("fill", "none")
                    .set("stroke", "#d0d3d8"),
            );
        }
    }
    doc
}

fn document(plates: usize) -> Document {
    let width = 2.0 * MARGIN + ((plates - 1) as f64 * DEST_OFFSET + NUM_COLS as f64) * UNIT;
    let height = 2.0 * MARGIN + NUM_ROWS as f64 * UNIT + 40.0;
    Document::new()
        .set("viewBox", (0.0, 0.0, width, height))
        .set("width", width)
        .set("height", height)
}

fn html_page(title: &str, doc: &Document) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body style=\"font-family: Helvetica, Arial, sans-serif\">\n<h2>{title}</h2>\n{doc}\n</body>\n</html>\n"
    )
}

fn outline(flag: NormFlag) -> Option<&'static str> {
    match flag {
        NormFlag::Valid => None,
        NormFlag::Empty => Some(ORANGE),
        _ => Some(RED),
    }
}

// ---------------------------------------------------------------------------
// Source → destination view
// ---------------------------------------------------------------------------

/// Source and destination plates side by side.  Each library keeps its
/// colour in both so a shuffled placement can be followed by eye; wells
/// without a library stay blank.
pub fn plate_viz_html(rows: &[NormalizedRow]) -> String {
    let mut doc = document(2);
    doc = plate_grid(doc, 0.0, "source plate");
    doc = plate_grid(doc, DEST_OFFSET, "destination plate");

    let libraries: Vec<&NormalizedRow> = rows.iter().filter(|r| r.library_id().is_some()).collect();
    let last = libraries.len().saturating_sub(1) as f64;
    for (i, row) in libraries.into_iter().enumerate() {
        let fill = scale_color(i as f64, 0.0, last);
        let label = format!(
            "{} => {}\nlibrary: {}\ntransfer: {} µL\nflag: {}",
            row.sample.source_well,
            row.dest_well,
            row.library_id().unwrap_or(""),
            row.transfer
                .volume_ul()
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default(),
            row.flag,
        );
        for (well, offset) in [(row.sample.source_well, 0.0), (row.dest_well, DEST_OFFSET)] {
            let (cx, cy) = well_center(well, offset);
            let mut marker = Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", RADIUS)
                .set("fill", fill.as_str());
            if let Some(stroke) = outline(row.flag) {
                marker = marker.set("stroke", stroke).set("stroke-width", 3);
            }
            doc = doc.add(marker.add(tooltip(label.clone())));
        }
    }
    html_page("Plate normalization", &doc)
}

// ---------------------------------------------------------------------------
// Source plate by project
// ---------------------------------------------------------------------------

fn marker(flag: NormFlag, cx: f64, cy: f64, fill: &str) -> Element {
    let mut node = match flag {
        NormFlag::Empty => {
            let mut e = Element::new("rect");
            e.assign("x", cx - RADIUS);
            e.assign("y", cy - RADIUS);
            e.assign("width", 2.0 * RADIUS);
            e.assign("height", 2.0 * RADIUS);
            e.assign("fill", fill);
            e
        }
        NormFlag::Valid | NormFlag::TooDilute | NormFlag::TooConcentrated => {
            let mut e = Element::new("circle");
            e.assign("cx", cx);
            e.assign("cy", cy);
            e.assign("r", RADIUS);
            e.assign("fill", fill);
            if !flag.is_valid() {
                e.assign("stroke", RED);
                e.assign("stroke-width", 3);
            }
            e
        }
        NormFlag::Invalid | NormFlag::Weird => {
            let mut e = Element::new("g");
            e.assign("stroke", fill);
            e.assign("stroke-width", 4);
            let d = RADIUS * 0.8;
            e.append(Line::new().set("x1", cx - d).set("y1", cy - d).set("x2", cx + d).set("y2", cy + d));
            e.append(Line::new().set("x1", cx - d).set("y1", cy + d).set("x2", cx + d).set("y2", cy - d));
            e
        }
    };
    node.assign("class", flag.as_str());
    node
}

/// One source plate, markers coloured by project and shaped by flag.
pub fn source_plate_viz_html(rows: &[NormalizedRow]) -> String {
    let colors = ColorMap::new(
        PROJECT_COLUMN,
        &unique_values(rows.iter().map(|r| &r.sample.metadata), PROJECT_COLUMN),
    );

    let mut doc = plate_grid(document(1), 0.0, "source plate");
    for row in rows {
        let meta = &row.sample.metadata;
        let project = meta.get(PROJECT_COLUMN).filter(|v| !v.is_null());
        let fill = project.map_or(GRAY, |p| colors.color_for(p));
        let cell = |name: &str| meta.get(name).map(MetadataValue::to_string).unwrap_or_default();
        let label = format!(
            "project: {}\nlibrary_id: {}\nsample_id: {}\nflag: {}\nconc_plate_1_ug_ml: {}",
            cell(PROJECT_COLUMN),
            row.library_id().unwrap_or(""),
            cell("sample_id"),
            row.flag,
            cell("conc_plate_1_ug_ml"),
        );
        let (cx, cy) = well_center(row.sample.source_well, 0.0);
        let mut node = marker(row.flag, cx, cy, fill);
        node.append(tooltip(label));
        doc = doc.add(node);
    }

    let legend_y = MARGIN + NUM_ROWS as f64 * UNIT + 24.0;
    doc = doc.add(
        Text::new(format!("{}:", colors.column))
            .set("x", MARGIN)
            .set("y", legend_y)
            .set("font-family", "Helvetica, Arial, sans-serif")
            .set("font-size", 11)
            .set("font-weight", "bold"),
    );
    for (i, (value, color)) in colors.legend_entries().into_iter().enumerate() {
        let x = MARGIN + (i as f64 + 1.5) * 4.0 * UNIT;
        doc = doc
            .add(
                Rectangle::new()
                    .set("x", x)
                    .set("y", legend_y - 10.0)
                    .set("width", 12)
                    .set("height", 12)
                    .set("fill", color),
            )
            .add(
                Text::new(value)
                    .set("x", x + 16.0)
                    .set("y", legend_y)
                    .set("font-family", "Helvetica, Arial, sans-serif")
                    .set("font-size", 11),
            );
    }
    html_page("Source plate", &doc)
}

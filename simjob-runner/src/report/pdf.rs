//! PDF encoding of a laid-out report

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use simjob_core::SimJobError;
use std::path::Path;

use super::ReportDocument;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const ROW_HEIGHT: i64 = 18;
const TABLE_TOP: i64 = 740;
const COLUMN_SPLIT: i64 = 297;
const MAX_CELL_CHARS: usize = 46;

/// Table rows that fit on one page below the header row
pub const ROWS_PER_PAGE: usize = ((TABLE_TOP - MARGIN) / ROW_HEIGHT - 1) as usize;

/// Decoded RGB image
pub(super) struct RgbImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

pub(super) fn load_image(path: &Path) -> Result<RgbImage, SimJobError> {
    let decoded = image::open(path)
        .map_err(|e| SimJobError::Render(format!("cannot decode {}: {}", path.display(), e)))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();
    Ok(RgbImage {
        width,
        height,
        pixels: decoded.into_raw(),
    })
}

pub(super) fn write_pdf(
    report: &ReportDocument,
    image: Option<&RgbImage>,
    out_path: &Path,
) -> Result<(), SimJobError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut xobjects = Dictionary::new();
    if let Some(image) = image {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            image.pixels.clone(),
        ));
        xobjects.set("Im1", image_id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
        "XObject" => xobjects,
    });

    let mut pages = Vec::new();
    let chunks: Vec<&[(String, String)]> = if report.rows.is_empty() {
        vec![&report.rows[..]]
    } else {
        report.rows.chunks(ROWS_PER_PAGE).collect()
    };
    for (index, rows) in chunks.into_iter().enumerate() {
        pages.push(table_page(report, rows, index));
    }
    if let Some(image) = image {
        pages.push(image_page(report, image));
    }

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| SimJobError::Render(format!("cannot encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(kids),
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ]),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(out_path)
        .map_err(|e| SimJobError::Render(format!("cannot write {}: {}", out_path.display(), e)))?;
    Ok(())
}

fn table_page(report: &ReportDocument, rows: &[(String, String)], index: usize) -> Vec<Operation> {
    let mut ops = Vec::new();
    header(&mut ops, report, index > 0);

    let width = PAGE_WIDTH - 2 * MARGIN;

    // Header row
    ops.push(Operation::new("q", vec![]));
    fill_color(&mut ops, 0.17, 0.33, 0.55);
    rect(&mut ops, MARGIN, TABLE_TOP - ROW_HEIGHT, width, ROW_HEIGHT, "f");
    fill_color(&mut ops, 1.0, 1.0, 1.0);
    text(&mut ops, "F2", 11, MARGIN + 6, TABLE_TOP - 13, "Parameter");
    text(&mut ops, "F2", 11, COLUMN_SPLIT + 6, TABLE_TOP - 13, "Value");
    ops.push(Operation::new("Q", vec![]));

    for (i, (key, value)) in rows.iter().enumerate() {
        let top = TABLE_TOP - ROW_HEIGHT * (i as i64 + 2);
        if i % 2 == 1 {
            ops.push(Operation::new("q", vec![]));
            fill_color(&mut ops, 0.93, 0.93, 0.93);
            rect(&mut ops, MARGIN, top, width, ROW_HEIGHT, "f");
            ops.push(Operation::new("Q", vec![]));
        }
        text(&mut ops, "F1", 10, MARGIN + 6, top + 5, key);
        text(&mut ops, "F1", 10, COLUMN_SPLIT + 6, top + 5, value);
    }

    // Grid
    let body_rows = rows.len() as i64 + 1;
    let bottom = TABLE_TOP - ROW_HEIGHT * body_rows;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("G", vec![Object::Real(0.6)]));
    ops.push(Operation::new("w", vec![Object::Real(0.5)]));
    rect(&mut ops, MARGIN, bottom, width, ROW_HEIGHT * body_rows, "S");
    line(&mut ops, COLUMN_SPLIT, bottom, COLUMN_SPLIT, TABLE_TOP);
    for r in 1..body_rows {
        let y = TABLE_TOP - ROW_HEIGHT * r;
        line(&mut ops, MARGIN, y, PAGE_WIDTH - MARGIN, y);
    }
    ops.push(Operation::new("Q", vec![]));

    ops
}

fn image_page(report: &ReportDocument, image: &RgbImage) -> Vec<Operation> {
    let mut ops = Vec::new();
    header(&mut ops, report, true);
    text(&mut ops, "F2", 12, MARGIN, TABLE_TOP, "Simulation Result");

    let box_width = (PAGE_WIDTH - 2 * MARGIN) as f64;
    let box_height = (TABLE_TOP - 20 - MARGIN) as f64;
    let scale = (box_width / image.width.max(1) as f64).min(box_height / image.height.max(1) as f64);
    let width = (image.width as f64 * scale).round() as i64;
    let height = (image.height as f64 * scale).round() as i64;
    let x = (PAGE_WIDTH - width) / 2;
    let y = TABLE_TOP - 20 - height;

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            width.into(),
            0i64.into(),
            0i64.into(),
            height.into(),
            x.into(),
            y.into(),
        ],
    ));
    ops.push(Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Title, plus the generation timestamp in the top-right corner
fn header(ops: &mut Vec<Operation>, report: &ReportDocument, continued: bool) {
    let stamp = format!(
        "Generated {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    text(ops, "F1", 8, PAGE_WIDTH - MARGIN - 150, PAGE_HEIGHT - 30, &stamp);

    let title = if continued {
        format!("{} (continued)", report.title)
    } else {
        report.title.clone()
    };
    text(ops, "F2", 16, MARGIN, TABLE_TOP + 35, &title);
}

fn text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), size.into()],
    ));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(pdf_text(value))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn fill_color(ops: &mut Vec<Operation>, r: f32, g: f32, b: f32) {
    ops.push(Operation::new(
        "rg",
        vec![Object::Real(r.into()), Object::Real(g.into()), Object::Real(b.into())],
    ));
}

fn rect(ops: &mut Vec<Operation>, x: i64, y: i64, width: i64, height: i64, paint: &str) {
    ops.push(Operation::new(
        "re",
        vec![x.into(), y.into(), width.into(), height.into()],
    ));
    ops.push(Operation::new(paint, vec![]));
}

fn line(ops: &mut Vec<Operation>, x1: i64, y1: i64, x2: i64, y2: i64) {
    ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
    ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// ASCII-only cell text, truncated to the column width
fn pdf_text(value: &str) -> String {
    let ascii: String = value
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect();
    if ascii.chars().count() > MAX_CELL_CHARS {
        let cut: String = ascii.chars().take(MAX_CELL_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        ascii
    }
}

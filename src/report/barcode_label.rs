use barcoders::sym::code128::Code128;
use printpdf::{Mm, PdfDocument};
use std::path::Path;

use super::{load_font, Pen, ReportError};
use crate::core::reconcile::ExpectationRow;

pub const LABEL_TITLE: &str = "부자재반입";

const LABEL_W: f32 = 100.0;
const LABEL_H: f32 = 120.0;
const BORDER_INSET: f32 = 0.8;
const MARGIN: f32 = 5.0;
const TITLE_PT: f32 = 25.0;
const FIELD_PT: f32 = 13.0;
const FIELD_ROW: f32 = 11.3;
const FIELD_LABEL_W: f32 = 28.0;
const BAR_HEIGHT: f32 = 15.0;
const BAR_TEXT_PT: f32 = 12.0;
/// Widest bar module, in mm
const MAX_MODULE_W: f32 = 0.4;

/// Inputs shared by every label in one print run
#[derive(Debug, Clone)]
pub struct LabelSheet<'a> {
    /// Request identifier encoded in the barcode
    pub identifier: &'a str,
    pub unit_qty: &'a str,
}

/// Code 128 modules for an identifier, using character set B
fn encode(identifier: &str) -> Result<Vec<u8>, ReportError> {
    let barcode =
        Code128::new(format!("Ɓ{}", identifier)).map_err(|e| ReportError::Barcode {
            value: identifier.to_string(),
            reason: e.to_string(),
        })?;
    Ok(barcode.encode())
}

/// Runs of dark modules as (start, width) pairs
fn bar_runs(modules: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, m) in modules.iter().enumerate() {
        match (*m, start) {
            (1, None) => start = Some(i),
            (0, Some(s)) => {
                runs.push((s, i - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, modules.len() - s));
    }
    runs
}

/// One 100×120 mm label page per row
pub fn barcode_labels(
    rows: &[&ExpectationRow],
    sheet: &LabelSheet<'_>,
    font_path: Option<&Path>,
) -> Result<Vec<u8>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::NoSelection);
    }
    let identifier = sheet.identifier.trim();
    if identifier.is_empty() {
        return Err(ReportError::MissingField("barcode identifier"));
    }
    let unit_qty = sheet.unit_qty.trim();
    if unit_qty.is_empty() {
        return Err(ReportError::MissingField("unit quantity"));
    }
    let modules = encode(identifier)?;
    let runs = bar_runs(&modules);

    let (doc, first_page, first_layer) =
        PdfDocument::new(LABEL_TITLE, Mm(LABEL_W), Mm(LABEL_H), "label");
    let font = load_font(&doc, font_path)?;

    let usable_w = LABEL_W - 2.0 * MARGIN;
    let module_w = (usable_w / modules.len() as f32).min(MAX_MODULE_W);
    let bar_x = (LABEL_W - module_w * modules.len() as f32) / 2.0;

    for (i, row) in rows.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(LABEL_W), Mm(LABEL_H), "label")
        };
        let pen = Pen::new(doc.get_page(page).get_layer(layer), &font);

        pen.outline(
            BORDER_INSET,
            BORDER_INSET,
            LABEL_W - 2.0 * BORDER_INSET,
            LABEL_H - 2.0 * BORDER_INSET,
            0.75,
        );

        let mut y = LABEL_H - MARGIN - 12.0;
        pen.text_centered(LABEL_TITLE, TITLE_PT, LABEL_W / 2.0, y);
        y -= 18.0;

        let return_date = row.row.return_date.to_string();
        let fields = [
            ("품명", row.row.part_name.as_str()),
            ("품목코드", row.row.part.as_str()),
            ("단위수량", unit_qty),
            ("반입일자", return_date.as_str()),
        ];
        for (label, value) in fields {
            pen.text(label, FIELD_PT, MARGIN + 2.0, y);
            pen.text(value, FIELD_PT, MARGIN + 2.0 + FIELD_LABEL_W, y);
            y -= FIELD_ROW;
        }

        let bar_bottom = MARGIN + 12.0;
        for (start, width) in &runs {
            pen.fill(
                bar_x + *start as f32 * module_w,
                bar_bottom,
                *width as f32 * module_w,
                BAR_HEIGHT,
                0.0,
            );
        }
        pen.text_centered(identifier, BAR_TEXT_PT, LABEL_W / 2.0, MARGIN + 4.0);
    }

    doc.save_to_bytes()
        .map_err(|e| ReportError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reconcile::tests::tracking_row;

    #[test]
    fn test_bar_runs() {
        assert_eq!(bar_runs(&[1, 1, 0, 1, 0, 0, 1]), vec![(0, 2), (3, 1), (6, 1)]);
        assert!(bar_runs(&[0, 0]).is_empty());
    }

    #[test]
    fn test_encode_code128_set_b() {
        let modules = encode("B202511-00120001").unwrap();
        assert!(!modules.is_empty());
        // Code 128 ends with the 2-module termination bar
        assert_eq!(&modules[modules.len() - 2..], &[1, 1]);
    }

    #[test]
    fn test_labels_one_page_per_row() {
        let a = ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-1", 1.0));
        let b = ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-2", 1.0));
        let sheet = LabelSheet {
            identifier: "B202511-00120001",
            unit_qty: "500",
        };
        let pdf = barcode_labels(&[&a, &b], &sheet, None).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_labels_validate_inputs() {
        let a = ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-1", 1.0));
        let sheet = LabelSheet {
            identifier: " ",
            unit_qty: "500",
        };
        assert!(matches!(
            barcode_labels(&[&a], &sheet, None),
            Err(ReportError::MissingField(_))
        ));
        let sheet = LabelSheet {
            identifier: "B1",
            unit_qty: "",
        };
        assert!(matches!(
            barcode_labels(&[&a], &sheet, None),
            Err(ReportError::MissingField(_))
        ));
        assert!(matches!(
            barcode_labels(&[], &sheet, None),
            Err(ReportError::NoSelection)
        ));
    }
}

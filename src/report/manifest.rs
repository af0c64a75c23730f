use printpdf::{Mm, PdfDocument};
use std::path::Path;

use super::{load_font, Pen, ReportError};
use crate::core::reconcile::ExpectationRow;

/// Table columns; the last four are left blank for handwritten counts
pub const MANIFEST_COLS: [&str; 9] = [
    "품번", "품명", "작불", "예상재고", "ERP재고", "1P", "2P", "3P", "4P",
];

const COL_WIDTHS: [f32; 9] = [35.0, 55.0, 16.0, 20.0, 20.0, 42.0, 42.0, 24.0, 24.0];

const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;
const MARGIN: f32 = 7.0;
const HEADER_H: f32 = 8.0;
const ROW_H: f32 = 14.0;
const TITLE_PT: f32 = 15.0;
const BODY_PT: f32 = 10.0;
const CELL_PT: f32 = 8.0;
const MEMO_LEADING: f32 = 5.0;

fn title_for(rows: &[ExpectationRow]) -> String {
    let order = rows.iter().map(|r| r.row.order.as_str()).find(|s| !s.is_empty());
    let name = rows
        .iter()
        .map(|r| r.row.finished_name.as_str())
        .find(|s| !s.is_empty());
    format!("{} {}", order.unwrap_or(""), name.unwrap_or(""))
        .trim()
        .to_string()
}

/// Landscape A4 handover sheet for the consolidated rows
pub fn manifest_pdf(
    rows: &[ExpectationRow],
    memo: Option<&str>,
    font_path: Option<&Path>,
) -> Result<Vec<u8>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::Empty);
    }
    let title = title_for(rows);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "manifest");
    let font = load_font(&doc, font_path)?;
    let mut pen = Pen::new(doc.get_page(page).get_layer(layer), &font);

    let mut y = PAGE_H - MARGIN - TITLE_PT * super::PT_TO_MM;
    pen.text(&title, TITLE_PT, MARGIN, y);
    y -= 6.0;

    if let Some(memo) = memo.filter(|m| !m.trim().is_empty()) {
        for line in memo.lines() {
            y -= MEMO_LEADING;
            pen.text(line, BODY_PT, MARGIN, y);
        }
        y -= 4.0;
    }

    let table_w: f32 = COL_WIDTHS.iter().sum();
    let draw_header = |pen: &Pen, top: f32| {
        let bottom = top - HEADER_H;
        pen.fill(MARGIN, bottom, table_w, HEADER_H, 0.83);
        let mut x = MARGIN;
        for (label, w) in MANIFEST_COLS.iter().zip(COL_WIDTHS) {
            pen.outline(x, bottom, w, HEADER_H, 0.25);
            pen.text(label, CELL_PT, x + 1.0, bottom + 2.5);
            x += w;
        }
        bottom
    };

    let mut top = draw_header(&pen, y);
    for row in rows {
        if top - ROW_H < MARGIN {
            let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "manifest");
            pen = Pen::new(doc.get_page(page).get_layer(layer), &font);
            top = draw_header(&pen, PAGE_H - MARGIN);
        }
        let bottom = top - ROW_H;
        let mut x = MARGIN;
        let values = row.values(&MANIFEST_COLS[..5]);
        for (i, w) in COL_WIDTHS.iter().enumerate() {
            pen.outline(x, bottom, *w, ROW_H, 0.25);
            if let Some(text) = values.get(i) {
                pen.text(text, CELL_PT, x + 1.0, bottom + (ROW_H - CELL_PT * super::PT_TO_MM) / 2.0);
            }
            x += w;
        }
        top = bottom;
    }

    doc.save_to_bytes()
        .map_err(|e| ReportError::Pdf(e.to_string()))
}

//! Session exports: consolidated CSV, printable PDF manifest and barcode labels

mod barcode_label;
mod csv_export;
mod manifest;

pub use barcode_label::{barcode_labels, LabelSheet, LABEL_TITLE};
pub use csv_export::export_csv;
pub use manifest::{manifest_pdf, MANIFEST_COLS};

use miette::Diagnostic;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Greyscale, IndirectFontRef, Mm, PdfDocumentReference, PdfLayerReference,
    Rect,
};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("nothing to export")]
    #[diagnostic(
        code(submat::report::empty),
        help("load tracking rows with 'submat returns load' first")
    )]
    Empty,

    #[error("no parts are selected for labels")]
    #[diagnostic(
        code(submat::report::no_selection),
        help("mark parts with 'submat returns edit <part> --label'")
    )]
    NoSelection,

    #[error("{0} must not be empty")]
    #[diagnostic(code(submat::report::missing_field))]
    MissingField(&'static str),

    #[error("invalid barcode value '{value}': {reason}")]
    #[diagnostic(code(submat::report::barcode))]
    Barcode { value: String, reason: String },

    #[error("PDF rendering failed: {0}")]
    #[diagnostic(code(submat::report::pdf))]
    Pdf(String),

    #[error("CSV export failed")]
    #[diagnostic(code(submat::report::csv))]
    Csv(#[from] csv::Error),
}

const PT_TO_MM: f32 = 0.352_778;

/// Embed the configured TrueType font, else fall back to Helvetica
pub(crate) fn load_font(
    doc: &PdfDocumentReference,
    font_path: Option<&Path>,
) -> Result<IndirectFontRef, ReportError> {
    if let Some(path) = font_path {
        match std::fs::File::open(path) {
            Ok(file) => {
                return doc
                    .add_external_font(file)
                    .map_err(|e| ReportError::Pdf(e.to_string()))
            }
            Err(e) => warn!(path = %path.display(), error = %e, "font not readable"),
        }
    }
    warn!("no TrueType font configured, Hangul text may not render (set font_path or SUBMAT_FONT)");
    doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(e.to_string()))
}

/// Rough advance width of a string, in mm
///
/// Builtin fonts carry no metrics here, so Latin glyphs count as half an em
/// and everything else as a full em.
pub(crate) fn text_width(text: &str, size_pt: f32) -> f32 {
    let ems: f32 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.55 } else { 1.0 })
        .sum();
    ems * size_pt * PT_TO_MM
}

/// Drawing helpers over one PDF layer
pub(crate) struct Pen<'a> {
    pub layer: PdfLayerReference,
    pub font: &'a IndirectFontRef,
}

impl<'a> Pen<'a> {
    pub fn new(layer: PdfLayerReference, font: &'a IndirectFontRef) -> Self {
        Self { layer, font }
    }

    pub fn text(&self, text: &str, size_pt: f32, x: f32, y: f32) {
        self.layer.use_text(text, size_pt, Mm(x), Mm(y), self.font);
    }

    /// Text centered horizontally on `center_x`
    pub fn text_centered(&self, text: &str, size_pt: f32, center_x: f32, y: f32) {
        let x = center_x - text_width(text, size_pt) / 2.0;
        self.text(text, size_pt, x, y);
    }

    pub fn fill(&self, x: f32, y: f32, w: f32, h: f32, grey: f32) {
        self.layer
            .set_fill_color(Color::Greyscale(Greyscale::new(grey, None)));
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(y), Mm(x + w), Mm(y + h)).with_mode(PaintMode::Fill));
        self.layer
            .set_fill_color(Color::Greyscale(Greyscale::new(0.0, None)));
    }

    pub fn outline(&self, x: f32, y: f32, w: f32, h: f32, thickness_pt: f32) {
        self.layer.set_outline_thickness(thickness_pt);
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(y), Mm(x + w), Mm(y + h)).with_mode(PaintMode::Stroke));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_counts_wide_glyphs() {
        let latin = text_width("ab", 10.0);
        let hangul = text_width("가나", 10.0);
        assert!(hangul > latin);
        assert_eq!(text_width("", 10.0), 0.0);
    }
}

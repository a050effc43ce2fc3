//! Fixed-layout prescription document.
//!
//! Layout is expressed in millimetres on an A4 page through the [`PdfCanvas`]
//! trait. [`RecordingCanvas`] keeps the drawing operations so a client-side
//! PDF library can replay them.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Serialize;

use crate::models::Prescription;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
/// Past this offset the next row goes on a fresh page.
pub const PAGE_BREAK_Y: f32 = 270.0;
pub const PAGE_TOP_Y: f32 = 20.0;
pub const FOOTER_MIN_Y: f32 = 250.0;
pub const NOTES_WRAP_COLUMNS: usize = 100;

pub const MISSING: &str = "—";
/// Footer line naming the issuing clinic.
pub fn disclaimer(clinic_name: &str) -> String {
    format!("This is a digitally generated prescription from {} Management System.", clinic_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

const BRAND: Rgb = Rgb(15, 191, 165);
const WHITE: Rgb = Rgb(255, 255, 255);
const INK: Rgb = Rgb(51, 51, 51);
const RULE: Rgb = Rgb(200, 200, 200);
const TABLE_HEAD: Rgb = Rgb(240, 240, 240);
const MUTED: Rgb = Rgb(150, 150, 150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Drawing surface the exporter renders onto.
pub trait PdfCanvas {
    fn set_fill_color(&mut self, color: Rgb);
    fn set_text_color(&mut self, color: Rgb);
    fn set_draw_color(&mut self, color: Rgb);
    fn set_font(&mut self, size: f32, weight: FontWeight);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn text(&mut self, text: &str, x: f32, y: f32);
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);
    fn add_page(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CanvasOp {
    FillColor { color: Rgb },
    TextColor { color: Rgb },
    DrawColor { color: Rgb },
    Font { size: f32, weight: FontWeight },
    Rect { x: f32, y: f32, width: f32, height: f32 },
    Text { text: String, x: f32, y: f32 },
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingCanvas {
    pub pages: Vec<Vec<CanvasOp>>,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self { pages: vec![Vec::new()] }
    }

    fn push(&mut self, op: CanvasOp) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text drawn on `page` with its position.
    pub fn texts_on(&self, page: usize) -> Vec<(&str, f32, f32)> {
        self.pages
            .get(page)
            .map(|ops| {
                ops.iter()
                    .filter_map(|op| match op {
                        CanvasOp::Text { text, x, y } => Some((text.as_str(), *x, *y)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl PdfCanvas for RecordingCanvas {
    fn set_fill_color(&mut self, color: Rgb) {
        self.push(CanvasOp::FillColor { color });
    }

    fn set_text_color(&mut self, color: Rgb) {
        self.push(CanvasOp::TextColor { color });
    }

    fn set_draw_color(&mut self, color: Rgb) {
        self.push(CanvasOp::DrawColor { color });
    }

    fn set_font(&mut self, size: f32, weight: FontWeight) {
        self.push(CanvasOp::Font { size, weight });
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.push(CanvasOp::Rect { x, y, width, height });
    }

    fn text(&mut self, text: &str, x: f32, y: f32) {
        self.push(CanvasOp::Text { text: text.to_string(), x, y });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.push(CanvasOp::Line { x1, y1, x2, y2 });
    }

    fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }
}

fn or_missing(value: &str) -> &str {
    if value.trim().is_empty() {
        MISSING
    } else {
        value
    }
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..columns).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
            if needed > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

fn whitespace_runs() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").ok()).as_ref()
}

fn underscore_whitespace(name: &str) -> String {
    match whitespace_runs() {
        Some(pattern) => pattern.replace_all(name, "_").into_owned(),
        None => name.split_whitespace().collect::<Vec<_>>().join("_"),
    }
}

/// A prescription resolved with the names printed on it.
pub struct PrescriptionDocument<'a> {
    pub clinic_name: &'a str,
    pub prescription: &'a Prescription,
    pub patient_name: Option<&'a str>,
    pub doctor_name: Option<&'a str>,
    pub generated_at: DateTime<FixedOffset>,
}

impl PrescriptionDocument<'_> {
    /// Date printed in the header and used in the file name.
    fn issued_on(&self) -> DateTime<FixedOffset> {
        self.prescription
            .created_at
            .map(|at| at.with_timezone(&self.generated_at.timezone()))
            .unwrap_or(self.generated_at)
    }

    /// `prescription_{patient}_{YYYY-MM-DD}.pdf`
    pub fn file_name(&self) -> String {
        let patient = self
            .patient_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(underscore_whitespace)
            .unwrap_or_else(|| "patient".to_string());

        let day = self
            .prescription
            .created_at
            .map(|at| at.date_naive())
            .unwrap_or_else(|| self.generated_at.naive_utc().date());

        format!("prescription_{}_{}.pdf", patient, day.format("%Y-%m-%d"))
    }

    pub fn render(&self, canvas: &mut dyn PdfCanvas) {
        let rx = self.prescription;

        // Header band
        canvas.set_fill_color(BRAND);
        canvas.fill_rect(0.0, 0.0, PAGE_WIDTH, 35.0);
        canvas.set_text_color(WHITE);
        canvas.set_font(20.0, FontWeight::Bold);
        canvas.text(self.clinic_name, 15.0, 18.0);
        canvas.set_font(10.0, FontWeight::Normal);
        canvas.text("Digital Prescription", 15.0, 27.0);
        canvas.text(&format!("Date: {}", self.issued_on().format("%B %-d, %Y")), 140.0, 27.0);

        // Patient and doctor
        canvas.set_text_color(INK);
        let mut y = 48.0;
        canvas.set_font(11.0, FontWeight::Bold);
        canvas.text("Patient:", 15.0, y);
        canvas.set_font(11.0, FontWeight::Normal);
        canvas.text(or_missing(self.patient_name.unwrap_or_default()), 45.0, y);

        y += 8.0;
        canvas.set_font(11.0, FontWeight::Bold);
        canvas.text("Doctor:", 15.0, y);
        canvas.set_font(11.0, FontWeight::Normal);
        canvas.text(&format!("Dr. {}", or_missing(self.doctor_name.unwrap_or_default())), 45.0, y);

        if !rx.diagnosis.trim().is_empty() {
            y += 8.0;
            canvas.set_font(11.0, FontWeight::Bold);
            canvas.text("Diagnosis:", 15.0, y);
            canvas.set_font(11.0, FontWeight::Normal);
            canvas.text(rx.diagnosis.trim(), 50.0, y);
        }

        y += 12.0;
        canvas.set_draw_color(RULE);
        canvas.line(15.0, y, 195.0, y);
        y += 10.0;

        // Medicines table
        canvas.set_font(13.0, FontWeight::Bold);
        canvas.text("Prescribed Medicines", 15.0, y);
        y += 8.0;

        canvas.set_fill_color(TABLE_HEAD);
        canvas.fill_rect(15.0, y - 4.0, 180.0, 8.0);
        canvas.set_font(9.0, FontWeight::Bold);
        canvas.text("#", 18.0, y + 1.0);
        canvas.text("Medicine", 28.0, y + 1.0);
        canvas.text("Dosage", 100.0, y + 1.0);
        canvas.text("Instructions", 140.0, y + 1.0);
        y += 10.0;

        canvas.set_font(10.0, FontWeight::Normal);
        for (index, medicine) in rx.medicines.iter().enumerate() {
            canvas.text(&(index + 1).to_string(), 18.0, y);
            canvas.text(or_missing(&medicine.name), 28.0, y);
            canvas.text(or_missing(&medicine.dosage), 100.0, y);
            canvas.text(or_missing(&medicine.instruction), 140.0, y);
            y += 8.0;
            if y > PAGE_BREAK_Y {
                canvas.add_page();
                y = PAGE_TOP_Y;
            }
        }

        // Notes
        if !rx.notes.trim().is_empty() {
            y += 8.0;
            canvas.set_draw_color(RULE);
            canvas.line(15.0, y, 195.0, y);
            y += 10.0;
            canvas.set_font(10.0, FontWeight::Bold);
            canvas.text("Notes:", 15.0, y);
            y += 7.0;
            canvas.set_font(9.0, FontWeight::Normal);
            for line in wrap_text(rx.notes.trim(), NOTES_WRAP_COLUMNS) {
                canvas.text(&line, 15.0, y);
                y += 5.0;
            }
        }

        // Footer
        y = f32::max(y + 20.0, FOOTER_MIN_Y);
        if y > PAGE_BREAK_Y {
            canvas.add_page();
            y = PAGE_TOP_Y;
        }
        canvas.set_draw_color(RULE);
        canvas.line(15.0, y, 195.0, y);
        y += 8.0;
        canvas.set_font(8.0, FontWeight::Normal);
        canvas.set_text_color(MUTED);
        canvas.text(&disclaimer(self.clinic_name), 15.0, y);
        canvas.text(
            &format!("Generated on: {}", self.generated_at.format("%Y-%m-%d %H:%M")),
            15.0,
            y + 5.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_columns() {
        let lines = wrap_text("take one tablet every morning", 12);
        assert_eq!(lines, vec!["take one", "tablet every", "morning"]);
        assert!(wrap_text("", 10).is_empty());
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_blank_values_render_as_missing() {
        assert_eq!(or_missing("  "), MISSING);
        assert_eq!(or_missing("500mg"), "500mg");
    }
}

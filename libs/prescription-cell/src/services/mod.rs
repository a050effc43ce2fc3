pub mod export;
pub mod prescription;

pub use export::{PdfCanvas, PrescriptionDocument, RecordingCanvas};
pub use prescription::PrescriptionService;

//! Discurso Extract — layout-aware text extraction from report PDFs.
//!
//! Pages are interpreted with `lopdf` into positioned glyphs, which are then
//! assembled into lines either across the whole page or per half-page column.

pub mod cmap;
pub mod content;
pub mod extractor;
pub mod file;
pub mod fonts;
pub mod layout;
pub mod pdf;

pub use extractor::{extract_document, extract_text, page_text, PageSource};
pub use file::{is_pdf, list_pdfs};
pub use layout::{Glyph, PageLayout, Region};
pub use pdf::PdfDocument;

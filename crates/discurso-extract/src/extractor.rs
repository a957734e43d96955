//! Layout-aware extraction of a document's linear text.

use std::path::Path;

use tracing::{debug, info};

use discurso_core::{LayoutMode, Result};

use crate::layout::PageLayout;
use crate::pdf::PdfDocument;

/// Anything that can hand out positioned page content in page order.
pub trait PageSource {
    fn page_count(&self) -> usize;
    fn page(&self, index: usize) -> Result<PageLayout>;
}

/// Text of one page under the given layout mode.
///
/// Two-column pages are read as the whole left half followed by the whole
/// right half; lines are not interleaved across columns.
pub fn page_text(page: &PageLayout, mode: LayoutMode) -> String {
    match mode {
        LayoutMode::SingleColumn => page.text(),
        LayoutMode::TwoColumn => {
            let (left, right) = page.halves();
            format!("{}\n{}", page.text_within(&left), page.text_within(&right))
        }
    }
}

/// Concatenate every page's text, in page order, separated by line breaks.
pub fn extract_text(source: &dyn PageSource, mode: LayoutMode) -> Result<String> {
    let count = source.page_count();
    let mut pages = Vec::with_capacity(count);
    for index in 0..count {
        let page = source.page(index)?;
        let text = page_text(&page, mode);
        if text.trim().is_empty() {
            debug!("Page {} has no extractable text", index + 1);
        }
        pages.push(text);
    }
    Ok(pages.join("\n"))
}

/// Open a PDF, extract its text and release it before returning.
pub fn extract_document(path: &Path, mode: LayoutMode) -> Result<String> {
    let pdf = PdfDocument::open(path)?;
    let text = extract_text(&pdf, mode)?;
    info!(
        "Extracted {} pages ({}) from {}: {} chars",
        pdf.page_count(),
        mode,
        path.display(),
        text.chars().count()
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Glyph;
    use crate::pdf::tests::build_pdf;

    struct Pages(Vec<PageLayout>);

    impl PageSource for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }
        fn page(&self, index: usize) -> Result<PageLayout> {
            Ok(self.0[index].clone())
        }
    }

    fn line(text: &str, x: f32, top: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * 5.0;
                Glyph::new(c.to_string(), x0, x0 + 5.0, top, top + 10.0)
            })
            .collect()
    }

    fn two_column_page() -> PageLayout {
        let mut glyphs = line("L1", 10.0, 20.0);
        glyphs.extend(line("R1", 310.0, 20.0));
        glyphs.extend(line("L2", 10.0, 40.0));
        PageLayout::new(600.0, 800.0, glyphs)
    }

    #[test]
    fn test_single_column_reads_rows() {
        let source = Pages(vec![two_column_page()]);
        let text = extract_text(&source, LayoutMode::SingleColumn).unwrap();
        assert_eq!(text, "L1 R1\nL2");
    }

    #[test]
    fn test_two_column_reads_left_block_then_right_block() {
        let source = Pages(vec![two_column_page(), two_column_page()]);
        let text = extract_text(&source, LayoutMode::TwoColumn).unwrap();
        assert_eq!(text, "L1\nL2\nR1\nL1\nL2\nR1");
    }

    #[test]
    fn test_empty_pages_contribute_empty_strings() {
        let empty = PageLayout::new(600.0, 800.0, Vec::new());
        let source = Pages(vec![empty.clone(), two_column_page(), empty]);
        let text = extract_text(&source, LayoutMode::SingleColumn).unwrap();
        assert_eq!(text, "\nL1 R1\nL2\n");

        let text = extract_text(&Pages(vec![PageLayout::default()]), LayoutMode::TwoColumn).unwrap();
        assert_eq!(text, "\n");
    }

    #[test]
    fn test_extract_document_two_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("informe_2020.pdf");
        let mut doc = build_pdf(
            600,
            &[vec![
                (40, 700, "Columna izquierda."),
                (340, 700, "Columna derecha."),
                (40, 680, "Sigue izquierda."),
            ]],
        );
        doc.save(&path).unwrap();

        let text = extract_document(&path, LayoutMode::TwoColumn).unwrap();
        assert_eq!(text, "Columna izquierda.\nSigue izquierda.\nColumna derecha.");
    }

    #[test]
    fn test_extract_document_missing_file() {
        let err = extract_document(Path::new("/nonexistent/informe.pdf"), LayoutMode::TwoColumn);
        assert!(err.is_err());
    }
}

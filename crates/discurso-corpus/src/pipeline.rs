//! Per-document pipeline: extract → segment → filter → classify.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use discurso_classify::{split_sentences, Classifier, Rejection, TopicBuckets};
use discurso_core::{DocumentInfo, Error, Result};
use discurso_extract::{extract_document, extract_text, PageSource};

/// Everything produced for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub document: DocumentInfo,
    pub buckets: TopicBuckets,
    pub rejected: Vec<Rejection>,
    /// Sentences produced by the segmenter, before filtering.
    pub sentences: usize,
}

impl DocumentOutcome {
    pub fn kept(&self) -> usize {
        self.sentences - self.rejected.len()
    }
}

/// Runs documents through a shared, precompiled classifier.
pub struct DocumentPipeline<'a> {
    classifier: &'a Classifier,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(classifier: &'a Classifier) -> Self {
        Self { classifier }
    }

    /// Classify already-extracted text.
    pub fn process_text(&self, document: DocumentInfo, text: &str) -> DocumentOutcome {
        let sentences = split_sentences(text);
        let total = sentences.len();
        let filtered = self.classifier.filter(sentences);
        let buckets = self.classifier.classify(&filtered.kept);
        debug!(
            "{}: {} sentences, {} kept, {} rejected",
            document.stem,
            total,
            filtered.kept.len(),
            filtered.rejected.len()
        );
        DocumentOutcome {
            document,
            buckets,
            rejected: filtered.rejected,
            sentences: total,
        }
    }

    /// Extract from any page source using the document's layout mode.
    pub fn process_source(
        &self,
        document: DocumentInfo,
        source: &dyn PageSource,
    ) -> Result<DocumentOutcome> {
        let text = extract_text(source, document.layout)
            .map_err(|e| Error::Extraction(format!("{}: {}", document.path.display(), e)))?;
        Ok(self.process_text(document, &text))
    }

    /// Open, extract and classify one PDF on disk.
    pub fn process_file(&self, path: &Path) -> Result<DocumentOutcome> {
        let document = DocumentInfo::from_path(path);
        info!(
            "Processing {} (year {}, {})",
            path.display(),
            document.partition(),
            document.layout
        );
        let text = extract_document(path, document.layout)?;
        Ok(self.process_text(document, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discurso_classify::RejectReason;
    use discurso_core::{LayoutMode, PipelineConfig};
    use discurso_extract::{Glyph, PageLayout};

    struct OnePage(PageLayout);

    impl PageSource for OnePage {
        fn page_count(&self) -> usize {
            1
        }
        fn page(&self, _index: usize) -> Result<PageLayout> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl PageSource for Broken {
        fn page_count(&self) -> usize {
            2
        }
        fn page(&self, index: usize) -> Result<PageLayout> {
            Err(Error::Pdf(format!("bad page {}", index)))
        }
    }

    fn line(text: &str, x: f32, top: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * 2.0;
                Glyph::new(c.to_string(), x0, x0 + 2.0, top, top + 8.0)
            })
            .collect()
    }

    #[test]
    fn test_process_text() {
        let classifier = Classifier::from_config(&PipelineConfig::default()).unwrap();
        let pipeline = DocumentPipeline::new(&classifier);
        let text = "La inflación en México subió en el trimestre. La inflación mundial preocupa a analistas.\nEl PIB cayó.";
        let outcome = pipeline.process_text(DocumentInfo::from_path("informe_2021.pdf"), text);

        assert_eq!(outcome.sentences, 3);
        assert_eq!(outcome.kept(), 1);
        assert_eq!(
            outcome.buckets.inflation_prioritized,
            vec!["La inflación en México subió en el trimestre."]
        );
        let reasons: Vec<_> = outcome.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RejectReason::Global, RejectReason::TooShort]);
    }

    #[test]
    fn test_process_source_uses_layout_mode() {
        let classifier = Classifier::from_config(&PipelineConfig::default()).unwrap();
        let pipeline = DocumentPipeline::new(&classifier);

        // Left column holds the start of a sentence, right column its end.
        let mut glyphs = line("El PIB de México", 10.0, 20.0);
        glyphs.extend(line("creció este trimestre", 310.0, 20.0));
        glyphs.extend(line("con fuerza sostenida.", 10.0, 40.0));
        let page = OnePage(PageLayout::new(600.0, 800.0, glyphs));

        let single = DocumentInfo::from_path("informe_2016.pdf");
        assert_eq!(single.layout, LayoutMode::SingleColumn);
        let outcome = pipeline.process_source(single, &page).unwrap();
        assert_eq!(
            outcome.buckets.gdp_prioritized,
            vec!["El PIB de México creció este trimestre con fuerza sostenida."]
        );

        let double = DocumentInfo::from_path("informe_2019.pdf");
        let outcome = pipeline.process_source(double, &page).unwrap();
        assert_eq!(
            outcome.buckets.gdp_prioritized,
            vec!["El PIB de México con fuerza sostenida."]
        );
    }

    #[test]
    fn test_extraction_failure_propagates() {
        let classifier = Classifier::from_config(&PipelineConfig::default()).unwrap();
        let pipeline = DocumentPipeline::new(&classifier);
        let err = pipeline
            .process_source(DocumentInfo::from_path("informe_2019.pdf"), &Broken)
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}

//! Discurso Corpus — turns a directory of report PDFs into bucket records,
//! and derives preprocessed records and metadata from them.

pub mod batch;
pub mod metadata;
pub mod pipeline;
pub mod preprocess;
pub mod records;
pub mod writer;

pub use batch::{run_extraction, write_outcome, BatchOptions, BatchReport};
pub use metadata::{build_metadata, run_metadata, DocumentMetadata, DEFAULT_SOURCE};
pub use pipeline::{DocumentOutcome, DocumentPipeline};
pub use preprocess::{run_normalization, NormalizeReport};
pub use records::{list_records, read_record};
pub use writer::{record_path, rejected_path, write_atomic, write_json};

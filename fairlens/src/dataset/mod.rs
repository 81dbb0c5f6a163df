//! Client-side dataset ingestion and column classification.

pub mod inference;
pub mod parser;
pub mod protected;
pub mod summary;

pub use inference::{ColumnType, ColumnTypeDetector};
pub use parser::{parse_csv, CsvParser, RawTable, RowPolicy};
pub use protected::{ProtectedAssessment, ProtectedAttributeDetector, ProtectedRule, RiskLevel};
pub use summary::{ColumnProfile, DatasetProcessor, DatasetSummary, PreviewRow, ProcessorConfig};

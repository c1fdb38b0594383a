//! Biblion Core - Streaming virtual-relation engine for bibliographic corpora
//!
//! This crate provides the pieces shared by every corpus adapter: container
//! readers for gzip, tar, zip and CSV sources, record splitters for XML and
//! JSON streams, the virtual table engine (values, schemas, cursors, scan
//! hints) and the run infrastructure (cancellation, logging, progress).

pub mod cancel;
pub mod container;
pub mod cursor;
pub mod error;
pub mod logging;
pub mod progress;
pub mod table;
pub mod work_queue;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use container::csv::CsvRecords;
pub use container::json::{JsonArrayRecords, top_level_field};
pub use container::tar::{TarMember, TarMembers};
pub use container::xml::{EntityResolver, XmlRecords, predefined_entities};
pub use container::{GzipReader, open_gzip, open_source, open_zip_entry};
pub use cursor::{FlatCursor, Pulled, RecordStream};
pub use error::{RecordLocation, SkippedRecord, SourceError};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num, report_rows};
pub use table::{
    ColumnDef, ColumnMask, ColumnType, Cursor, HintUse, Row, RowBuilder, RowRange, Sample, ScanHint, Step,
    TableSchema, Value, VirtualSource,
};
pub use work_queue::WorkQueue;

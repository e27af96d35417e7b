//! On-disk columnar vector file container (spec §4.4).

pub mod footer;
pub mod header;
pub mod reader;
pub mod record_batch;
pub mod writer;

pub use footer::{ColumnPageIndex, Footer, MAGIC};
pub use header::{Header, FORMAT_VERSION, HEADER_SIZE};
pub use reader::ColumnFileReader;
pub use record_batch::RecordBatch;
pub use writer::ColumnFileWriter;

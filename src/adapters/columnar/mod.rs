//! Parquet output for exported report rows.
//!
//! - `schema`: Arrow schemas and record-to-batch conversion per report kind
//! - `writer`: writer properties, output naming, staged file writes

pub mod schema;
pub mod writer;

pub use schema::{ColumnarRecord, meter_report_schema, port_attribute_schema};
pub use writer::{OUTPUT_SUFFIX, SinkError, WriteStats, output_path, write_records};

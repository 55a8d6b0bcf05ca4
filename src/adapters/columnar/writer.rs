//! Snappy-compressed Parquet writes with staged output.
//!
//! Files are written next to their destination under a `.tmp` name and
//! renamed into place once the footer is on disk, so readers never observe a
//! half-written archive and a failed export leaves nothing behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, Encoding};
use parquet::errors::ParquetError;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use thiserror::Error;

use crate::adapters::columnar::schema::ColumnarRecord;

pub const OUTPUT_SUFFIX: &str = "parquet.snappy";
pub const ROW_GROUP_TARGET_BYTES: usize = 128 * 1024 * 1024;
pub const WRITE_BATCH_ROWS: usize = 8192;
const ROW_GROUP_MAX_ROWS: usize = 64 * 1024 * 1024;

const STAGING_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet write failed: {0}")]
    Parquet(#[from] ParquetError),
    #[error("record batch build failed: {0}")]
    Arrow(#[from] ArrowError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub rows: u64,
    pub bytes: u64,
}

/// `<target_root>/<date_prefix>/<source stem>.parquet.snappy`
pub fn output_path(target_root: &Path, date_prefix: &str, source: &Path) -> PathBuf {
    let mut name = source.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(OUTPUT_SUFFIX);
    target_root.join(date_prefix).join(name)
}

pub fn writer_properties(metadata: Vec<KeyValue>) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(false)
        .set_encoding(Encoding::PLAIN)
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_write_batch_size(WRITE_BATCH_ROWS)
        // Row groups are normally cut by size in `write_file`.
        .set_max_row_group_size(ROW_GROUP_MAX_ROWS)
        .set_key_value_metadata(Some(metadata))
        .build()
}

/// Writes `records` to `output`, replacing any existing file only on success.
pub fn write_records<R: ColumnarRecord>(
    output: &Path,
    records: &[R],
    metadata: Vec<KeyValue>,
) -> Result<WriteStats, SinkError> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(output);
    let result = write_file(&staging, records, writer_properties(metadata))
        .and_then(|()| fs::rename(&staging, output).map_err(SinkError::from));

    if let Err(error) = result {
        if let Err(cleanup) = fs::remove_file(&staging)
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %staging.display(),
                error = %cleanup,
                "failed to remove staged output"
            );
        }
        return Err(error);
    }

    Ok(WriteStats {
        rows: records.len() as u64,
        bytes: fs::metadata(output)?.len(),
    })
}

fn write_file<R: ColumnarRecord>(
    path: &Path,
    records: &[R],
    properties: WriterProperties,
) -> Result<(), SinkError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, R::schema(), Some(properties))?;

    for chunk in records.chunks(WRITE_BATCH_ROWS) {
        let batch = R::to_batch(chunk)?;
        writer.write(&batch)?;

        if writer.in_progress_size() >= ROW_GROUP_TARGET_BYTES {
            writer.flush()?;
        }
    }

    let file = writer.into_inner()?;
    file.sync_all()?;
    Ok(())
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".");
    name.push(STAGING_SUFFIX);
    output.with_file_name(name)
}

use std::path::Path;

use parquet::format::KeyValue;
use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::columnar::{SinkError, write_records};
use crate::adapters::source_db::{SourceError, query_meter_reports, query_port_attributes};
use crate::domain::cutoff::Cutoff;
use crate::domain::report_kind::ReportKind;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub rows: u64,
    pub bytes: u64,
}

/// Reads one source database and writes its matching rows to `output`.
///
/// Rows are fully read before the output file is created, so a query or scan
/// failure never touches the destination.
pub trait Exporter {
    fn kind(&self) -> ReportKind;

    fn export(
        &self,
        source: &Connection,
        cutoff: &Cutoff,
        output: &Path,
    ) -> Result<ExportStats, ExportError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PortAttributeExporter;

#[derive(Debug, Clone, Copy)]
pub struct MeterReportExporter;

pub fn exporter_for(kind: ReportKind) -> &'static dyn Exporter {
    match kind {
        ReportKind::PortAttribute => &PortAttributeExporter,
        ReportKind::MeterReport => &MeterReportExporter,
    }
}

impl Exporter for PortAttributeExporter {
    fn kind(&self) -> ReportKind {
        ReportKind::PortAttribute
    }

    fn export(
        &self,
        source: &Connection,
        cutoff: &Cutoff,
        output: &Path,
    ) -> Result<ExportStats, ExportError> {
        let records = query_port_attributes(source, &cutoff.timestamp)?;
        tracing::debug!(kind = %self.kind(), rows = records.len(), "source query finished");

        let written = write_records(output, &records, file_metadata(self.kind(), cutoff))?;
        Ok(ExportStats {
            rows: written.rows,
            bytes: written.bytes,
        })
    }
}

impl Exporter for MeterReportExporter {
    fn kind(&self) -> ReportKind {
        ReportKind::MeterReport
    }

    fn export(
        &self,
        source: &Connection,
        cutoff: &Cutoff,
        output: &Path,
    ) -> Result<ExportStats, ExportError> {
        let records = query_meter_reports(source, &cutoff.timestamp)?;
        tracing::debug!(kind = %self.kind(), rows = records.len(), "source query finished");

        let written = write_records(output, &records, file_metadata(self.kind(), cutoff))?;
        Ok(ExportStats {
            rows: written.rows,
            bytes: written.bytes,
        })
    }
}

fn file_metadata(kind: ReportKind, cutoff: &Cutoff) -> Vec<KeyValue> {
    [
        ("report.kind", kind.to_string()),
        ("report.source_table", kind.table().to_string()),
        ("report.cutoff", cutoff.timestamp.clone()),
        (
            "report_archiver.version",
            env!("CARGO_PKG_VERSION").to_string(),
        ),
    ]
    .into_iter()
    .map(|(key, value)| KeyValue {
        key: key.to_string(),
        value: Some(value),
    })
    .collect()
}

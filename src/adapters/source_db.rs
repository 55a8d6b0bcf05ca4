use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, Statement, params};
use thiserror::Error;

use crate::domain::records::{MeterReportRecord, PortAttributeRecord};
use crate::domain::report_kind::ReportKind;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open source database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query on {table} failed: {source}")]
    Query {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{table} returns {actual} columns, expected {expected}")]
    ColumnCount {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("failed to read {table}.{column}: {reason}")]
    Scan {
        table: &'static str,
        column: &'static str,
        reason: String,
    },
}

pub fn open_source(path: &Path) -> Result<Connection, SourceError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub fn query_port_attributes(
    connection: &Connection,
    cutoff: &str,
) -> Result<Vec<PortAttributeRecord>, SourceError> {
    let kind = ReportKind::PortAttribute;
    let sql = format!(
        "SELECT * FROM {} WHERE {} >= ?1",
        kind.table(),
        kind.filter_column()
    );
    let mut statement = prepare(connection, kind, &sql, &PortAttributeRecord::COLUMNS)?;
    let mut rows = statement
        .query(params![cutoff])
        .map_err(query_error(kind))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(query_error(kind))? {
        let cells = Cells::new(row, kind, &PortAttributeRecord::COLUMNS);
        records.push(PortAttributeRecord {
            id: cells.integer(0)?,
            device_unit_id: cells.text(1)?,
            sequence: cells.text(2)?,
            attribute_type: cells.text(3)?,
            attribute_value: cells.text(4)?,
            collected_at: cells.text(5)?,
            created_at: cells.text(6)?,
        });
    }

    Ok(records)
}

pub fn query_meter_reports(
    connection: &Connection,
    cutoff: &str,
) -> Result<Vec<MeterReportRecord>, SourceError> {
    let kind = ReportKind::MeterReport;
    let sql = format!(
        "SELECT * FROM {} WHERE {} >= ?1 AND status = '1'",
        kind.table(),
        kind.filter_column()
    );
    let mut statement = prepare(connection, kind, &sql, &MeterReportRecord::COLUMNS)?;
    let mut rows = statement
        .query(params![cutoff])
        .map_err(query_error(kind))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(query_error(kind))? {
        let cells = Cells::new(row, kind, &MeterReportRecord::COLUMNS);
        records.push(MeterReportRecord {
            id: cells.integer(0)?,
            element_id: cells.text(1)?,
            data_type: cells.integer(2)?,
            data_value: cells.text(3)?,
            reported_at: cells.text(4)?,
            status: cells.text(5)?,
        });
    }

    Ok(records)
}

fn prepare<'c>(
    connection: &'c Connection,
    kind: ReportKind,
    sql: &str,
    columns: &[&'static str],
) -> Result<Statement<'c>, SourceError> {
    let statement = connection.prepare(sql).map_err(query_error(kind))?;

    // Rows are decoded by position, so the table must match the record exactly.
    if statement.column_count() != columns.len() {
        return Err(SourceError::ColumnCount {
            table: kind.table(),
            expected: columns.len(),
            actual: statement.column_count(),
        });
    }

    Ok(statement)
}

fn query_error(kind: ReportKind) -> impl Fn(rusqlite::Error) -> SourceError {
    move |source| SourceError::Query {
        table: kind.table(),
        source,
    }
}

struct Cells<'r, 's> {
    row: &'r Row<'s>,
    table: &'static str,
    columns: &'r [&'static str],
}

impl<'r, 's> Cells<'r, 's> {
    fn new(row: &'r Row<'s>, kind: ReportKind, columns: &'r [&'static str]) -> Self {
        Self {
            row,
            table: kind.table(),
            columns,
        }
    }

    fn integer(&self, index: usize) -> Result<i64, SourceError> {
        match self.value(index)? {
            ValueRef::Integer(value) => Ok(value),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or_else(|| self.scan_error(index, "text is not an integer")),
            other => Err(self.scan_error(
                index,
                format!("cannot convert {} to integer", other.data_type()),
            )),
        }
    }

    fn text(&self, index: usize) -> Result<String, SourceError> {
        match self.value(index)? {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|error| self.scan_error(index, error)),
            ValueRef::Integer(value) => Ok(value.to_string()),
            ValueRef::Real(value) => Ok(value.to_string()),
            ValueRef::Null => Err(self.scan_error(index, "NULL value")),
        }
    }

    fn value(&self, index: usize) -> Result<ValueRef<'_>, SourceError> {
        self.row
            .get_ref(index)
            .map_err(|error| self.scan_error(index, error))
    }

    fn scan_error<E: std::fmt::Display>(&self, index: usize, reason: E) -> SourceError {
        SourceError::Scan {
            table: self.table,
            column: self.columns.get(index).copied().unwrap_or("?"),
            reason: reason.to_string(),
        }
    }
}

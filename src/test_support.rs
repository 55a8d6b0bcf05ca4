use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::TempDir;

use crate::adapters::seed::{seed_meter_reports, seed_port_attributes};
use crate::domain::cutoff::FixedClock;
use crate::domain::records::{MeterReportRecord, PortAttributeRecord};

pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("tempdir should be created")
}

/// 2024-03-02 12:00:00, so the default `-24h` offset lands on 2024-03-01 12:00:00.
pub fn fixed_clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 3, 2)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("fixed anchor should be valid"),
    )
}

pub fn port_attribute(id: i64, collected_at: &str) -> PortAttributeRecord {
    PortAttributeRecord {
        id,
        device_unit_id: "duuid-0001".to_string(),
        sequence: format!("{}", id % 4),
        attribute_type: "temperature".to_string(),
        attribute_value: format!("{}.5", 20 + id % 10),
        collected_at: collected_at.to_string(),
        created_at: collected_at.to_string(),
    }
}

pub fn meter_report(id: i64, reported_at: &str, status: &str) -> MeterReportRecord {
    MeterReportRecord {
        id,
        element_id: "ele-0009".to_string(),
        data_type: 2,
        data_value: format!("{}", 230 + id % 5),
        reported_at: reported_at.to_string(),
        status: status.to_string(),
    }
}

pub fn create_port_attribute_db(path: &Path, records: &[PortAttributeRecord]) {
    ensure_parent(path);
    seed_port_attributes(path, records).expect("port attribute fixture should be written");
}

pub fn create_meter_report_db(path: &Path, records: &[MeterReportRecord]) {
    ensure_parent(path);
    seed_meter_reports(path, records).expect("meter report fixture should be written");
}

pub fn read_batches(path: &Path) -> Vec<RecordBatch> {
    let file = File::open(path).expect("parquet output should open");
    ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("parquet footer should parse")
        .build()
        .expect("parquet reader should build")
        .collect::<Result<Vec<_>, _>>()
        .expect("parquet batches should decode")
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).expect("fixture dir should be creatable");
    }
}

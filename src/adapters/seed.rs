//! Builds source databases in the layout the field units produce. Used by the
//! `create_test_db` binary and by tests.

use std::path::Path;

use rusqlite::{Connection, params};

use crate::domain::records::{MeterReportRecord, PortAttributeRecord};
use crate::domain::report_kind::ReportKind;

const PORT_ATTRIBUTE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS ESD_PORT_ATTR_REPORT_HIS (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    duuid TEXT NOT NULL,
    esdseq TEXT NOT NULL,
    esdtype TEXT NOT NULL,
    esdvalue TEXT NOT NULL,
    colltime TEXT NOT NULL,
    createtime TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_esd_port_attr_report_his_colltime
ON ESD_PORT_ATTR_REPORT_HIS (colltime);
"#;

const METER_REPORT_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS t_emcu_report_his (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    eleid TEXT NOT NULL,
    datatype INTEGER NOT NULL,
    datevalue TEXT NOT NULL,
    reporttime TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_t_emcu_report_his_reporttime
ON t_emcu_report_his (reporttime);
"#;

pub fn open_for_seeding(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open(path)
}

pub fn create_tables(connection: &Connection, kind: ReportKind) -> rusqlite::Result<()> {
    match kind {
        ReportKind::PortAttribute => connection.execute_batch(PORT_ATTRIBUTE_DDL),
        ReportKind::MeterReport => connection.execute_batch(METER_REPORT_DDL),
    }
}

pub fn insert_port_attribute(
    connection: &Connection,
    record: &PortAttributeRecord,
) -> rusqlite::Result<()> {
    connection.execute(
        "INSERT INTO ESD_PORT_ATTR_REPORT_HIS (id, duuid, esdseq, esdtype, esdvalue, colltime, createtime) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.device_unit_id,
            record.sequence,
            record.attribute_type,
            record.attribute_value,
            record.collected_at,
            record.created_at,
        ],
    )?;
    Ok(())
}

pub fn insert_meter_report(
    connection: &Connection,
    record: &MeterReportRecord,
) -> rusqlite::Result<()> {
    connection.execute(
        "INSERT INTO t_emcu_report_his (id, eleid, datatype, datevalue, reporttime, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.element_id,
            record.data_type,
            record.data_value,
            record.reported_at,
            record.status,
        ],
    )?;
    Ok(())
}

pub fn seed_port_attributes(
    path: &Path,
    records: &[PortAttributeRecord],
) -> rusqlite::Result<()> {
    let mut connection = open_for_seeding(path)?;
    create_tables(&connection, ReportKind::PortAttribute)?;
    let transaction = connection.transaction()?;
    for record in records {
        insert_port_attribute(&transaction, record)?;
    }
    transaction.commit()
}

pub fn seed_meter_reports(path: &Path, records: &[MeterReportRecord]) -> rusqlite::Result<()> {
    let mut connection = open_for_seeding(path)?;
    create_tables(&connection, ReportKind::MeterReport)?;
    let transaction = connection.transaction()?;
    for record in records {
        insert_meter_report(&transaction, record)?;
    }
    transaction.commit()
}

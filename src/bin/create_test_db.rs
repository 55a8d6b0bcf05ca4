use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};
use clap::Parser;

use report_archiver::adapters::seed::{seed_meter_reports, seed_port_attributes};
use report_archiver::domain::cutoff::CUTOFF_FORMAT;
use report_archiver::domain::records::{MeterReportRecord, PortAttributeRecord};

const ROWS_PER_DB: i64 = 12;
const ROW_SPACING_HOURS: i64 = 4;

/// Write sample report databases in the source layout
#[derive(Parser, Debug)]
#[command(name = "create_test_db")]
struct Args {
    /// Source root to populate
    #[arg(long, default_value = "./testdata", value_name = "DIR")]
    root: PathBuf,

    /// Delete existing sample databases before writing
    #[arg(long)]
    force: bool,
}

fn main() {
    if let Err(error) = run(Args::parse()) {
        eprintln!("failed to create test db: {error}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let now = Local::now().naive_local();
    let port_path = args.root.join("1045/88/EsdAttrReport/duuid-0001.db");
    let meter_path = args.root.join("1045/88/EmcuReport/ele-0001.db");

    for path in [&port_path, &meter_path] {
        prepare(path, args.force)?;
    }

    let port_rows: Vec<PortAttributeRecord> = (1..=ROWS_PER_DB)
        .map(|id| PortAttributeRecord {
            id,
            device_unit_id: "duuid-0001".to_string(),
            sequence: format!("{}", id % 4 + 1),
            attribute_type: "voltage".to_string(),
            attribute_value: format!("{}.{}", 48 + id % 3, id % 10),
            collected_at: hours_ago(now, id),
            created_at: hours_ago(now, id),
        })
        .collect();
    seed_port_attributes(&port_path, &port_rows).map_err(|error| error.to_string())?;

    let meter_rows: Vec<MeterReportRecord> = (1..=ROWS_PER_DB)
        .map(|id| MeterReportRecord {
            id,
            element_id: "ele-0001".to_string(),
            data_type: id % 3,
            data_value: format!("{}", 220 + id),
            reported_at: hours_ago(now, id),
            status: if id % 4 == 0 { "0" } else { "1" }.to_string(),
        })
        .collect();
    seed_meter_reports(&meter_path, &meter_rows).map_err(|error| error.to_string())?;

    println!("created port attribute db at: {}", port_path.display());
    println!("created meter report db at: {}", meter_path.display());
    println!(
        "rows per db: {ROWS_PER_DB}, one every {ROW_SPACING_HOURS}h going back from {}",
        now.format(CUTOFF_FORMAT)
    );
    Ok(())
}

fn prepare(path: &Path, force: bool) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if path.exists() {
        if !force {
            return Err(format!(
                "{} already exists, pass --force to replace it",
                path.display()
            ));
        }
        std::fs::remove_file(path)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    Ok(())
}

fn hours_ago(now: NaiveDateTime, step: i64) -> String {
    (now - TimeDelta::hours(step * ROW_SPACING_HOURS))
        .format(CUTOFF_FORMAT)
        .to_string()
}

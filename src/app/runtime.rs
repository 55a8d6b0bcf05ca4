use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glob::Pattern;
use thiserror::Error;

use crate::adapters::columnar::output_path;
use crate::adapters::export::{ExportError, ExportStats, exporter_for};
use crate::adapters::source_db::{SourceError, open_source};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::domain::cutoff::{Clock, Cutoff, SystemClock};
use crate::domain::report_kind::{ClassifyError, ReportKind};

/// `<platform>/<company>/<report type>/<unit>.db` below the source root.
pub const SOURCE_PATTERN: &str = "*/*/*/*.db";

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Open(SourceError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub kind: ReportKind,
    pub output: PathBuf,
    pub stats: ExportStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub exported: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub rows: u64,
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    if let Err(error) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!(error = %error, "failed to install interrupt handler");
    }

    // Per-file failures are reported in the summary; the run itself succeeds.
    run_batch(&config, &SystemClock, &stop_flag).map(|_| ())
}

pub fn run_batch<C: Clock>(
    config: &AppConfig,
    clock: &C,
    stop_flag: &AtomicBool,
) -> Result<RunSummary, AppError> {
    let cutoff = Cutoff::resolve(config.offset, clock).map_err(AppError::config)?;
    tracing::info!(
        offset = %config.offset_text,
        cutoff = %cutoff.timestamp,
        date_prefix = %cutoff.date_prefix,
        "cutoff resolved"
    );

    let files = discover(&config.source_root)?;
    let total = files.len();
    tracing::info!(
        source = %config.source_root.display(),
        total,
        "scan finished, conversion begins"
    );

    let mut summary = RunSummary {
        discovered: total,
        ..RunSummary::default()
    };

    for (index, path) in files.iter().enumerate() {
        let position = index + 1;

        if stop_flag.load(Ordering::Relaxed) {
            summary.not_attempted = total - index;
            tracing::warn!(
                remaining = summary.not_attempted,
                "interrupted, remaining files not converted"
            );
            break;
        }

        tracing::debug!(index = position, total, path = %path.display(), "conversion started");

        match convert_file(path, &config.target_root, &cutoff) {
            Ok(outcome) => {
                summary.exported += 1;
                summary.rows += outcome.stats.rows;
                tracing::info!(
                    index = position,
                    total,
                    kind = %outcome.kind,
                    rows = outcome.stats.rows,
                    bytes = outcome.stats.bytes,
                    output = %outcome.output.display(),
                    "file exported"
                );
            }
            Err(error) => {
                summary.failed += 1;
                tracing::error!(
                    index = position,
                    total,
                    path = %path.display(),
                    error = %error,
                    "conversion failed, skipping file"
                );
            }
        }
    }

    if summary.failed > 0 || summary.not_attempted > 0 {
        tracing::warn!(
            discovered = summary.discovered,
            exported = summary.exported,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            rows = summary.rows,
            "conversion finished with failures"
        );
    } else {
        tracing::info!(
            discovered = summary.discovered,
            exported = summary.exported,
            rows = summary.rows,
            "conversion finished"
        );
    }

    Ok(summary)
}

/// Lists candidate databases exactly four levels below `source_root`.
///
/// Entries the walker cannot read are logged and skipped; only an invalid
/// pattern is fatal.
pub fn discover(source_root: &Path) -> Result<Vec<PathBuf>, AppError> {
    let root = source_root.to_str().ok_or_else(|| {
        AppError::discovery(format!(
            "source path is not valid UTF-8: {}",
            source_root.display()
        ))
    })?;
    let pattern = Path::new(&Pattern::escape(root)).join(SOURCE_PATTERN);
    let pattern = pattern.to_string_lossy();
    tracing::debug!(pattern = %pattern, "scanning for source databases");

    let entries = glob::glob(&pattern).map_err(AppError::discovery)?;
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => files.push(path),
            Err(error) => {
                tracing::warn!(error = %error, "skipping unreadable path during discovery");
            }
        }
    }

    Ok(files)
}

/// classify, open, export. The source handle is dropped before returning.
pub fn convert_file(
    path: &Path,
    target_root: &Path,
    cutoff: &Cutoff,
) -> Result<FileOutcome, FileError> {
    let kind = ReportKind::classify(path)?;
    let connection = open_source(path).map_err(FileError::Open)?;
    let output = output_path(target_root, &cutoff.date_prefix, path);

    let stats = exporter_for(kind).export(&connection, cutoff, &output)?;

    Ok(FileOutcome {
        kind,
        output,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;

    use chrono::TimeDelta;

    use super::{FileError, RunSummary, convert_file, discover, run_batch};
    use crate::app::config::AppConfig;
    use crate::domain::cutoff::Cutoff;
    use crate::test_support::{
        create_meter_report_db, create_port_attribute_db, fixed_clock, meter_report,
        port_attribute, read_batches, temp_dir,
    };

    fn config(source: &Path, target: &Path) -> AppConfig {
        AppConfig {
            source_root: source.to_path_buf(),
            target_root: target.to_path_buf(),
            offset: TimeDelta::hours(-24),
            offset_text: "-24h".to_string(),
        }
    }

    /// Two convertible databases, one unsupported report type, one corrupt
    /// file, and one database too shallow to be discovered.
    fn build_source_tree(root: &Path) {
        create_port_attribute_db(
            &root.join("1045/77/EsdAttrReport/dev-01.db"),
            &[
                port_attribute(1, "2024-03-01 12:00:00"),
                port_attribute(2, "2024-02-29 23:59:59"),
                port_attribute(3, "2024-03-01 18:30:00"),
            ],
        );
        create_meter_report_db(
            &root.join("1045/77/EmcuReport/ele-09.db"),
            &[
                meter_report(1, "2024-03-01 12:00:00", "1"),
                meter_report(2, "2024-03-01 12:00:00", "0"),
                meter_report(3, "2024-02-29 12:00:00", "1"),
            ],
        );
        create_meter_report_db(
            &root.join("1045/77/OtherReport/misc.db"),
            &[meter_report(1, "2024-03-01 12:00:00", "1")],
        );
        let corrupt = root.join("1045/88/EmcuReport/broken.db");
        fs::create_dir_all(corrupt.parent().expect("corrupt file has a parent"))
            .expect("corrupt dir should be created");
        fs::write(&corrupt, b"this is not a sqlite database").expect("corrupt file written");
        create_port_attribute_db(
            &root.join("1045/EsdAttrReport/shallow.db"),
            &[port_attribute(1, "2024-03-01 12:00:00")],
        );
    }

    #[test]
    fn discovers_only_files_four_levels_deep() {
        let dir = temp_dir();
        build_source_tree(dir.path());
        fs::write(dir.path().join("1045/77/EmcuReport/notes.txt"), b"x").expect("write");

        let mut names: Vec<String> = discover(dir.path())
            .expect("discovery should succeed")
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["broken.db", "dev-01.db", "ele-09.db", "misc.db"]);
    }

    #[test]
    fn discovers_nothing_under_missing_root() {
        let dir = temp_dir();
        let files = discover(&dir.path().join("absent")).expect("discovery should succeed");
        assert!(files.is_empty());
    }

    #[test]
    fn escapes_glob_characters_in_source_root() {
        let dir = temp_dir();
        let root = dir.path().join("data[1]");
        create_meter_report_db(
            &root.join("1045/77/EmcuReport/ele-01.db"),
            &[meter_report(1, "2024-03-01 12:00:00", "1")],
        );

        let files = discover(&root).expect("discovery should succeed");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn continues_past_failing_files_and_counts_them() {
        let source = temp_dir();
        let target = temp_dir();
        build_source_tree(source.path());

        let summary = run_batch(
            &config(source.path(), target.path()),
            &fixed_clock(),
            &AtomicBool::new(false),
        )
        .expect("run should succeed");

        assert_eq!(
            summary,
            RunSummary {
                discovered: 4,
                exported: 2,
                failed: 2,
                not_attempted: 0,
                rows: 3,
            }
        );

        let dated = target.path().join("2024-03-01");
        let mut outputs: Vec<String> = fs::read_dir(&dated)
            .expect("dated output dir should exist")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        outputs.sort();
        assert_eq!(
            outputs,
            vec!["dev-01.parquet.snappy", "ele-09.parquet.snappy"]
        );

        let port_rows: usize = read_batches(&dated.join("dev-01.parquet.snappy"))
            .iter()
            .map(|batch| batch.num_rows())
            .sum();
        assert_eq!(port_rows, 2);
        let meter_rows: usize = read_batches(&dated.join("ele-09.parquet.snappy"))
            .iter()
            .map(|batch| batch.num_rows())
            .sum();
        assert_eq!(meter_rows, 1);
    }

    #[test]
    fn rerun_with_pinned_anchor_is_byte_identical() {
        let source = temp_dir();
        let first = temp_dir();
        let second = temp_dir();
        build_source_tree(source.path());
        let stop = AtomicBool::new(false);

        run_batch(&config(source.path(), first.path()), &fixed_clock(), &stop)
            .expect("first run should succeed");
        run_batch(&config(source.path(), second.path()), &fixed_clock(), &stop)
            .expect("second run should succeed");

        for name in ["dev-01.parquet.snappy", "ele-09.parquet.snappy"] {
            let relative = PathBuf::from("2024-03-01").join(name);
            let a = fs::read(first.path().join(&relative)).expect("first output readable");
            let b = fs::read(second.path().join(&relative)).expect("second output readable");
            assert_eq!(a, b, "{name} should be byte-identical");
        }
    }

    #[test]
    fn stops_before_next_file_when_interrupted() {
        let source = temp_dir();
        let target = temp_dir();
        build_source_tree(source.path());

        let summary = run_batch(
            &config(source.path(), target.path()),
            &fixed_clock(),
            &AtomicBool::new(true),
        )
        .expect("run should succeed");

        assert_eq!(summary.discovered, 4);
        assert_eq!(summary.not_attempted, 4);
        assert_eq!(summary.exported, 0);
        assert!(!target.path().join("2024-03-01").exists());
    }

    #[test]
    fn empty_source_tree_is_not_an_error() {
        let source = temp_dir();
        let target = temp_dir();

        let summary = run_batch(
            &config(source.path(), target.path()),
            &fixed_clock(),
            &AtomicBool::new(false),
        )
        .expect("run should succeed");

        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn classifies_before_touching_the_source() {
        let dir = temp_dir();
        let path = dir.path().join("1045/77/OtherReport/missing.db");
        let cutoff = Cutoff {
            timestamp: "2024-03-01 12:00:00".to_string(),
            date_prefix: "2024-03-01".to_string(),
        };

        let error = convert_file(&path, dir.path(), &cutoff).expect_err("should be rejected");

        assert!(matches!(error, FileError::Classify(_)));
        assert!(!dir.path().join("2024-03-01").exists());
    }

    #[test]
    fn reports_open_failure_for_missing_source() {
        let dir = temp_dir();
        let path = dir.path().join("1045/77/EmcuReport/missing.db");
        let cutoff = Cutoff {
            timestamp: "2024-03-01 12:00:00".to_string(),
            date_prefix: "2024-03-01".to_string(),
        };

        let error = convert_file(&path, dir.path(), &cutoff).expect_err("should fail to open");

        assert!(matches!(error, FileError::Open(_)));
    }
}

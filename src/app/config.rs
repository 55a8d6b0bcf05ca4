use std::ffi::OsString;
use std::path::PathBuf;

use chrono::TimeDelta;
use clap::Parser;

use crate::app::AppError;
use crate::domain::cutoff::parse_offset;

/// Flags that may also be spelled with a single dash (`-source dir`).
const LONG_FLAGS: &[&str] = &["source", "target", "days"];

/// Convert per-unit SQLite report databases into dated Parquet archives
#[derive(Parser, Debug, Clone)]
#[command(
    name = "report_archiver",
    version,
    about = "Convert per-unit SQLite report databases into dated Parquet archives",
    after_help = "EXAMPLES:\n    \
        report_archiver -source /data/sqlite -target /data/parquet\n    \
        report_archiver --source /data/sqlite --days=-48h"
)]
pub struct CliArgs {
    /// Root scanned for <platform>/<company>/<report>/<file>.db
    #[arg(long, default_value = "./testdata", value_name = "DIR")]
    pub source: PathBuf,

    /// Root the dated output directory is created under
    #[arg(long, default_value = "./testdata", value_name = "DIR")]
    pub target: PathBuf,

    /// Signed offset from now; rows older than now+offset are skipped
    #[arg(
        long,
        default_value = "-24h",
        value_name = "DURATION",
        allow_hyphen_values = true
    )]
    pub days: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub offset: TimeDelta,
    pub offset_text: String,
}

impl AppConfig {
    pub fn from_env_args() -> Result<Self, AppError> {
        Self::from_cli(CliArgs::parse_from(normalize_args(std::env::args_os())))
    }

    pub fn from_cli(args: CliArgs) -> Result<Self, AppError> {
        let offset = parse_offset(args.days.trim()).map_err(AppError::config)?;

        Ok(Self {
            source_root: args.source,
            target_root: args.target,
            offset,
            offset_text: args.days,
        })
    }
}

/// Rewrites `-source`, `-target`, `-days` (and their `=value` forms) to the
/// double-dash spelling clap understands. Everything else passes through.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(flag) = text.strip_prefix('-') else {
                return arg;
            };
            if flag.starts_with('-') {
                return arg;
            }
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    PortAttribute,
    MeterReport,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error(
        "no exporter for {}: path contains neither EsdAttrReport nor EmcuReport",
        path.display()
    )]
    UnknownReportKind { path: PathBuf },
}

impl ReportKind {
    /// Checked in this order; a path carrying both markers is a port attribute report.
    pub const ALL: [ReportKind; 2] = [ReportKind::PortAttribute, ReportKind::MeterReport];

    pub fn marker(self) -> &'static str {
        match self {
            ReportKind::PortAttribute => "EsdAttrReport",
            ReportKind::MeterReport => "EmcuReport",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            ReportKind::PortAttribute => "ESD_PORT_ATTR_REPORT_HIS",
            ReportKind::MeterReport => "t_emcu_report_his",
        }
    }

    pub fn filter_column(self) -> &'static str {
        match self {
            ReportKind::PortAttribute => "colltime",
            ReportKind::MeterReport => "reporttime",
        }
    }

    pub fn classify(path: &Path) -> Result<Self, ClassifyError> {
        let text = path.to_string_lossy();
        Self::ALL
            .into_iter()
            .find(|kind| text.contains(kind.marker()))
            .ok_or_else(|| ClassifyError::UnknownReportKind {
                path: path.to_path_buf(),
            })
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::PortAttribute => f.write_str("port_attribute"),
            ReportKind::MeterReport => f.write_str("meter_report"),
        }
    }
}

pub mod cutoff;
pub mod records;
pub mod report_kind;

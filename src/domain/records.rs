/// One row of `ESD_PORT_ATTR_REPORT_HIS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAttributeRecord {
    pub id: i64,
    pub device_unit_id: String,
    pub sequence: String,
    pub attribute_type: String,
    pub attribute_value: String,
    pub collected_at: String,
    pub created_at: String,
}

impl PortAttributeRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "id",
        "duuid",
        "esdseq",
        "esdtype",
        "esdvalue",
        "colltime",
        "createtime",
    ];
}

/// One row of `t_emcu_report_his`. `status` is kept as text; only `"1"` rows
/// are ever exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterReportRecord {
    pub id: i64,
    pub element_id: String,
    pub data_type: i64,
    pub data_value: String,
    pub reported_at: String,
    pub status: String,
}

impl MeterReportRecord {
    pub const COLUMNS: [&'static str; 6] = [
        "id",
        "eleid",
        "datatype",
        "datevalue",
        "reporttime",
        "status",
    ];
}

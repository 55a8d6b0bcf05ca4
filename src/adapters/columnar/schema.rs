//! Column layout of the archive files. Field order is positional in Parquet
//! and must not change.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::domain::records::{MeterReportRecord, PortAttributeRecord};

pub trait ColumnarRecord: Sized {
    fn schema() -> SchemaRef;

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError>;
}

pub fn port_attribute_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("duuid", DataType::Utf8, false),
        Field::new("esdseq", DataType::Utf8, false),
        Field::new("esdtype", DataType::Utf8, false),
        Field::new("esdvalue", DataType::Utf8, false),
        Field::new("colltime", DataType::Utf8, false),
        Field::new("createtime", DataType::Utf8, false),
    ])
}

pub fn meter_report_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("eleid", DataType::Utf8, false),
        Field::new("datatype", DataType::Int64, false),
        Field::new("datevalue", DataType::Utf8, false),
        Field::new("reporttime", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
    ])
}

fn strings<'a, T: 'a>(records: &'a [T], field: impl Fn(&'a T) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(records.iter().map(field)))
}

fn integers<T>(records: &[T], field: impl Fn(&T) -> i64) -> ArrayRef {
    Arc::new(Int64Array::from_iter_values(records.iter().map(field)))
}

impl ColumnarRecord for PortAttributeRecord {
    fn schema() -> SchemaRef {
        Arc::new(port_attribute_schema())
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                integers(records, |r| r.id),
                strings(records, |r| r.device_unit_id.as_str()),
                strings(records, |r| r.sequence.as_str()),
                strings(records, |r| r.attribute_type.as_str()),
                strings(records, |r| r.attribute_value.as_str()),
                strings(records, |r| r.collected_at.as_str()),
                strings(records, |r| r.created_at.as_str()),
            ],
        )
    }
}

impl ColumnarRecord for MeterReportRecord {
    fn schema() -> SchemaRef {
        Arc::new(meter_report_schema())
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        RecordBatch::try_new(
            Self::schema(),
            vec![
                integers(records, |r| r.id),
                strings(records, |r| r.element_id.as_str()),
                integers(records, |r| r.data_type),
                strings(records, |r| r.data_value.as_str()),
                strings(records, |r| r.reported_at.as_str()),
                strings(records, |r| r.status.as_str()),
            ],
        )
    }
}

use google_sheets4::api::ValueRange;
use serde_json::Value;

use crate::domain::report_row::{ReportCell, ReportRow};

pub trait ValueRangeFactory {
    fn from_report_row(row: &ReportRow) -> Self;
}

fn wrap_cell(cell: ReportCell) -> Value {
    match cell {
        ReportCell::Text(text) => Value::String(text),
        ReportCell::Number(number) => Value::Number(number.into()),
    }
}

impl ValueRangeFactory for ValueRange {
    fn from_report_row(row: &ReportRow) -> Self {
        ValueRange {
            major_dimension: Some("ROWS".to_string()),
            range: None,
            values: Some(vec![row.cells().into_iter().map(wrap_cell).collect()]),
        }
    }
}

use std::fmt::Debug;

use error_stack::{report, ResultExt};
use google_sheets4::{api::ValueRange, Sheets};
use tracing::instrument;

use crate::{
    domain::report_row::ReportRow,
    ports::report_sink::{AppendSummary, ReportSink, ReportSinkError},
};

use super::{
    http_client::{self, HttpsConnector},
    value_range_factory::ValueRangeFactory,
};

/// Let the service parse values as if typed by a user (numbers, dates).
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

pub struct SpreadsheetManager {
    spreadsheet_id: Option<String>,
    range: Option<String>,
    hub: Sheets<HttpsConnector>,
}

impl Debug for SpreadsheetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SpreadsheetManager {{ spreadsheet_id: {:?}, range: {:?} }}",
            self.spreadsheet_id, self.range
        )
    }
}

impl SpreadsheetManager {
    #[instrument(name = "SpreadsheetManager::new", skip(access_token))]
    pub fn new(spreadsheet_id: Option<String>, range: Option<String>, access_token: String) -> Self {
        let hub = Sheets::new(http_client::http_client(), access_token);

        SpreadsheetManager {
            spreadsheet_id,
            range,
            hub,
        }
    }
}

fn append_target<'a>(
    spreadsheet_id: Option<&'a str>,
    range: Option<&'a str>,
) -> error_stack::Result<(&'a str, &'a str), ReportSinkError> {
    let spreadsheet_id = spreadsheet_id.ok_or(report!(ReportSinkError::MissingSpreadsheetId))?;
    let range = range.ok_or(report!(ReportSinkError::MissingRange))?;
    Ok((spreadsheet_id, range))
}

#[async_trait::async_trait]
impl ReportSink for SpreadsheetManager {
    #[instrument]
    async fn append_row(
        &self,
        row: &ReportRow,
    ) -> error_stack::Result<AppendSummary, ReportSinkError> {
        let (spreadsheet_id, range) =
            append_target(self.spreadsheet_id.as_deref(), self.range.as_deref())?;

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_append(ValueRange::from_report_row(row), spreadsheet_id, range)
            .value_input_option(VALUE_INPUT_OPTION)
            .doit()
            .await
            .change_context(ReportSinkError::AppendFailed)
            .attach_printable_lazy(|| format!("Failed to append to range {} ", range))?;

        let updates = response.updates.unwrap_or_default();
        Ok(AppendSummary {
            updated_range: updates.updated_range,
            updated_cells: updates.updated_cells.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_target() {
        assert_eq!(
            append_target(Some("sheet-id"), Some("Masks!A:Z")).unwrap(),
            ("sheet-id", "Masks!A:Z")
        );
    }

    #[test]
    fn test_append_target_requires_spreadsheet_id() {
        let report = append_target(None, Some("Masks!A:Z")).unwrap_err();
        assert!(matches!(
            report.current_context(),
            ReportSinkError::MissingSpreadsheetId
        ));
    }

    #[test]
    fn test_append_target_requires_range() {
        let report = append_target(Some("sheet-id"), None).unwrap_err();
        assert!(matches!(
            report.current_context(),
            ReportSinkError::MissingRange
        ));
    }
}

use thiserror::Error;

use crate::domain::report_row::ReportRow;

#[derive(Error, Debug)]
pub enum ReportSinkError {
    #[error("Spreadsheet id is not configured")]
    MissingSpreadsheetId,
    #[error("Spreadsheet range is not configured")]
    MissingRange,
    #[error("Failed to append report row")]
    AppendFailed,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read the OAuth client secret")]
    ClientSecret,
    #[error("Interactive login failed")]
    Login,
    #[error("Failed to refresh the cached credential")]
    Refresh,
    #[error("Failed to update the credential cache")]
    Cache,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSummary {
    pub updated_range: Option<String>,
    pub updated_cells: i32,
}

#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Appends `row` after the last row of the configured range. Never
    /// overwrites existing rows.
    async fn append_row(
        &self,
        row: &ReportRow,
    ) -> error_stack::Result<AppendSummary, ReportSinkError>;
}

/// Authenticates and hands out a ready-to-use sink.
#[async_trait::async_trait]
pub trait ReportSinkConnector: Send + Sync {
    type Sink: ReportSink;

    async fn connect(&self) -> error_stack::Result<Self::Sink, AuthError>;
}

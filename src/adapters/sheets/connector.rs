use chrono::Utc;
use tracing::instrument;

use crate::{
    adapters::config::app_config::AppConfig,
    application::authenticate::authenticate,
    ports::report_sink::{AuthError, ReportSinkConnector},
};

use super::{
    auth::InstalledAppFlow, credential_store::FileCredentialStore,
    spreadsheet_manager::SpreadsheetManager,
};

#[derive(Debug)]
pub struct SheetsConnector {
    spreadsheet_id: Option<String>,
    range: Option<String>,
    store: FileCredentialStore,
    flow: InstalledAppFlow,
}

impl SheetsConnector {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.spreadsheet_range.clone(),
            store: FileCredentialStore::new(&config.token_cache_path),
            flow: InstalledAppFlow::new(config.client_secret_path.clone()),
        }
    }
}

#[async_trait::async_trait]
impl ReportSinkConnector for SheetsConnector {
    type Sink = SpreadsheetManager;

    #[instrument(skip(self))]
    async fn connect(&self) -> error_stack::Result<SpreadsheetManager, AuthError> {
        let credential = authenticate(&self.store, &self.flow, Utc::now()).await?;

        Ok(SpreadsheetManager::new(
            self.spreadsheet_id.clone(),
            self.range.clone(),
            credential.access_token,
        ))
    }
}

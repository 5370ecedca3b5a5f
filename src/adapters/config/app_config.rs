use config::{Config, ConfigError, Environment, File, Source};
use error_stack::{Report, ResultExt};
use thiserror::Error;

pub const DEFAULT_SECRETS_PATH: &str = "Secrets";
pub const DEFAULT_DATASET_URL: &str = "http://data.nhi.gov.tw/Datasets/Download.ashx?rid=A21030000I-D50001-001&l=https://data.nhi.gov.tw/resource/mask/maskdata.csv";
pub const DEFAULT_CLIENT_SECRET_PATH: &str = "credentials.json";
pub const DEFAULT_TOKEN_CACHE_PATH: &str = "token.json";
pub const DEFAULT_LOG_FILE: &str = "mask_report.log";

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("Failed to read the private settings file")]
    PrivateSource,
    #[error("Failed to read configuration from the environment")]
    Environment,
    #[error("Failed to deserialize configuration")]
    Deserialize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigOrigin {
    PrivateFile,
    #[default]
    Environment,
}

/// Resolved once at startup and passed down by reference.
#[derive(serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default, alias = "spreadsheet_mask_update_range")]
    pub spreadsheet_range: Option<String>,
    #[serde(default, alias = "drugstore_address_filter")]
    pub address_filter: Option<String>,
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
    #[serde(default = "default_client_secret_path")]
    pub client_secret_path: String,
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(skip)]
    pub origin: ConfigOrigin,
}

fn default_dataset_url() -> String {
    DEFAULT_DATASET_URL.to_string()
}

fn default_client_secret_path() -> String {
    DEFAULT_CLIENT_SECRET_PATH.to_string()
}

fn default_token_cache_path() -> String {
    DEFAULT_TOKEN_CACHE_PATH.to_string()
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

impl AppConfig {
    /// Private settings file first (`SECRETS_PATH`, default `Secrets.*`), then
    /// the process environment.
    pub fn load() -> error_stack::Result<Self, AppConfigError> {
        let secrets_path =
            std::env::var("SECRETS_PATH").unwrap_or_else(|_| DEFAULT_SECRETS_PATH.to_string());
        Self::from_sources(File::with_name(&secrets_path), Environment::default())
    }

    pub fn from_sources<P, E>(
        private: P,
        environment: E,
    ) -> error_stack::Result<Self, AppConfigError>
    where
        P: Source + Send + Sync + 'static,
        E: Source + Send + Sync + 'static,
    {
        let (config, origin) = match Config::builder().add_source(private).build() {
            Ok(config) => (config, ConfigOrigin::PrivateFile),
            Err(err) if !is_not_found(&err) => {
                return Err(Report::new(err).change_context(AppConfigError::PrivateSource));
            }
            Err(_) => {
                let config = Config::builder()
                    .add_source(environment)
                    .build()
                    .change_context(AppConfigError::Environment)?;
                (config, ConfigOrigin::Environment)
            }
        };

        let mut app_config = config
            .try_deserialize::<AppConfig>()
            .change_context(AppConfigError::Deserialize)
            .attach_printable_lazy(|| format!("Configuration origin: {:?}", origin))?;
        app_config.origin = origin;

        Ok(app_config)
    }
}

/// A missing required file surfaces as a foreign `NotFound` I/O error.
fn is_not_found(err: &ConfigError) -> bool {
    match err {
        ConfigError::Foreign(source) => source
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Environment::default().source(Some(map))
    }

    fn missing_file() -> impl Source + Send + Sync + 'static {
        File::with_name("/nonexistent/mask-report/Secrets")
    }

    #[test]
    fn test_private_file_wins_over_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Secrets.toml");
        std::fs::write(
            &path,
            r#"
spreadsheet_id = "private-sheet"
spreadsheet_mask_update_range = "Masks!A:Z"
drugstore_address_filter = "^台北市"
"#,
        )
        .unwrap();

        let config = AppConfig::from_sources(
            File::from(path),
            environment(&[("SPREADSHEET_ID", "env-sheet")]),
        )
        .unwrap();

        assert_eq!(config.origin, ConfigOrigin::PrivateFile);
        assert_eq!(config.spreadsheet_id.as_deref(), Some("private-sheet"));
        assert_eq!(config.spreadsheet_range.as_deref(), Some("Masks!A:Z"));
        assert_eq!(config.address_filter.as_deref(), Some("^台北市"));
        assert_eq!(config.dataset_url, DEFAULT_DATASET_URL);
    }

    #[test]
    fn test_falls_back_to_environment() {
        let config = AppConfig::from_sources(
            missing_file(),
            environment(&[
                ("SPREADSHEET_ID", "env-sheet"),
                ("SPREADSHEET_RANGE", "Sheet1!A1"),
                ("ADDRESS_FILTER", "^高雄市"),
                ("TOKEN_CACHE_PATH", "/tmp/token.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.origin, ConfigOrigin::Environment);
        assert_eq!(config.spreadsheet_id.as_deref(), Some("env-sheet"));
        assert_eq!(config.spreadsheet_range.as_deref(), Some("Sheet1!A1"));
        assert_eq!(config.address_filter.as_deref(), Some("^高雄市"));
        assert_eq!(config.token_cache_path, "/tmp/token.json");
        assert_eq!(config.client_secret_path, DEFAULT_CLIENT_SECRET_PATH);
    }

    #[test]
    fn test_malformed_private_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Secrets.toml");
        std::fs::write(&path, "spreadsheet_id = \"private\nthis is = = not toml").unwrap();

        let report = AppConfig::from_sources(
            File::from(path),
            environment(&[("SPREADSHEET_ID", "env-sheet")]),
        )
        .unwrap_err();

        assert!(matches!(
            report.current_context(),
            AppConfigError::PrivateSource
        ));
    }

    #[test]
    fn test_missing_values_are_none() {
        let config = AppConfig::from_sources(missing_file(), environment(&[])).unwrap();

        assert_eq!(config.spreadsheet_id, None);
        assert_eq!(config.spreadsheet_range, None);
        assert_eq!(config.address_filter, None);
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
    }
}

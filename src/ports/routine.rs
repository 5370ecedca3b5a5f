use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutineError {
    #[error("Failed to fetch mask availability")]
    Fetch,
    #[error("Failed to authenticate against the spreadsheet service")]
    Authentication,
}

/// How a run ended. Every variant is a clean exit; fatal failures are
/// reported as `RoutineError` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Appended {
        updated_range: Option<String>,
        updated_cells: i32,
    },
    SkippedConnectionReset,
    SkippedNoMatches,
    AppendFailed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Appended {
                updated_range,
                updated_cells,
            } => write!(
                f,
                "appended {} cells to {}",
                updated_cells,
                updated_range.as_deref().unwrap_or("<unknown range>")
            ),
            RunOutcome::SkippedConnectionReset => {
                write!(f, "skipped, connection reset while fetching")
            }
            RunOutcome::SkippedNoMatches => write!(f, "skipped, no pharmacy matched the filter"),
            RunOutcome::AppendFailed => write!(f, "append failed, nothing written"),
        }
    }
}

#[async_trait::async_trait]
pub trait Routine: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> error_stack::Result<RunOutcome, RoutineError>;
}

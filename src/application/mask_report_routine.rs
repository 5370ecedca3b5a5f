use std::fmt;

use error_stack::ResultExt;
use tracing::instrument;

use crate::{
    domain::{availability::AddressFilter, report_row::ReportRow},
    ports::{
        availability_source::{AvailabilitySource, FetchError},
        report_sink::{ReportSink, ReportSinkConnector},
        routine::{Routine, RoutineError, RunOutcome},
    },
};

/// Fetch, filter and append one report row.
pub struct MaskReportRoutine<S, C> {
    address_filter: Option<String>,
    source: S,
    connector: C,
}

impl<S, C> fmt::Debug for MaskReportRoutine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskReportRoutine")
            .field("address_filter", &self.address_filter)
            .finish()
    }
}

impl<S, C> MaskReportRoutine<S, C>
where
    S: AvailabilitySource,
    C: ReportSinkConnector,
{
    pub fn new(address_filter: Option<String>, source: S, connector: C) -> Self {
        Self {
            address_filter,
            source,
            connector,
        }
    }

    fn compile_filter(&self) -> error_stack::Result<Option<AddressFilter>, FetchError> {
        self.address_filter
            .as_deref()
            .map(|pattern| {
                AddressFilter::new(pattern)
                    .change_context(FetchError::InvalidFilter)
                    .attach_printable_lazy(|| format!("Address filter: {}", pattern))
            })
            .transpose()
    }
}

#[async_trait::async_trait]
impl<S, C> Routine for MaskReportRoutine<S, C>
where
    S: AvailabilitySource,
    C: ReportSinkConnector,
{
    fn name(&self) -> &str {
        "Mask Availability Report"
    }

    #[instrument(skip(self), name = "MaskReportRoutine::run")]
    async fn run(&self) -> error_stack::Result<RunOutcome, RoutineError> {
        let filter = self
            .compile_filter()
            .change_context(RoutineError::Fetch)?;

        tracing::trace!("{}: ☁️  Fetching mask availability", self.name());
        let table = match self.source.fetch(filter.as_ref()).await {
            Ok(table) => table,
            Err(report) if matches!(report.current_context(), FetchError::ConnectionReset) => {
                tracing::warn!(
                    "{}: ⚠️  Connection reset while fetching, no report this run: {:?}",
                    self.name(),
                    report
                );
                return Ok(RunOutcome::SkippedConnectionReset);
            }
            Err(report) => return Err(report.change_context(RoutineError::Fetch)),
        };
        tracing::info!("{}: 📋 {} pharmacies matched", self.name(), table.len());

        if !table.has_uniform_timestamp() {
            tracing::warn!(
                "{}: ⚠️  Matched pharmacies report different source timestamps, using the first one",
                self.name()
            );
        }

        let Some(row) = ReportRow::from_table(&table) else {
            tracing::warn!("{}: ⚠️  No pharmacy matched, nothing to report", self.name());
            return Ok(RunOutcome::SkippedNoMatches);
        };

        tracing::trace!("{}: 🔑 Connecting to the spreadsheet", self.name());
        let sink = self
            .connector
            .connect()
            .await
            .change_context(RoutineError::Authentication)?;

        tracing::trace!("{}: 📝 Appending {}", self.name(), row);
        match sink.append_row(&row).await {
            Ok(summary) => {
                tracing::info!("{}: ✅ Appended report row {}", self.name(), row);
                Ok(RunOutcome::Appended {
                    updated_range: summary.updated_range,
                    updated_cells: summary.updated_cells,
                })
            }
            Err(report) => {
                tracing::error!("{}: ❌ Failed to append report row: {:?}", self.name(), report);
                Ok(RunOutcome::AppendFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use error_stack::report;

    use super::*;
    use crate::{
        domain::availability::{tests::record, AvailabilityTable},
        ports::report_sink::{AppendSummary, AuthError, ReportSinkError},
    };

    enum SourceBehaviour {
        Table(AvailabilityTable),
        ConnectionReset,
        Broken,
    }

    struct FakeSource(SourceBehaviour);

    #[async_trait::async_trait]
    impl AvailabilitySource for FakeSource {
        async fn fetch(
            &self,
            filter: Option<&AddressFilter>,
        ) -> error_stack::Result<AvailabilityTable, FetchError> {
            match &self.0 {
                SourceBehaviour::Table(table) => Ok(table.clone().filter(filter)),
                SourceBehaviour::ConnectionReset => Err(report!(FetchError::ConnectionReset)),
                SourceBehaviour::Broken => Err(report!(FetchError::Parse)),
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeSink {
        rows: Arc<Mutex<Vec<ReportRow>>>,
        fails: bool,
    }

    #[async_trait::async_trait]
    impl ReportSink for FakeSink {
        async fn append_row(
            &self,
            row: &ReportRow,
        ) -> error_stack::Result<AppendSummary, ReportSinkError> {
            if self.fails {
                return Err(report!(ReportSinkError::AppendFailed))
                    .attach_printable("quota exceeded");
            }
            self.rows.lock().unwrap().push(row.clone());
            Ok(AppendSummary {
                updated_range: Some("Masks!A2:C2".to_string()),
                updated_cells: row.cells().len() as i32,
            })
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        sink: FakeSink,
        connects: AtomicUsize,
        auth_fails: bool,
    }

    #[async_trait::async_trait]
    impl ReportSinkConnector for FakeConnector {
        type Sink = FakeSink;

        async fn connect(&self) -> error_stack::Result<FakeSink, AuthError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.auth_fails {
                return Err(report!(AuthError::Refresh));
            }
            Ok(self.sink.clone())
        }
    }

    fn dataset() -> AvailabilityTable {
        AvailabilityTable::new(vec![
            record("台北市中正區重慶南路一段1號", 120, "2021-06-01 10:00"),
            record("高雄市前金區中正四路1號", 80, "2021-06-01 10:00"),
        ])
    }

    fn routine(
        filter: Option<&str>,
        source: SourceBehaviour,
        connector: FakeConnector,
    ) -> MaskReportRoutine<FakeSource, FakeConnector> {
        MaskReportRoutine::new(filter.map(str::to_string), FakeSource(source), connector)
    }

    #[tokio::test]
    async fn test_appends_filtered_row() {
        let routine = routine(
            Some("^台北市"),
            SourceBehaviour::Table(dataset()),
            FakeConnector::default(),
        );

        let outcome = routine.run().await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Appended {
                updated_range: Some("Masks!A2:C2".to_string()),
                updated_cells: 2,
            }
        );
        let rows = routine.connector.sink.rows.lock().unwrap().clone();
        assert_eq!(rows, vec![ReportRow::new("2021-06-01 10:00", vec![120])]);
    }

    #[tokio::test]
    async fn test_without_filter_reports_every_pharmacy() {
        let routine = routine(
            None,
            SourceBehaviour::Table(dataset()),
            FakeConnector::default(),
        );

        routine.run().await.unwrap();

        let rows = routine.connector.sink.rows.lock().unwrap().clone();
        assert_eq!(
            rows,
            vec![ReportRow::new("2021-06-01 10:00", vec![120, 80])]
        );
    }

    #[tokio::test]
    async fn test_running_twice_appends_twice() {
        let routine = routine(
            Some("^台北市"),
            SourceBehaviour::Table(dataset()),
            FakeConnector::default(),
        );

        routine.run().await.unwrap();
        routine.run().await.unwrap();

        assert_eq!(routine.connector.sink.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connection_reset_ends_run_without_append() {
        let routine = routine(
            Some("^台北市"),
            SourceBehaviour::ConnectionReset,
            FakeConnector::default(),
        );

        let outcome = routine.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::SkippedConnectionReset);
        assert_eq!(routine.connector.connects.load(Ordering::SeqCst), 0);
        assert!(routine.connector.sink.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_fetch_errors_are_fatal() {
        let routine = routine(None, SourceBehaviour::Broken, FakeConnector::default());

        let report = routine.run().await.unwrap_err();

        assert!(matches!(report.current_context(), RoutineError::Fetch));
        assert_eq!(routine.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_fatal() {
        let routine = routine(
            Some("台北市("),
            SourceBehaviour::Table(dataset()),
            FakeConnector::default(),
        );

        let report = routine.run().await.unwrap_err();

        assert!(matches!(report.current_context(), RoutineError::Fetch));
        assert!(report
            .frames()
            .any(|frame| matches!(frame.downcast_ref::<FetchError>(), Some(FetchError::InvalidFilter))));
    }

    #[tokio::test]
    async fn test_no_matches_skips_authentication() {
        let routine = routine(
            Some("^花蓮縣"),
            SourceBehaviour::Table(dataset()),
            FakeConnector::default(),
        );

        let outcome = routine.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::SkippedNoMatches);
        assert_eq!(routine.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let connector = FakeConnector {
            sink: FakeSink {
                fails: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let routine = routine(None, SourceBehaviour::Table(dataset()), connector);

        let outcome = routine.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::AppendFailed);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_fatal() {
        let connector = FakeConnector {
            auth_fails: true,
            ..Default::default()
        };
        let routine = routine(None, SourceBehaviour::Table(dataset()), connector);

        let report = routine.run().await.unwrap_err();

        assert!(matches!(
            report.current_context(),
            RoutineError::Authentication
        ));
    }
}

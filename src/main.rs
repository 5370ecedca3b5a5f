use mask_report::{
    adapters::{
        config::app_config::AppConfig, mask_data::nhi_dataset::NhiMaskDataset,
        sheets::connector::SheetsConnector,
    },
    application::mask_report_routine::MaskReportRoutine,
    ports::routine::Routine,
    prettyprint::prettyprint::PrettyFormatter,
};
use tracing::{error, info, instrument, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|report| format!("{report:?}"))?;

    setup_tracing(&config.log_file)?;
    setup_panic_hook();

    info!(
        "Starting mask-report (configuration from {:?})",
        config.origin
    );

    let routine = MaskReportRoutine::new(
        config.address_filter.clone(),
        NhiMaskDataset::new(config.dataset_url.clone()),
        SheetsConnector::from_config(&config),
    );

    let result = routine
        .run()
        .instrument(tracing::span!(
            tracing::Level::INFO,
            "routine",
            routine = routine.name()
        ))
        .await;

    match result {
        Ok(outcome) => {
            info!("✅ {}: {}", routine.name(), outcome);
            Ok(())
        }
        Err(report) => {
            error!("❌ {}: {:?}", routine.name(), report);
            Err(format!("{report:?}").into())
        }
    }
}

fn setup_tracing(log_file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(true))
        .with_writer(std::io::stderr);

    let log_file_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(false))
        .with_writer(std::sync::Mutex::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?,
        ))
        .with_ansi(false);

    Registry::default()
        .with(
            tracing_subscriber::filter::Targets::new()
                .with_target("mask_report", tracing::Level::TRACE),
        )
        .with(log_file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

fn setup_panic_hook() {
    tracing::trace!("Setting panic hook");
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));
}

use error_stack::{Report, ResultExt};
use tracing::instrument;

use crate::{
    domain::availability::{AddressFilter, AvailabilityTable, PharmacyRecord},
    ports::availability_source::{AvailabilitySource, FetchError},
};

/// The NHI "口罩實名制" pharmacy stock CSV.
pub struct NhiMaskDataset {
    client: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for NhiMaskDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NhiMaskDataset {{ url: {:?} }}", self.url)
    }
}

impl NhiMaskDataset {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    #[instrument]
    async fn download(&self) -> error_stack::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(request_error)?;

        let body = response.bytes().await.map_err(request_error)?;
        tracing::trace!("Downloaded {} bytes", body.len());

        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl AvailabilitySource for NhiMaskDataset {
    #[instrument(skip(self, filter))]
    async fn fetch(
        &self,
        filter: Option<&AddressFilter>,
    ) -> error_stack::Result<AvailabilityTable, FetchError> {
        let body = self.download().await?;
        let table = parse_availability(&body)?;
        tracing::trace!(
            "Parsed {} pharmacies, filter: {:?}",
            table.len(),
            filter.map(AddressFilter::pattern)
        );

        Ok(table.filter(filter))
    }
}

/// Parses the UTF-8 CSV body. Headers are required and trimmed; field values
/// are kept verbatim so the address filter sees the published address.
pub fn parse_availability(body: &[u8]) -> error_stack::Result<AvailabilityTable, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(body);

    let records = reader
        .deserialize::<PharmacyRecord>()
        .enumerate()
        .map(|(index, record)| {
            record
                .change_context(FetchError::Parse)
                .attach_printable_lazy(|| format!("Malformed record #{}", index + 1))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AvailabilityTable::new(records))
}

fn request_error(err: reqwest::Error) -> Report<FetchError> {
    let context = if is_connection_reset(&err) {
        FetchError::ConnectionReset
    } else {
        FetchError::Request
    };
    Report::new(err).change_context(context)
}

/// Walks the source chain looking for an I/O connection reset.
pub fn is_connection_reset(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            if io_err.kind() == std::io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        current = err.source();
    }
    false
}

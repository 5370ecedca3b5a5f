use thiserror::Error;

use crate::domain::availability::{AddressFilter, AvailabilityTable};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Connection reset while fetching the mask dataset")]
    ConnectionReset,
    #[error("Failed to request the mask dataset")]
    Request,
    #[error("Failed to parse the mask dataset")]
    Parse,
    #[error("Invalid address filter")]
    InvalidFilter,
}

#[async_trait::async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Downloads the dataset and keeps the records matching `filter`, or all of
    /// them when there is no filter.
    async fn fetch(
        &self,
        filter: Option<&AddressFilter>,
    ) -> error_stack::Result<AvailabilityTable, FetchError>;
}

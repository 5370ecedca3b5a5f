pub mod availability_source;
pub mod credentials;
pub mod report_sink;
pub mod routine;

pub mod availability;
pub mod credential;
pub mod report_row;

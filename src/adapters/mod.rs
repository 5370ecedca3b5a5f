pub mod config;
pub mod mask_data;
pub mod sheets;

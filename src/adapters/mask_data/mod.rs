pub mod nhi_dataset;

pub mod authenticate;
pub mod mask_report_routine;

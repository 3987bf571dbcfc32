#![deny(dead_code)]
#![deny(unused_imports)]
pub mod analysis;
pub mod bundle;
pub mod catalog;
pub mod chart;
pub mod forest;
pub mod insights;
pub mod predict;
pub mod report;
pub mod types;
pub mod uncertainty;

pub mod chart;
pub mod conversation;
pub mod dataset;
pub mod kpi;

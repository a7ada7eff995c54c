//! Sales and customer analytics core: filter criteria, the filter engine, the
//! aggregator and the analysis service that feeds them from a record source.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod matrix;
pub mod mock;
pub mod models;
pub mod report;
pub mod service;
pub mod source;

pub use error::{DashboardError, Result};
pub use models::{
    ChartData, ChartPoint, CustomerRecord, FilterCriteria, FilterOptions, Metrics,
    SalesRecord, SatisfactionTier,
};
pub use service::AnalysisService;

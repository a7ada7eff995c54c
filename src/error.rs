#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),
}

impl DashboardError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        DashboardError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

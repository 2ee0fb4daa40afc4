use crate::common::error::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThreatIntelError {
    #[error("missing or unresolvable parameter '{param}'")]
    InvalidInput { param: String },

    #[error("lookup failed for domain '{domain}': {reason}")]
    ProviderFault { domain: String, reason: String },
}

impl From<ThreatIntelError> for DomainError {
    fn from(e: ThreatIntelError) -> Self {
        match e {
            ThreatIntelError::InvalidInput { param } => {
                DomainError::InvalidArgument(format!("missing or unresolvable parameter '{param}'"))
            }
            ThreatIntelError::ProviderFault { domain, reason } => {
                DomainError::ProviderError(format!("lookup failed for '{domain}': {reason}"))
            }
        }
    }
}

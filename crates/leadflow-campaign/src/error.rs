use thiserror::Error;

use crate::state::CampaignStatus;

/// Errors returned synchronously by operator controls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CampaignError {
    #[error("campaign message is empty")]
    EmptyMessage,

    #[error("no recipients selected for the campaign")]
    NoRecipients,

    #[error("cannot {op} a campaign that is {from}")]
    InvalidTransition { op: &'static str, from: CampaignStatus },
}

impl CampaignError {
    /// Input problems the operator can fix, as opposed to state conflicts.
    pub fn is_validation(&self) -> bool {
        matches!(self, CampaignError::EmptyMessage | CampaignError::NoRecipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CampaignError::InvalidTransition {
            op: "pause",
            from: CampaignStatus::Idle,
        };
        assert_eq!(err.to_string(), "cannot pause a campaign that is idle");
        assert!(!err.is_validation());
        assert!(CampaignError::EmptyMessage.is_validation());
    }
}

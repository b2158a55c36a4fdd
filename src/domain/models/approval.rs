//! Validation approval policy.

use serde::{Deserialize, Serialize};

use super::phase_output::MigrationSummary;

/// Decides the validation response from the migration outcome when the
/// operator gives no explicit answer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Approve when at least one CID migrated.
    #[default]
    AnySuccessful,
    /// Approve only when every CID migrated (and there was at least one).
    AllSuccessful,
    /// Approve when the success rate reaches `percent`.
    MinSuccessRate { percent: f64 },
}

impl ApprovalPolicy {
    pub fn approves(&self, summary: &MigrationSummary) -> bool {
        match self {
            Self::AnySuccessful => summary.successful > 0,
            Self::AllSuccessful => summary.total > 0 && summary.failed == 0,
            Self::MinSuccessRate { percent } => summary.total > 0 && summary.success_rate >= *percent,
        }
    }

    /// Settle the decision: an explicit operator answer always wins.
    pub fn decide(&self, explicit: Option<bool>, summary: &MigrationSummary) -> bool {
        explicit.unwrap_or_else(|| self.approves(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_successful() {
        let policy = ApprovalPolicy::AnySuccessful;
        assert!(policy.approves(&MigrationSummary::from_counts(5, 1)));
        assert!(!policy.approves(&MigrationSummary::from_counts(5, 0)));
        assert!(!policy.approves(&MigrationSummary::from_counts(0, 0)));
    }

    #[test]
    fn test_all_successful() {
        let policy = ApprovalPolicy::AllSuccessful;
        assert!(policy.approves(&MigrationSummary::from_counts(3, 3)));
        assert!(!policy.approves(&MigrationSummary::from_counts(3, 2)));
        assert!(!policy.approves(&MigrationSummary::from_counts(0, 0)));
    }

    #[test]
    fn test_min_success_rate() {
        let policy = ApprovalPolicy::MinSuccessRate { percent: 75.0 };
        assert!(policy.approves(&MigrationSummary::from_counts(4, 3)));
        assert!(!policy.approves(&MigrationSummary::from_counts(4, 2)));
    }

    #[test]
    fn test_explicit_answer_wins() {
        let policy = ApprovalPolicy::AnySuccessful;
        let none_migrated = MigrationSummary::from_counts(2, 0);
        assert!(policy.decide(Some(true), &none_migrated));
        assert!(!policy.decide(Some(false), &MigrationSummary::from_counts(2, 2)));
        assert!(!policy.decide(None, &none_migrated));
    }

    #[test]
    fn test_policy_yaml_shape() {
        let policy: ApprovalPolicy =
            serde_yaml::from_str("rule: min_success_rate\npercent: 90\n").unwrap();
        assert_eq!(policy, ApprovalPolicy::MinSuccessRate { percent: 90.0 });
        let default: ApprovalPolicy = serde_yaml::from_str("rule: any_successful\n").unwrap();
        assert_eq!(default, ApprovalPolicy::AnySuccessful);
    }
}

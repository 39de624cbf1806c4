//! Withdrawal requests: notification only.
//!
//! A request is gated on the active plan's minimum but debits nothing:
//! pending earnings are unchanged and no ledger exists.

use crate::{
    config::CatalogConfig,
    eligibility::active_plan,
    error::{SurveyError, SurveyResult},
    progress::UserProgress,
    types::{Amount, PlanName},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalNotice {
    pub plan:           PlanName,
    pub pending:        Amount,
    pub minimum:        Amount,
    pub referral_code:  String,
}

/// Receives accepted withdrawal requests.
pub trait WithdrawalNotifier {
    fn notify(&self, notice: &WithdrawalNotice);
}

/// Default notifier: writes the request to the log.
pub struct LogNotifier;

impl WithdrawalNotifier for LogNotifier {
    fn notify(&self, notice: &WithdrawalNotice) {
        log::info!(
            "withdrawal: request for {:.2} on plan {} ({})",
            notice.pending,
            notice.plan,
            notice.referral_code
        );
    }
}

pub fn prepare_withdrawal(progress: &UserProgress, catalog: &CatalogConfig) -> SurveyResult<WithdrawalNotice> {
    let plan = active_plan(progress, catalog).ok_or(SurveyError::NoActivePlan)?;
    if progress.pending_earnings < plan.minimum_withdrawal {
        return Err(SurveyError::BelowWithdrawalMinimum {
            pending: progress.pending_earnings,
            minimum: plan.minimum_withdrawal,
        });
    }
    Ok(WithdrawalNotice {
        plan:          plan.plan_name.clone(),
        pending:       progress.pending_earnings,
        minimum:       plan.minimum_withdrawal,
        referral_code: progress.referrals.referral_code.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_is_inclusive_at_minimum() {
        let catalog = CatalogConfig::default_test();
        let mut p = UserProgress::seeded(&catalog.default_progress);
        p.current_plan = "Gold".into();
        p.total_earnings = 800.0;
        p.pending_earnings = 800.0;

        let notice = prepare_withdrawal(&p, &catalog).unwrap();
        assert_eq!(notice.minimum, 800.0);
        assert_eq!(notice.pending, 800.0);

        p.pending_earnings = 799.0;
        assert!(matches!(
            prepare_withdrawal(&p, &catalog),
            Err(SurveyError::BelowWithdrawalMinimum { .. })
        ));
    }

    #[test]
    fn no_plan_means_no_withdrawal() {
        let catalog = CatalogConfig::default_test();
        let p = UserProgress::seeded(&catalog.default_progress);
        assert!(matches!(prepare_withdrawal(&p, &catalog), Err(SurveyError::NoActivePlan)));
    }
}

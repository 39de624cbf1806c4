//! Progress store: the single mutable user-progress record.
//!
//! RULE: The record is replaced wholesale, never patched field by field.
//! Every replacement is saved first and swapped into memory second,
//! so a failed save leaves both copies at the previous revision.

use crate::{
    config::CatalogConfig,
    error::SurveyResult,
    event::ProgressEvent,
    store::SurveyStore,
    types::{Amount, Day, PlanName, SurveyId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRecord {
    pub total_referrals:   u32,
    pub referral_earnings: Amount,
    pub referral_code:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub current_plan:            PlanName,
    pub surveys_completed_today: u32,
    pub total_earnings:          Amount,
    pub pending_earnings:        Amount,
    /// Completion order. Repeats are allowed.
    pub completed_surveys:       Vec<SurveyId>,
    pub referrals:               ReferralRecord,
    /// Day the quota counter belongs to. None until a caller supplies one.
    #[serde(default)]
    pub day_window:              Option<Day>,
}

impl UserProgress {
    /// Fresh record from the catalog's bundled default: keeps the default
    /// plan, zeroes every counter, and issues a new referral code.
    pub fn seeded(default: &UserProgress) -> Self {
        Self {
            current_plan:            default.current_plan.clone(),
            surveys_completed_today: 0,
            total_earnings:          0.0,
            pending_earnings:        0.0,
            completed_surveys:       Vec::new(),
            referrals:               ReferralRecord {
                total_referrals:   0,
                referral_earnings: 0.0,
                referral_code:     generate_referral_code(),
            },
            day_window:              None,
        }
    }

    /// The record as it should look on `day`, or None if nothing changes.
    /// A different day zeroes the quota counter; the first day seen only
    /// stamps the window.
    pub fn rolled_to(&self, day: Day) -> Option<Self> {
        match self.day_window {
            Some(current) if current == day => None,
            Some(_) => Some(Self {
                surveys_completed_today: 0,
                day_window: Some(day),
                ..self.clone()
            }),
            None => Some(Self {
                day_window: Some(day),
                ..self.clone()
            }),
        }
    }

    pub fn times_completed(&self, survey_id: &str) -> usize {
        self.completed_surveys.iter().filter(|id| *id == survey_id).count()
    }
}

fn generate_referral_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("REF{}", raw[..8].to_uppercase())
}

/// Holds the current progress value and its revision counter.
#[derive(Debug)]
pub struct ProgressStore {
    current:  UserProgress,
    revision: u64,
}

impl ProgressStore {
    /// Restore the persisted snapshot, or seed and persist a default.
    pub fn load(store: &SurveyStore, catalog: &CatalogConfig) -> SurveyResult<Self> {
        if let Some((progress, revision)) = store.load_progress()? {
            log::info!(
                "progress: restored revision {revision} (plan={}, completed={})",
                progress.current_plan,
                progress.completed_surveys.len()
            );
            return Ok(Self { current: progress, revision });
        }

        let seeded = UserProgress::seeded(&catalog.default_progress);
        let seeded_event = ProgressEvent::ProgressSeeded {
            plan:          seeded.current_plan.clone(),
            referral_code: seeded.referrals.referral_code.clone(),
        };
        let mut this = Self { current: seeded.clone(), revision: 0 };
        this.commit(store, seeded, &seeded_event)?;
        log::info!("progress: seeded default (plan={})", this.current.current_plan);
        Ok(this)
    }

    pub fn current(&self) -> &UserProgress {
        &self.current
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Persist `next` together with `event`, then make it current.
    /// Returns the new revision. On error nothing changes, in memory or on disk.
    pub fn commit(
        &mut self,
        store: &SurveyStore,
        next: UserProgress,
        event: &ProgressEvent,
    ) -> SurveyResult<u64> {
        let revision = self.revision + 1;
        store.commit_progress(&next, revision, event)?;
        self.current = next;
        self.revision = revision;
        log::debug!("progress: committed revision {revision}");
        Ok(revision)
    }

    /// Move the quota window to `day`. Returns true if the counter was reset.
    pub fn enter_day(&mut self, store: &SurveyStore, day: Day) -> SurveyResult<bool> {
        let Some(next) = self.current.rolled_to(day) else {
            return Ok(false);
        };
        let from = self.current.day_window;
        let reset_count = from.is_some();
        let previous_count = self.current.surveys_completed_today;
        self.commit(store, next, &ProgressEvent::DayRolledOver { from, to: day, previous_count })?;
        if reset_count {
            log::info!("day={day} progress: quota window reset (was {previous_count})");
        }
        Ok(reset_count)
    }
}

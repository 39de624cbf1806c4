//! The survey session: what the view layer talks to.
//!
//! Owns the catalog store, the progress store, the SQLite store and the
//! deferred-completion scheduler. Single writer: every mutation goes
//! through &mut self, so no two transactions ever interleave.
//!
//! Pending completions survive teardown_view() unless
//! SessionOptions::cancel_on_teardown is set.

use crate::{
    catalog::CatalogStore,
    completion::{self, AnswerSheet, CompletionReceipt},
    config::{CatalogConfig, CatalogSource, PlanTier, SessionOptions, SurveyDefinition},
    eligibility,
    error::{SurveyError, SurveyResult},
    event::ProgressEvent,
    progress::{ProgressStore, ReferralRecord, UserProgress},
    rng::SessionRng,
    scheduler::{CompletionScheduler, ScheduledCompletion, TaskHandle},
    store::SurveyStore,
    types::{Day, Millis},
    withdrawal::{self, LogNotifier, WithdrawalNotice, WithdrawalNotifier},
};

/// Result of one deferred completion firing.
#[derive(Debug)]
pub struct DeferredOutcome {
    pub task:   ScheduledCompletion,
    pub result: SurveyResult<CompletionReceipt>,
}

pub struct SurveySession {
    catalog:   CatalogStore,
    progress:  Option<ProgressStore>,
    store:     SurveyStore,
    scheduler: CompletionScheduler,
    rng:       SessionRng,
    options:   SessionOptions,
    notifier:  Box<dyn WithdrawalNotifier>,
}

impl SurveySession {
    /// Load the catalog from `source`, then progress from `store`.
    /// A failed catalog is not an error here: the session opens in the
    /// unavailable state and every query reports SourceUnavailable.
    pub fn open(
        store: SurveyStore,
        source: &dyn CatalogSource,
        options: SessionOptions,
    ) -> SurveyResult<Self> {
        let mut catalog = CatalogStore::new();
        if catalog.load(source).is_err() {
            log::warn!("session: catalog unavailable, progress not loaded");
        }
        Self::with_catalog(store, catalog, options)
    }

    pub fn with_catalog(
        store: SurveyStore,
        catalog: CatalogStore,
        options: SessionOptions,
    ) -> SurveyResult<Self> {
        let progress = match catalog.get() {
            Ok(config) => Some(ProgressStore::load(&store, config)?),
            Err(_) => None,
        };
        Ok(Self {
            catalog,
            progress,
            store,
            scheduler: CompletionScheduler::new(),
            rng: SessionRng::new(options.seed),
            options,
            notifier: Box::new(LogNotifier),
        })
    }

    pub fn with_notifier(mut self, notifier: Box<dyn WithdrawalNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // ── Readiness ──────────────────────────────────────────────

    pub fn catalog_ready(&self) -> bool {
        self.catalog.is_ready()
    }

    pub fn progress_ready(&self) -> bool {
        self.progress.is_some()
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn catalog(&self) -> SurveyResult<&CatalogConfig> {
        self.catalog.get()
    }

    pub fn progress(&self) -> SurveyResult<&UserProgress> {
        self.progress_store().map(|p| p.current())
    }

    pub fn revision(&self) -> SurveyResult<u64> {
        self.progress_store().map(|p| p.revision())
    }

    pub fn store(&self) -> &SurveyStore {
        &self.store
    }

    pub fn active_plan(&self) -> SurveyResult<Option<&PlanTier>> {
        let catalog = self.catalog.get()?;
        Ok(eligibility::active_plan(self.progress()?, catalog))
    }

    pub fn available_surveys(&self) -> SurveyResult<Vec<&SurveyDefinition>> {
        let catalog = self.catalog.get()?;
        Ok(eligibility::available_surveys_with(
            self.progress()?,
            catalog,
            self.options.history_policy,
        ))
    }

    pub fn can_start(&self) -> SurveyResult<bool> {
        Ok(eligibility::can_start(self.progress()?, self.catalog.get()?))
    }

    pub fn remaining_quota(&self) -> SurveyResult<u32> {
        Ok(eligibility::remaining_quota(self.progress()?, self.catalog.get()?))
    }

    pub fn withdrawal_ready(&self) -> SurveyResult<bool> {
        Ok(eligibility::withdrawal_ready(self.progress()?, self.catalog.get()?))
    }

    pub fn referral_summary(&self) -> SurveyResult<&ReferralRecord> {
        self.progress().map(|p| &p.referrals)
    }

    pub fn pending_completions(&self) -> &[ScheduledCompletion] {
        self.scheduler.pending()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.scheduler.next_due()
    }

    // ── Mutations ──────────────────────────────────────────────

    /// Complete `survey_id` now.
    pub fn complete(&mut self, survey_id: &str) -> SurveyResult<CompletionReceipt> {
        let (catalog, progress) = ready(&self.catalog, &mut self.progress)?;
        completion::run(progress, &self.store, catalog, survey_id, None)
    }

    /// Complete `survey_id` with answers; every question must be answered.
    pub fn submit(&mut self, survey_id: &str, answers: &AnswerSheet) -> SurveyResult<CompletionReceipt> {
        let (catalog, progress) = ready(&self.catalog, &mut self.progress)?;
        completion::run(progress, &self.store, catalog, survey_id, Some(answers))
    }

    /// Check the preconditions as of `now` and schedule the completion
    /// after a random delay. The transaction re-checks when it fires.
    pub fn start_survey(&mut self, survey_id: &str, now: Millis) -> SurveyResult<ScheduledCompletion> {
        let (catalog, progress) = ready(&self.catalog, &mut self.progress)?;
        if let Err(e) = completion::check_preconditions(progress.current(), catalog, survey_id) {
            log::warn!("session: start of {survey_id} refused: {e}");
            return Err(e);
        }

        let delay = self
            .rng
            .delay_between(self.options.min_completion_delay, self.options.max_completion_delay);
        let handle = self.scheduler.schedule(survey_id, now, delay);
        let due_at = now.saturating_add(delay);

        let logged = self.store.append_event(
            progress.revision(),
            &ProgressEvent::CompletionScheduled {
                task_id:   handle.0,
                survey_id: survey_id.to_string(),
                due_at,
            },
        );
        if let Err(e) = logged {
            self.scheduler.cancel(handle);
            log::warn!("session: start of {survey_id} dropped, event not recorded: {e}");
            return Err(e);
        }
        log::debug!("session: {survey_id} scheduled as task {} due at {due_at}", handle.0);

        Ok(ScheduledCompletion {
            handle,
            survey_id: survey_id.to_string(),
            scheduled_at: now,
            due_at,
        })
    }

    /// Fire every completion due at `now`, in due order. One failing task
    /// never stops the others.
    pub fn poll(&mut self, now: Millis) -> SurveyResult<Vec<DeferredOutcome>> {
        let due = self.scheduler.due(now);
        if due.is_empty() {
            return Ok(Vec::new());
        }
        let (catalog, progress) = ready(&self.catalog, &mut self.progress)?;

        let outcomes = due
            .into_iter()
            .map(|task| {
                let result =
                    completion::run(&mut *progress, &self.store, catalog, &task.survey_id, None);
                DeferredOutcome { task, result }
            })
            .collect();
        Ok(outcomes)
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> SurveyResult<bool> {
        match self.scheduler.cancel(handle) {
            Some(task) => {
                self.record_cancelled(&task)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The view is going away. Returns the tasks that were cancelled.
    pub fn teardown_view(&mut self) -> SurveyResult<Vec<ScheduledCompletion>> {
        if !self.options.cancel_on_teardown {
            return Ok(Vec::new());
        }
        let cancelled = self.scheduler.cancel_all();
        for task in &cancelled {
            self.record_cancelled(task)?;
        }
        Ok(cancelled)
    }

    /// Move the quota window to `day`. Returns true if the counter was reset.
    pub fn enter_day(&mut self, day: Day) -> SurveyResult<bool> {
        let (_, progress) = ready(&self.catalog, &mut self.progress)?;
        progress.enter_day(&self.store, day)
    }

    /// Notify the withdrawal hook if pending earnings reach the plan minimum.
    /// Nothing is debited.
    pub fn request_withdrawal(&mut self) -> SurveyResult<WithdrawalNotice> {
        let (catalog, progress) = ready(&self.catalog, &mut self.progress)?;
        let notice = match withdrawal::prepare_withdrawal(progress.current(), catalog) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("withdrawal: refused: {e}");
                return Err(e);
            }
        };
        self.store.append_event(
            progress.revision(),
            &ProgressEvent::WithdrawalRequested {
                plan:    notice.plan.clone(),
                pending: notice.pending,
                minimum: notice.minimum,
            },
        )?;
        self.notifier.notify(&notice);
        Ok(notice)
    }

    fn progress_store(&self) -> SurveyResult<&ProgressStore> {
        self.catalog.get()?;
        self.progress.as_ref().ok_or(SurveyError::CatalogNotReady)
    }

    fn record_cancelled(&self, task: &ScheduledCompletion) -> SurveyResult<()> {
        let revision = self.progress.as_ref().map(|p| p.revision()).unwrap_or(0);
        self.store.append_event(
            revision,
            &ProgressEvent::CompletionCancelled {
                task_id:   task.handle.0,
                survey_id: task.survey_id.clone(),
            },
        )?;
        log::debug!("session: task {} for {} cancelled", task.handle.0, task.survey_id);
        Ok(())
    }
}

fn ready<'a>(
    catalog: &'a CatalogStore,
    progress: &'a mut Option<ProgressStore>,
) -> SurveyResult<(&'a CatalogConfig, &'a mut ProgressStore)> {
    let config = catalog.get()?;
    let progress = progress.as_mut().ok_or(SurveyError::CatalogNotReady)?;
    Ok((config, progress))
}

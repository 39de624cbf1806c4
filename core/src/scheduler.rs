//! Deferred completions.
//!
//! Starting a survey schedules its completion for later. The task only
//! carries the survey id; the full transaction re-runs when it fires, so
//! overlapping tasks resolve in firing order, not starting order.
//!
//! Time is the caller's logical clock: nothing fires unless due(now) is called.

use crate::types::{Millis, SurveyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCompletion {
    pub handle:       TaskHandle,
    pub survey_id:    SurveyId,
    pub scheduled_at: Millis,
    pub due_at:       Millis,
}

#[derive(Debug, Default)]
pub struct CompletionScheduler {
    next_id: u64,
    /// Kept sorted by (due_at, handle); handles grow with scheduling order.
    pending: Vec<ScheduledCompletion>,
}

impl CompletionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, survey_id: &str, now: Millis, delay: Millis) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        let task = ScheduledCompletion {
            handle,
            survey_id:    survey_id.to_string(),
            scheduled_at: now,
            due_at:       now.saturating_add(delay),
        };
        let pos = self
            .pending
            .partition_point(|t| (t.due_at, t.handle) <= (task.due_at, task.handle));
        self.pending.insert(pos, task);
        handle
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> Option<ScheduledCompletion> {
        let pos = self.pending.iter().position(|t| t.handle == handle)?;
        Some(self.pending.remove(pos))
    }

    /// Cancel every pending task for `survey_id`.
    pub fn cancel_survey(&mut self, survey_id: &str) -> Vec<ScheduledCompletion> {
        let (cancelled, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.survey_id == survey_id);
        self.pending = kept;
        cancelled
    }

    pub fn cancel_all(&mut self) -> Vec<ScheduledCompletion> {
        std::mem::take(&mut self.pending)
    }

    /// Remove and return every task due at or before `now`, in firing order.
    pub fn due(&mut self, now: Millis) -> Vec<ScheduledCompletion> {
        let split = self.pending.partition_point(|t| t.due_at <= now);
        self.pending.drain(..split).collect()
    }

    pub fn pending(&self) -> &[ScheduledCompletion] {
        &self.pending
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.pending.first().map(|t| t.due_at)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

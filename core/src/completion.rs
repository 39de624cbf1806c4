//! Completion transaction: the one path that earns rewards.
//!
//! Preconditions, checked in this order:
//!   1. an active plan exists          → NoActivePlan
//!   2. the survey id is in the catalog → UnknownSurvey
//!   3. today's count is under quota    → QuotaExceeded
//! Submissions with an answer sheet are then checked for completeness.
//!
//! On success the whole record is replaced at once:
//!   surveys_completed_today += 1
//!   total_earnings          += reward
//!   pending_earnings        += reward
//!   completed_surveys       += [survey_id]

use crate::{
    config::{CatalogConfig, PlanTier, QuestionKind, SurveyDefinition},
    eligibility::{active_plan, remaining_quota},
    error::{SurveyError, SurveyResult},
    event::ProgressEvent,
    progress::{ProgressStore, UserProgress},
    store::SurveyStore,
    types::{Amount, SurveyId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answers keyed by question index.
pub type AnswerSheet = BTreeMap<usize, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: usize,
    /// Questions that carry a correct answer.
    pub scored:  usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub survey_id:               SurveyId,
    pub reward:                  Amount,
    pub surveys_completed_today: u32,
    pub remaining_quota:         u32,
    pub revision:                u64,
    pub score:                   Option<Score>,
}

/// Resolve plan and survey and check the quota, in precondition order.
pub fn check_preconditions<'a>(
    progress: &UserProgress,
    catalog: &'a CatalogConfig,
    survey_id: &str,
) -> SurveyResult<(&'a PlanTier, &'a SurveyDefinition)> {
    let plan = active_plan(progress, catalog).ok_or(SurveyError::NoActivePlan)?;

    let survey = catalog
        .survey(survey_id)
        .ok_or_else(|| SurveyError::UnknownSurvey { survey_id: survey_id.to_string() })?;

    if progress.surveys_completed_today >= plan.daily_survey {
        return Err(SurveyError::QuotaExceeded {
            plan:        plan.plan_name.clone(),
            daily_quota: plan.daily_survey,
        });
    }

    Ok((plan, survey))
}

/// The next progress value after completing `survey_id`. Pure.
pub fn complete(
    progress: &UserProgress,
    catalog: &CatalogConfig,
    survey_id: &str,
) -> SurveyResult<UserProgress> {
    let (_, survey) = check_preconditions(progress, catalog, survey_id)?;
    Ok(apply_reward(progress, survey))
}

fn apply_reward(progress: &UserProgress, survey: &SurveyDefinition) -> UserProgress {
    let mut completed_surveys = progress.completed_surveys.clone();
    completed_surveys.push(survey.id.clone());

    UserProgress {
        surveys_completed_today: progress.surveys_completed_today + 1,
        total_earnings:          progress.total_earnings + survey.reward,
        pending_earnings:        progress.pending_earnings + survey.reward,
        completed_surveys,
        ..progress.clone()
    }
}

/// Every question answered, and every single-choice answer one of its choices.
/// Returns the score over questions that have a correct answer.
pub fn validate_answers(survey: &SurveyDefinition, answers: &AnswerSheet) -> SurveyResult<Option<Score>> {
    if survey.questions.is_empty() {
        return Ok(None);
    }

    let answered = (0..survey.questions.len())
        .filter(|i| answers.get(i).is_some_and(|a| !a.trim().is_empty()))
        .count();
    if answered != survey.questions.len() {
        return Err(SurveyError::IncompleteAnswers {
            survey_id: survey.id.clone(),
            answered,
            expected:  survey.questions.len(),
        });
    }

    let mut score = Score { correct: 0, scored: 0 };
    for (i, q) in survey.questions.iter().enumerate() {
        let answer = answers.get(&i).map(|a| a.trim()).unwrap_or_default();

        if q.kind == QuestionKind::SingleChoice && !q.choices.iter().any(|c| c == answer) {
            return Err(SurveyError::InvalidChoice {
                survey_id:   survey.id.clone(),
                question_id: q.id.clone(),
                answer:      answer.to_string(),
            });
        }

        if let Some(correct) = &q.correct_answer {
            score.scored += 1;
            if correct == answer {
                score.correct += 1;
            }
        }
    }

    Ok((score.scored > 0).then_some(score))
}

/// Run the full transaction: validate, persist with its event, swap.
/// A rejection is logged and recorded but leaves progress untouched.
/// Any error means the reward was not credited.
pub fn run(
    progress: &mut ProgressStore,
    store: &SurveyStore,
    catalog: &CatalogConfig,
    survey_id: &str,
    answers: Option<&AnswerSheet>,
) -> SurveyResult<CompletionReceipt> {
    match prepare(progress.current(), catalog, survey_id, answers) {
        Ok((next, reward, score)) => {
            let completed = ProgressEvent::SurveyCompleted {
                survey_id:               survey_id.to_string(),
                reward,
                surveys_completed_today: next.surveys_completed_today,
                total_earnings:          next.total_earnings,
            };
            let revision = progress.commit(store, next, &completed)?;
            let current = progress.current();
            log::info!(
                "completion: {survey_id} earned {reward:.2} (today={}, total={:.2})",
                current.surveys_completed_today,
                current.total_earnings
            );
            Ok(CompletionReceipt {
                survey_id: survey_id.to_string(),
                reward,
                surveys_completed_today: current.surveys_completed_today,
                remaining_quota: remaining_quota(current, catalog),
                revision,
                score,
            })
        }
        Err(e) if e.is_rejection() => {
            log::warn!("completion: {survey_id} rejected: {e}");
            store.append_event(
                progress.revision(),
                &ProgressEvent::CompletionRejected {
                    survey_id: survey_id.to_string(),
                    reason:    e.code().to_string(),
                },
            )?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn prepare(
    progress: &UserProgress,
    catalog: &CatalogConfig,
    survey_id: &str,
    answers: Option<&AnswerSheet>,
) -> SurveyResult<(UserProgress, Amount, Option<Score>)> {
    let (_, survey) = check_preconditions(progress, catalog, survey_id)?;
    let score = match answers {
        Some(sheet) => validate_answers(survey, sheet)?,
        None => None,
    };
    Ok((apply_reward(progress, survey), survey.reward, score))
}

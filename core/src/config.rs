//! Catalog documents and their on-disk loaders.
//!
//! Two independent JSON documents make up the catalog:
//!   {data_dir}/plans/plan.json     : plan tiers + payment destination
//!   {data_dir}/surveys/survey.json : survey definitions + default progress
//!
//! In tests, use CatalogConfig::default_test().

use crate::{
    progress::{ReferralRecord, UserProgress},
    types::{Amount, PlanName, SurveyId, NO_PLAN},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTier {
    pub plan_name:          PlanName,
    pub daily_survey:       u32,
    pub earning_per_survey: Amount,
    /// Display-only projections.
    pub daily_income:       Amount,
    pub monthly_income:     Amount,
    pub minimum_withdrawal: Amount,
    pub price:              Amount,
}

impl PlanTier {
    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub till_name:   String,
    pub till_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestion {
    pub id:             String,
    pub question:       String,
    #[serde(rename = "type")]
    pub kind:           QuestionKind,
    #[serde(default)]
    pub choices:        Vec<String>,
    /// None marks an opinion question; it is never scored.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDefinition {
    pub id:            SurveyId,
    pub title:         String,
    pub description:   String,
    pub category:      String,
    pub difficulty:    String,
    pub duration:      String,
    pub reward:        Amount,
    pub required_plan: PlanName,
    #[serde(default)]
    pub questions:     Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCatalogFile {
    #[serde(default = "default_visibility")]
    pub visibility:      bool,
    pub survey_plans:    Vec<PlanTier>,
    pub payment_details: PaymentDetails,
}

fn default_visibility() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyCatalogFile {
    pub surveys:       Vec<SurveyDefinition>,
    pub user_progress: UserProgress,
}

/// Where the two catalog documents come from.
/// Each fetch is independent; both must succeed for the catalog to load.
pub trait CatalogSource {
    /// Short label used in errors and logs.
    fn name(&self) -> &str;

    fn fetch_plans(&self) -> anyhow::Result<PlanCatalogFile>;

    fn fetch_surveys(&self) -> anyhow::Result<SurveyCatalogFile>;
}

/// Reads the catalog documents from a data directory.
pub struct DataDirSource {
    data_dir: String,
}

impl DataDirSource {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, rel: &str) -> anyhow::Result<T> {
        let path = format!("{}/{rel}", self.data_dir);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
    }
}

impl CatalogSource for DataDirSource {
    fn name(&self) -> &str {
        &self.data_dir
    }

    fn fetch_plans(&self) -> anyhow::Result<PlanCatalogFile> {
        self.read_json("plans/plan.json")
    }

    fn fetch_surveys(&self) -> anyhow::Result<SurveyCatalogFile> {
        self.read_json("surveys/survey.json")
    }
}

/// The loaded, immutable catalog. Sequence order is catalog order.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub visibility:       bool,
    pub plans:            Vec<PlanTier>,
    pub payment_details:  PaymentDetails,
    pub surveys:          Vec<SurveyDefinition>,
    /// Bundled default progress from the survey document.
    pub default_progress: UserProgress,
}

impl CatalogConfig {
    /// Fetch both documents from `source`. Either failure fails the whole load.
    pub fn from_source(source: &dyn CatalogSource) -> anyhow::Result<Self> {
        let plan_file = source.fetch_plans()?;
        let survey_file = source.fetch_surveys()?;
        Ok(Self::from_files(plan_file, survey_file))
    }

    pub fn from_files(plan_file: PlanCatalogFile, survey_file: SurveyCatalogFile) -> Self {
        let config = Self {
            visibility:       plan_file.visibility,
            plans:            plan_file.survey_plans,
            payment_details:  plan_file.payment_details,
            surveys:          survey_file.surveys,
            default_progress: survey_file.user_progress,
        };
        config.warn_on_duplicates();
        config
    }

    /// Load from the data/ directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        Self::from_source(&DataDirSource::new(data_dir))
    }

    pub fn plan(&self, name: &str) -> Option<&PlanTier> {
        self.plans.iter().find(|p| p.plan_name == name)
    }

    pub fn survey(&self, survey_id: &str) -> Option<&SurveyDefinition> {
        self.surveys.iter().find(|s| s.id == survey_id)
    }

    // Lookups are first-match, so a duplicate key shadows the later entry.
    fn warn_on_duplicates(&self) {
        let mut seen = std::collections::HashSet::new();
        for p in &self.plans {
            if !seen.insert(p.plan_name.as_str()) {
                log::warn!("catalog: duplicate plan '{}' ignored", p.plan_name);
            }
        }
        seen.clear();
        for s in &self.surveys {
            if !seen.insert(s.id.as_str()) {
                log::warn!("catalog: duplicate survey id '{}' ignored", s.id);
            }
        }
    }

    /// Catalog with hardcoded defaults for use in tests.
    /// Quotas and rewards mirror data/plans/plan.json.
    pub fn default_test() -> Self {
        let plan = |name: &str, daily: u32, per: Amount, min_wd: Amount, price: Amount| PlanTier {
            plan_name:          name.into(),
            daily_survey:       daily,
            earning_per_survey: per,
            daily_income:       daily as Amount * per,
            monthly_income:     daily as Amount * per * 30.0,
            minimum_withdrawal: min_wd,
            price,
        };

        let survey = |id: &str, title: &str, reward: Amount, required: &str| SurveyDefinition {
            id:            id.into(),
            title:         title.into(),
            description:   format!("{title} survey"),
            category:      "General".into(),
            difficulty:    "Easy".into(),
            duration:      "5 min".into(),
            reward,
            required_plan: required.into(),
            questions:     Vec::new(),
        };

        let mut s3 = survey("s3", "Shopping Habits", 150.0, "Silver");
        s3.questions = vec![
            SurveyQuestion {
                id:             "q1".into(),
                question:       "How often do you shop online?".into(),
                kind:           QuestionKind::SingleChoice,
                choices:        vec!["Daily".into(), "Weekly".into(), "Monthly".into()],
                correct_answer: None,
            },
            SurveyQuestion {
                id:             "q2".into(),
                question:       "What is the capital of Kenya?".into(),
                kind:           QuestionKind::SingleChoice,
                choices:        vec!["Nairobi".into(), "Mombasa".into(), "Kisumu".into()],
                correct_answer: Some("Nairobi".into()),
            },
            SurveyQuestion {
                id:             "q3".into(),
                question:       "What would improve your experience?".into(),
                kind:           QuestionKind::FreeText,
                choices:        Vec::new(),
                correct_answer: None,
            },
        ];

        Self {
            visibility: true,
            plans: vec![
                plan("Starter", 1, 90.0, 1500.0, 0.0),
                plan("Silver", 3, 150.0, 1000.0, 500.0),
                plan("Gold", 5, 200.0, 800.0, 1000.0),
                plan("Platinum", 10, 300.0, 500.0, 2000.0),
            ],
            payment_details: PaymentDetails {
                till_name:   "Survey Payments".into(),
                till_number: 123_456,
            },
            surveys: vec![
                survey("s1", "Daily Habits", 90.0, "Starter"),
                survey("s2", "Mobile Banking", 90.0, "Starter"),
                s3,
                survey("s4", "Travel Preferences", 200.0, "Gold"),
                survey("s5", "Investment Outlook", 300.0, "Platinum"),
            ],
            default_progress: UserProgress {
                current_plan:            NO_PLAN.into(),
                surveys_completed_today: 0,
                total_earnings:          0.0,
                pending_earnings:        0.0,
                completed_surveys:       Vec::new(),
                referrals:               ReferralRecord::default(),
                day_window:              None,
            },
        }
    }
}

/// Session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Deferred completion delay range [min, max) in ms.
    pub min_completion_delay:  crate::types::Millis,
    pub max_completion_delay:  crate::types::Millis,
    pub history_policy:        crate::eligibility::HistoryPolicy,
    /// Cancel pending completions when the view is torn down.
    pub cancel_on_teardown:    bool,
    /// Seed for the completion delay stream.
    pub seed:                  u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            min_completion_delay: 2000,
            max_completion_delay: 5000,
            history_policy:       crate::eligibility::HistoryPolicy::IncludeCompleted,
            cancel_on_teardown:   false,
            seed:                 42,
        }
    }
}

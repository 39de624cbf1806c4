//! Shared primitive types used across the survey core.

/// Stable identifier of a survey definition.
pub type SurveyId = String;

/// Plan tier key. The literal `"none"` means no plan selected.
pub type PlanName = String;

/// Logical milliseconds on the caller's clock.
/// The core never reads wall time; callers pass `now` explicitly.
pub type Millis = u64;

/// Monetary amount in the catalog's currency unit.
pub type Amount = f64;

/// Calendar day used to scope the daily quota window.
pub type Day = chrono::NaiveDate;

/// Plan name stored on progress records that have not picked a plan.
pub const NO_PLAN: &str = "none";

/// Well-known key the progress snapshot is persisted under.
pub const PROGRESS_KEY: &str = "surveyData";

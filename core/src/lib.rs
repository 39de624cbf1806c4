//! Survey plan core: catalog, progress, eligibility and the completion
//! transaction for a plan-gated paid-survey app.
//!
//! The view layer reads through [`session::SurveySession`] and mutates
//! progress only via its completion entry points.

pub mod catalog;
pub mod completion;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod progress;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;
pub mod withdrawal;

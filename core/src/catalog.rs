//! Catalog store: the two immutable catalogs, loaded once.
//!
//! Lifecycle: Loading → Ready | Failed. Both terminal states are final;
//! there is no retry inside the core.

use crate::{
    config::{CatalogConfig, CatalogSource},
    error::{SurveyError, SurveyResult},
};

#[derive(Debug)]
enum CatalogState {
    Loading,
    Ready(CatalogConfig),
    Failed { source_name: String, reason: String },
}

#[derive(Debug)]
pub struct CatalogStore {
    state: CatalogState,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self { state: CatalogState::Loading }
    }

    /// Store that is already ready (used by tests and embedders with
    /// their own loading).
    pub fn ready(config: CatalogConfig) -> Self {
        Self { state: CatalogState::Ready(config) }
    }

    /// Fetch both documents. Only the first call does any work; later
    /// calls return the cached outcome.
    pub fn load(&mut self, source: &dyn CatalogSource) -> SurveyResult<&CatalogConfig> {
        if matches!(self.state, CatalogState::Loading) {
            self.state = match CatalogConfig::from_source(source) {
                Ok(config) => {
                    log::info!(
                        "catalog: loaded {} plans, {} surveys from {}",
                        config.plans.len(),
                        config.surveys.len(),
                        source.name()
                    );
                    CatalogState::Ready(config)
                }
                Err(e) => {
                    log::warn!("catalog: load from {} failed: {e:#}", source.name());
                    CatalogState::Failed {
                        source_name: source.name().to_string(),
                        reason:      format!("{e:#}"),
                    }
                }
            };
        }
        self.get()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CatalogState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, CatalogState::Failed { .. })
    }

    pub fn get(&self) -> SurveyResult<&CatalogConfig> {
        match &self.state {
            CatalogState::Ready(config) => Ok(config),
            CatalogState::Loading => Err(SurveyError::CatalogNotReady),
            CatalogState::Failed { source_name, reason } => Err(SurveyError::SourceUnavailable {
                source_name: source_name.clone(),
                reason:      reason.clone(),
            }),
        }
    }
}

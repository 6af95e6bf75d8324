// crates/ensemble-harness-steps/src/context.rs
// ============================================================================
// Module: Scenario Context
// Description: Per-scenario state threaded through every step.
// Purpose: Replace ambient globals with an explicit, resettable context.
// Dependencies: ensemble-harness-{core,config,client,local}, serde_json
// ============================================================================

//! ## Overview
//! [`ScenarioContext`] owns the API handle, the audit sink, the polling and
//! resource settings, and everything the steps of one scenario produce:
//! created resources, the last HTTP status and location, local wrappers,
//! and faulty resources observed while polling. [`ScenarioContext::reset`]
//! clears the scenario state and keeps the collaborators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use ensemble_harness_client::HttpResourceApi;
use ensemble_harness_config::HarnessConfig;
use ensemble_harness_config::PollingConfig;
use ensemble_harness_config::ResourcesConfig;
use ensemble_harness_core::HttpCode;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceId;
use ensemble_harness_local::EnsemblePredictor;
use ensemble_harness_local::EnsembleView;
use ensemble_harness_local::LocalEnsemble;
use ensemble_harness_local::LocalModel;
use ensemble_harness_local::SupervisedModel;
use serde_json::Value;

use crate::audit::StepAuditEvent;
use crate::audit::StepAuditSink;
use crate::audit::sink_from_config;
use crate::error::StepError;

// ============================================================================
// SECTION: Scenario State Types
// ============================================================================

/// Local ensemble wrapper produced by one of the local-build steps.
#[derive(Debug, Clone)]
pub enum LocalEnsembleHandle {
    /// Ensemble holding every model.
    Ensemble(LocalEnsemble),
    /// Wrapper chosen by resource kind.
    Supervised(SupervisedModel),
    /// Directory-backed wrapper without loaded models.
    Predictor(EnsemblePredictor),
}

impl LocalEnsembleHandle {
    /// Returns the shared read-only view.
    #[must_use]
    pub fn view(&self) -> &dyn EnsembleView {
        match self {
            Self::Ensemble(ensemble) => ensemble,
            Self::Supervised(supervised) => supervised,
            Self::Predictor(predictor) => predictor,
        }
    }
}

/// Resource observed in the faulty status while polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultyResource {
    /// Faulty resource.
    pub resource: ResourceId,
    /// Raw status code.
    pub code: i64,
    /// Status message reported by the service.
    pub message: String,
}

// ============================================================================
// SECTION: Scenario Context
// ============================================================================

/// State shared by the steps of one scenario.
pub struct ScenarioContext {
    /// Remote resource service.
    api: Arc<dyn ResourceApi>,
    /// Audit sink for step events.
    audit: Arc<dyn StepAuditSink>,
    /// Polling cadence and timeout scaling.
    pub polling: PollingConfig,
    /// Local file settings.
    pub resources: ResourcesConfig,
    /// Dataset new ensembles are built from.
    pub dataset: Option<ResourceId>,
    /// Project cloned resources are assigned to.
    pub project_id: Option<ResourceId>,
    /// HTTP code of the last create or clone call.
    pub status: Option<HttpCode>,
    /// Location of the last created or cloned resource.
    pub location: Option<String>,
    /// Body of the current ensemble.
    pub ensemble: Option<Value>,
    /// Identifier of the current ensemble.
    pub ensemble_id: Option<ResourceId>,
    /// Every ensemble created or cloned in this scenario, in order.
    pub ensembles: Vec<ResourceId>,
    /// Model ids created in this scenario, in order.
    pub models: Vec<ResourceId>,
    /// Current local ensemble wrapper.
    pub local_ensemble: Option<LocalEnsembleHandle>,
    /// Current local model wrapper.
    pub local_model: Option<LocalModel>,
    /// Faulty resources observed while polling.
    pub errors: Vec<FaultyResource>,
}

impl ScenarioContext {
    /// Creates a context with default polling and resource settings.
    #[must_use]
    pub fn new(api: Arc<dyn ResourceApi>, audit: Arc<dyn StepAuditSink>) -> Self {
        Self {
            api,
            audit,
            polling: PollingConfig::default(),
            resources: ResourcesConfig::default(),
            dataset: None,
            project_id: None,
            status: None,
            location: None,
            ensemble: None,
            ensemble_id: None,
            ensembles: Vec::new(),
            models: Vec::new(),
            local_ensemble: None,
            local_model: None,
            errors: Vec::new(),
        }
    }

    /// Creates a context talking to the configured HTTP service.
    ///
    /// # Errors
    ///
    /// Returns [`StepError`] when the HTTP client cannot be built or the
    /// audit log cannot be opened.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, StepError> {
        let api = HttpResourceApi::new(&config.api)?;
        let audit = sink_from_config(&config.resources)
            .map_err(|err| StepError::Io(format!("audit log: {err}")))?;
        let mut context = Self::new(Arc::new(api), audit);
        context.polling = config.polling.clone();
        context.resources = config.resources.clone();
        context.project_id = config.api.project.as_deref().map(ResourceId::new);
        Ok(context)
    }

    /// Replaces the polling settings.
    #[must_use]
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Returns the remote resource service.
    #[must_use]
    pub fn api(&self) -> &dyn ResourceApi {
        self.api.as_ref()
    }

    /// Records an audit event.
    pub fn record(&self, event: &StepAuditEvent) {
        self.audit.record(event);
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &dyn StepAuditSink {
        self.audit.as_ref()
    }

    /// Resolves a step file argument against the data directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.resources.resolve(path)
    }

    /// Returns the current ensemble id, from the id field or the body.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingState`] when no ensemble exists yet.
    pub fn current_ensemble_id(&self) -> Result<ResourceId, StepError> {
        if let Some(id) = &self.ensemble_id {
            return Ok(id.clone());
        }
        self.ensemble
            .as_ref()
            .and_then(|body| body.get("resource"))
            .and_then(Value::as_str)
            .map(ResourceId::new)
            .ok_or(StepError::MissingState("ensemble"))
    }

    /// Returns the current local ensemble view.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingState`] when no local ensemble was built.
    pub fn local_view(&self) -> Result<&dyn EnsembleView, StepError> {
        self.local_ensemble
            .as_ref()
            .map(LocalEnsembleHandle::view)
            .ok_or(StepError::MissingState("local ensemble"))
    }

    /// Clears scenario state, keeping the API, audit sink, and settings.
    pub fn reset(&mut self) {
        self.dataset = None;
        self.status = None;
        self.location = None;
        self.ensemble = None;
        self.ensemble_id = None;
        self.ensembles.clear();
        self.models.clear();
        self.local_ensemble = None;
        self.local_model = None;
        self.errors.clear();
    }
}

// crates/ensemble-harness-steps/tests/common/mod.rs
// ============================================================================
// Module: Step Test Fixtures
// Description: In-memory resource API and scenario builders for step tests.
// Purpose: Script status progressions and count remote calls.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are not used by every test binary.")]

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use ensemble_harness_config::PollingConfig;
use ensemble_harness_core::ApiError;
use ensemble_harness_core::HttpCode;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_steps::ScenarioContext;
use ensemble_harness_steps::StepMemoryAuditSink;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Id of the ensemble every stub create returns.
pub const ENSEMBLE_ID: &str = "ensemble/e1";

/// Field metadata shared by fixtures.
pub fn fields() -> Value {
    json!({
        "000000": {"name": "sepal length", "optype": "numeric"},
        "000001": {"name": "sepal width", "optype": "numeric"},
        "000002": {"name": "petal length", "optype": "numeric"},
    })
}

/// Finished model body.
pub fn model_body(id: &str, importance: Value) -> Value {
    json!({
        "resource": id,
        "status": {"code": 5, "message": "The model has been created"},
        "model": {"fields": fields(), "importance": importance},
    })
}

/// Finished ensemble body listing `model/m1` and `model/m2`.
pub fn ensemble_body() -> Value {
    json!({
        "resource": ENSEMBLE_ID,
        "status": {"code": 5, "message": "The ensemble has been created"},
        "models": ["model/m1", "model/m2"],
        "ensemble": {"fields": fields()},
    })
}

/// Importance averaged over the two fixture models.
pub fn averaged_importance() -> &'static str {
    r#"[["000002", 0.5625], ["000000", 0.375], ["000001", 0.0625]]"#
}

/// Returns `body` with its status code replaced.
pub fn with_status(body: &Value, code: i64) -> Value {
    let mut body = body.clone();
    body["status"] = json!({"code": code, "message": format!("status {code}")});
    body
}

// ============================================================================
// SECTION: Stub API
// ============================================================================

/// Scripted in-memory resource API.
pub struct StubApi {
    /// Final bodies by id.
    resources: RefCell<BTreeMap<ResourceId, Value>>,
    /// Status codes served before the final body, by id.
    progress: RefCell<BTreeMap<ResourceId, VecDeque<i64>>>,
    /// HTTP code returned by create and clone calls.
    create_code: Cell<HttpCode>,
    /// Arguments of every create call.
    pub created: RefCell<Vec<Map<String, Value>>>,
    /// Source and arguments of every clone call.
    pub cloned: RefCell<Vec<(ResourceId, Map<String, Value>)>>,
    /// Number of read calls.
    pub reads: Cell<usize>,
}

impl StubApi {
    /// Stub holding the fixture ensemble and its two models.
    pub fn iris() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(ResourceId::new(ENSEMBLE_ID), ensemble_body());
        resources.insert(
            ResourceId::new("model/m1"),
            model_body("model/m1", json!([["000002", 0.75], ["000000", 0.25]])),
        );
        resources.insert(
            ResourceId::new("model/m2"),
            model_body("model/m2", json!([["000000", 0.5], ["000002", 0.375], ["000001", 0.125]])),
        );
        Self {
            resources: RefCell::new(resources),
            progress: RefCell::new(BTreeMap::new()),
            create_code: Cell::new(201),
            created: RefCell::new(Vec::new()),
            cloned: RefCell::new(Vec::new()),
            reads: Cell::new(0),
        }
    }

    /// Serves `codes` for `id` before its final body.
    pub fn script(&self, id: &str, codes: &[i64]) {
        self.progress.borrow_mut().insert(ResourceId::new(id), codes.iter().copied().collect());
    }

    /// Replaces the final body of `id`.
    pub fn set_resource(&self, id: &str, body: Value) {
        self.resources.borrow_mut().insert(ResourceId::new(id), body);
    }

    /// Makes create and clone calls answer with `code`.
    pub fn reject_creates(&self, code: HttpCode) {
        self.create_code.set(code);
    }

    /// Total create and clone calls.
    pub fn writes(&self) -> usize {
        self.created.borrow().len() + self.cloned.borrow().len()
    }

    /// Answers a create or clone call.
    fn created_envelope(&self, id: &str, object: Value) -> ResourceEnvelope {
        let code = self.create_code.get();
        if code != 201 {
            return ResourceEnvelope::rejected(code, json!({"status": {"message": "rejected"}}));
        }
        ResourceEnvelope::accepted(
            code,
            ResourceId::new(id),
            Some(format!("https://example.test/andromeda/{id}")),
            object,
        )
    }
}

impl ResourceApi for StubApi {
    fn create_ensemble(
        &self,
        _dataset: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        self.created.borrow_mut().push(args.clone());
        Ok(self.created_envelope(ENSEMBLE_ID, with_status(&ensemble_body(), 1)))
    }

    fn clone_ensemble(
        &self,
        ensemble: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        self.cloned.borrow_mut().push((ensemble.clone(), args.clone()));
        let mut body = with_status(&ensemble_body(), 1);
        body["resource"] = json!("ensemble/clone1");
        body["origin"] = json!(ensemble.as_str());
        Ok(self.created_envelope("ensemble/clone1", body))
    }

    fn get_resource(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError> {
        self.reads.set(self.reads.get() + 1);
        let Some(body) = self.resources.borrow().get(resource).cloned() else {
            return Ok(ResourceEnvelope::rejected(404, json!({"status": {"code": 404}})));
        };
        let scripted = self.progress.borrow_mut().get_mut(resource).and_then(VecDeque::pop_front);
        let body = match scripted {
            Some(code) => with_status(&body, code),
            None => body,
        };
        Ok(ResourceEnvelope::accepted(200, resource.clone(), None, body))
    }
}

// ============================================================================
// SECTION: Scenario Builders
// ============================================================================

/// Polling settings that keep tests fast.
pub fn fast_polling() -> PollingConfig {
    PollingConfig {
        initial_delay_ms: 1,
        max_delay_ms: 4,
        timeout_scale: 1,
    }
}

/// Context over `api` with a memory audit sink and the fixture dataset.
pub fn scenario(api: &Arc<StubApi>) -> (ScenarioContext, Arc<StepMemoryAuditSink>) {
    let audit = Arc::new(StepMemoryAuditSink::new());
    let mut ctx = ScenarioContext::new(api.clone(), audit.clone()).with_polling(fast_polling());
    ctx.dataset = Some(ResourceId::new("dataset/d1"));
    (ctx, audit)
}

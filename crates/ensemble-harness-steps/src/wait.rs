// crates/ensemble-harness-steps/src/wait.rs
// ============================================================================
// Module: Status Polling
// Description: Blocking wait for a resource to reach a target status.
// Purpose: Bound every wait by a timeout with capped exponential backoff.
// Dependencies: ensemble-harness-core, ensemble-harness-config
// ============================================================================

//! ## Overview
//! [`wait_until_status_code_is`] reads a resource until its status equals
//! either of two target codes or the timeout elapses. The delay between
//! reads starts at `initial_delay_ms` and doubles up to `max_delay_ms`; it
//! never sleeps past the deadline. The timeout is `secs * timeout_scale`.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use ensemble_harness_config::PollingConfig;
use ensemble_harness_core::HTTP_OK;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use ensemble_harness_core::StatusInfo;

use crate::audit::StepAuditEvent;
use crate::audit::StepAuditSink;
use crate::audit::StepOutcome;
use crate::error::StepError;

/// Audit step name used for poll events.
const POLL_STEP: &str = "wait_until_status_code_is";

/// Result of a wait that reached one of its target statuses.
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Last envelope read.
    pub envelope: ResourceEnvelope,
    /// Status extracted from the last envelope.
    pub status: StatusInfo,
    /// Number of status reads performed.
    pub attempts: u32,
    /// Time spent waiting.
    pub elapsed: Duration,
}

/// Polls `resource` until its status is `code1` or `code2`.
///
/// # Errors
///
/// Returns [`StepError::Timeout`] when neither status is reached in time,
/// [`StepError::UnexpectedStatus`] when a read returns a non-200 code, and
/// [`StepError::Api`] when a read fails.
pub fn wait_until_status_code_is(
    api: &dyn ResourceApi,
    audit: &dyn StepAuditSink,
    polling: &PollingConfig,
    resource: &ResourceId,
    code1: ResourceStatus,
    code2: ResourceStatus,
    secs: u64,
) -> Result<WaitOutcome, StepError> {
    let seconds = secs.saturating_mul(u64::from(polling.timeout_scale));
    let timeout = Duration::from_secs(seconds);
    let max_delay = Duration::from_millis(polling.max_delay_ms);
    let mut delay = Duration::from_millis(polling.initial_delay_ms);
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        let envelope = api.get_resource(resource)?;
        if envelope.code != HTTP_OK {
            return Err(StepError::UnexpectedStatus {
                expected: i64::from(HTTP_OK),
                actual: i64::from(envelope.code),
            });
        }
        let status = envelope.status();
        audit.record(
            &StepAuditEvent::new(POLL_STEP, StepOutcome::Polled)
                .with_resource(resource)
                .with_status_code(status.code)
                .with_message(format!("attempt {attempts}: {}", status.message)),
        );
        let elapsed = start.elapsed();
        if status.status == code1 || status.status == code2 {
            return Ok(WaitOutcome {
                envelope,
                status,
                attempts,
                elapsed,
            });
        }
        if elapsed >= timeout {
            return Err(StepError::Timeout {
                resource: resource.clone(),
                seconds,
                status: status.status,
            });
        }
        thread::sleep(delay.min(timeout.saturating_sub(elapsed)));
        delay = delay.saturating_mul(2).min(max_delay);
    }
}

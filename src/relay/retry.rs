//! Bounded retries around one tier
//!
//! The loop is kept as an explicit state machine ([`RetryState`]) so the
//! bookkeeping can be tested on its own. A fault on a single attempt is logged
//! and suppressed; exhausting all attempts yields the sentinel failure value.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::relay::backoff::{BackoffPolicy, ExponentialBackoff};
use crate::relay::error::RelayError;
use crate::relay::gateway::UpstreamGateway;
use crate::relay::tier::TierClient;
use crate::relay::types::{TierResult, TranslationRequest};

/// How hard to try one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
        }
    }

    /// A single attempt, used for the scrape tier
    pub fn once(attempt_timeout: Duration) -> Self {
        Self::new(1, attempt_timeout)
    }
}

/// What one attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Accepted(TierResult),
    Rejected(TierResult),
    Faulted(RelayError),
}

/// What the loop should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    Done(TierResult),
    Wait(u32),
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    max_attempts: u32,
    attempt: u32,
    last_fault: Option<RelayError>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt: 0,
            last_fault: None,
        }
    }

    /// 0-based index of the attempt about to run
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_fault(&self) -> Option<&RelayError> {
        self.last_fault.as_ref()
    }

    /// Record the outcome of the current attempt and decide the next step.
    /// `Wait(n)` carries the index to feed the backoff policy.
    pub fn advance(&mut self, outcome: AttemptOutcome) -> RetryStep {
        match outcome {
            AttemptOutcome::Accepted(result) => return RetryStep::Done(result),
            AttemptOutcome::Rejected(_) => {}
            AttemptOutcome::Faulted(err) => self.last_fault = Some(err),
        }
        let finished = self.attempt;
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            RetryStep::Exhausted
        } else {
            RetryStep::Wait(finished)
        }
    }
}

#[derive(Clone)]
pub struct RetryingExecutor {
    gateway: UpstreamGateway,
    backoff: Arc<dyn BackoffPolicy>,
}

impl RetryingExecutor {
    pub fn new(gateway: UpstreamGateway, backoff: Arc<dyn BackoffPolicy>) -> Self {
        Self { gateway, backoff }
    }

    pub fn with_default_backoff(gateway: UpstreamGateway) -> Self {
        Self::new(gateway, Arc::new(ExponentialBackoff::default()))
    }

    pub fn gateway(&self) -> &UpstreamGateway {
        &self.gateway
    }

    /// Run `client` until its success predicate holds or `policy` runs out.
    /// Never fails: exhaustion returns [`TierResult::failed`].
    pub async fn retry(
        &self,
        client: &dyn TierClient,
        request: &TranslationRequest,
        policy: RetryPolicy,
    ) -> TierResult {
        let mut state = RetryState::new(policy.max_attempts);

        loop {
            let attempt = state.attempt() + 1;
            let outcome = match self
                .gateway
                .call(client, request, policy.attempt_timeout)
                .await
            {
                Ok(result) if client.is_success(&result) => AttemptOutcome::Accepted(result),
                Ok(result) => {
                    debug!(
                        "{} attempt #{} returned nothing usable",
                        client.client_name(),
                        attempt
                    );
                    AttemptOutcome::Rejected(result)
                }
                Err(err) => {
                    warn!("{} attempt #{} error: {}", client.client_name(), attempt, err);
                    AttemptOutcome::Faulted(err)
                }
            };

            match state.advance(outcome) {
                RetryStep::Done(result) => return result,
                RetryStep::Wait(index) => sleep(self.backoff.delay(index)).await,
                RetryStep::Exhausted => {
                    debug!(
                        "{} exhausted after {} attempts (last fault: {:?})",
                        client.client_name(),
                        policy.max_attempts,
                        state.last_fault()
                    );
                    return TierResult::failed();
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingExecutor")
            .field("gateway", &self.gateway)
            .finish()
    }
}

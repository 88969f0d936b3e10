use crate::domain::ports::{ChargeOutcome, PaymentGateway};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Gateway that approves every charge. Used by the CLI scenario runner,
/// where payment outcomes are not the behavior under test.
#[derive(Default, Clone)]
pub struct AutoApproveGateway;

impl AutoApproveGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for AutoApproveGateway {
    async fn charge(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _payment_method: &str,
    ) -> Result<ChargeOutcome> {
        Ok(ChargeOutcome::Succeeded)
    }
}

/// A scripted charge result queued into a [`ScriptedGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCharge {
    Approve,
    Decline(String),
    Unavailable(String),
}

/// Gateway that replays a queue of scripted outcomes and counts how often
/// it is charged. An exhausted script approves, so happy-path tests only
/// queue the interesting failures.
#[derive(Default, Clone)]
pub struct ScriptedGateway {
    outcomes: Arc<Mutex<VecDeque<ScriptedCharge>>>,
    calls: Arc<AtomicU64>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, outcome: ScriptedCharge) {
        let mut outcomes = self.outcomes.lock().await;
        outcomes.push_back(outcome);
    }

    /// Number of charge calls observed so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _payment_method: &str,
    ) -> Result<ChargeOutcome> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let next = { self.outcomes.lock().await.pop_front() };
        match next {
            None | Some(ScriptedCharge::Approve) => Ok(ChargeOutcome::Succeeded),
            Some(ScriptedCharge::Decline(reason)) => Ok(ChargeOutcome::Declined(reason)),
            Some(ScriptedCharge::Unavailable(reason)) => {
                Err(OrderError::GatewayUnavailable(reason))
            }
        }
    }
}

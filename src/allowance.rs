//! Allowance synchronizer
//!
//! Checks an ERC-20 allowance, approves once if it is short, then polls with a
//! fixed delay until the chain reports at least the required amount or the
//! attempt budget runs out:
//!
//! ```text
//! Checking -> Sufficient
//!          -> Insufficient -> Approving -> Waiting -> Sufficient | TimedOut
//! ```
//!
//! Only one synchronizer should run per (token, owner, spender); nothing here
//! serializes concurrent callers.

use std::fmt;

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::codec::bytes_to_hex;
use crate::error::{Result, SignerError};
use crate::types::Address;

pub const DEFAULT_POLLING_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Where allowances are read from and approvals are sent
#[async_trait]
pub trait AllowanceSource: Send + Sync {
    async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<BigUint>;

    /// Approve `amount` for `spender`; returns the transaction hash
    async fn approve(&self, token: &Address, spender: &Address, amount: &BigUint) -> Result<[u8; 32]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceState {
    Checking,
    Sufficient,
    Insufficient,
    Approving,
    Waiting,
    TimedOut,
}

impl fmt::Display for AllowanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllowanceState::Checking => "CHECKING",
            AllowanceState::Sufficient => "SUFFICIENT",
            AllowanceState::Insufficient => "INSUFFICIENT",
            AllowanceState::Approving => "APPROVING",
            AllowanceState::Waiting => "WAITING",
            AllowanceState::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub polling_delay: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            polling_delay: Duration::from_millis(DEFAULT_POLLING_DELAY_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// No transaction was sent
    AlreadySufficient { allowance: BigUint },
    /// An approval was sent and observed after `polls` polls
    Approved {
        tx_hash: [u8; 32],
        allowance: BigUint,
        polls: u32,
    },
}

impl AllowanceOutcome {
    pub fn allowance(&self) -> &BigUint {
        match self {
            AllowanceOutcome::AlreadySufficient { allowance } => allowance,
            AllowanceOutcome::Approved { allowance, .. } => allowance,
        }
    }
}

pub struct AllowanceSync<'a, S: AllowanceSource + ?Sized> {
    source: &'a S,
    config: PollConfig,
}

impl<'a, S: AllowanceSource + ?Sized> AllowanceSync<'a, S> {
    pub fn new(source: &'a S, config: PollConfig) -> Self {
        Self { source, config }
    }

    fn enter(&self, state: AllowanceState, token: &Address, spender: &Address) {
        debug!("Allowance of {} for {}: {}", token, spender, state);
    }

    /// Make sure `spender` may move at least `required` of `owner`'s `token`
    pub async fn ensure_allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        required: &BigUint,
    ) -> Result<AllowanceOutcome> {
        self.enter(AllowanceState::Checking, token, spender);
        let current = self.source.allowance(token, owner, spender).await?;
        if &current >= required {
            self.enter(AllowanceState::Sufficient, token, spender);
            return Ok(AllowanceOutcome::AlreadySufficient { allowance: current });
        }

        self.enter(AllowanceState::Insufficient, token, spender);
        info!(
            "Allowance of {} for {} is {}, need {}; approving",
            token, spender, current, required
        );

        self.enter(AllowanceState::Approving, token, spender);
        let tx_hash = self.source.approve(token, spender, required).await?;
        info!("Approval sent: {}", bytes_to_hex(&tx_hash));

        self.enter(AllowanceState::Waiting, token, spender);
        let (allowance, polls) = self.wait_for_allowance(token, owner, spender, required).await?;
        Ok(AllowanceOutcome::Approved {
            tx_hash,
            allowance,
            polls,
        })
    }

    /// Poll until the allowance reaches `required`.
    ///
    /// At most `max_attempts` polls, `polling_delay` apart. A poll that fails with an
    /// RPC error counts as an attempt. Returns the observed allowance and the poll count.
    pub async fn wait_for_allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        required: &BigUint,
    ) -> Result<(BigUint, u32)> {
        for attempt in 1..=self.config.max_attempts {
            match self.source.allowance(token, owner, spender).await {
                Ok(current) if &current >= required => {
                    self.enter(AllowanceState::Sufficient, token, spender);
                    info!(
                        "Allowance of {} for {} reached {} after {} poll(s)",
                        token, spender, current, attempt
                    );
                    return Ok((current, attempt));
                }
                Ok(current) => {
                    debug!(
                        "Poll {}/{}: allowance {} < {}",
                        attempt, self.config.max_attempts, current, required
                    );
                }
                Err(e) => {
                    debug!("Poll {}/{} failed: {}", attempt, self.config.max_attempts, e);
                }
            }

            if attempt < self.config.max_attempts {
                sleep(self.config.polling_delay).await;
            }
        }

        self.enter(AllowanceState::TimedOut, token, spender);
        warn!(
            "Allowance of {} for {} (owner {}) did not reach {} after {} polls",
            token, spender, owner, required, self.config.max_attempts
        );
        Err(SignerError::AllowanceTimeout {
            token: token.to_string(),
            owner: owner.to_string(),
            spender: spender.to_string(),
            required: required.to_string(),
            attempts: self.config.max_attempts,
        })
    }
}

// src/pipeline/pacing.rs

//! Delays between successive remote calls.

use std::time::Duration;

/// Decides how long to wait before the next remote call.
pub trait PacingPolicy: Send + Sync {
    /// Delay before the next call, given how many calls are still to come.
    fn cooldown(&self, remaining: usize) -> Duration;
}

/// Fixed pause between calls; nothing after the last one.
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown(pub Duration);

impl FixedCooldown {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl PacingPolicy for FixedCooldown {
    fn cooldown(&self, remaining: usize) -> Duration {
        if remaining == 0 {
            Duration::ZERO
        } else {
            self.0
        }
    }
}

/// Never waits (tests, single-shot runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn cooldown(&self, _remaining: usize) -> Duration {
        Duration::ZERO
    }
}

/// Sleep for the policy's cooldown; returns whether a pause happened.
pub async fn pause(policy: &dyn PacingPolicy, remaining: usize) -> bool {
    let delay = policy.cooldown(remaining);
    if delay.is_zero() {
        return false;
    }
    log::info!("Cooling down for {}s ({remaining} to go)", delay.as_secs());
    tokio::time::sleep(delay).await;
    true
}

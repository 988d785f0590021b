//! The Worker Session Manager (§4.B): owns the one upstream session,
//! performs login/warm-up, and heals on transient upstream failures.
//!
//! State machine: `Starting -> Ready <-> Reconnecting -> Degraded ->
//! (Ready on success)`, terminal on process exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::upstream::{UpstreamError, UpstreamSession};

/// The three observable states plus the transient `Starting` state the
/// process begins in (§4.B, GLOSSARY "Ready / Reconnecting / Degraded").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Starting = 0,
    Ready = 1,
    Reconnecting = 2,
    Degraded = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Starting,
            1 => WorkerState::Ready,
            2 => WorkerState::Reconnecting,
            _ => WorkerState::Degraded,
        }
    }
}

/// Backoff/retry policy for login and reconnect attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt);
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Owns the exclusive upstream session and its observable state
/// (§5 "Shared resources": exclusively the worker's).
pub struct WorkerSessionManager<S: UpstreamSession> {
    session: Arc<S>,
    state: AtomicU8,
    retry: RetryPolicy,
}

impl<S: UpstreamSession> WorkerSessionManager<S> {
    pub fn new(session: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            session,
            state: AtomicU8::new(WorkerState::Starting as u8),
            retry,
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == WorkerState::Ready
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    fn set_state(&self, new: WorkerState) {
        let old = self.state();
        self.state.store(new as u8, Ordering::Release);
        if old != new {
            tracing::info!(from = ?old, to = ?new, "worker state transition");
        }
    }

    /// Perform credentialed login with exponential back-off, up to
    /// `retry.max_attempts` (§4.B step 1). On exhaustion the manager
    /// settles into `Degraded` rather than blocking indefinitely.
    pub async fn establish(&self) {
        for attempt in 0..self.retry.max_attempts {
            match self.session.login().await {
                Ok(()) => {
                    self.set_state(WorkerState::Ready);
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "login attempt failed");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }
        tracing::error!("login exhausted retries, entering degraded state");
        self.set_state(WorkerState::Degraded);
    }

    /// Classify an upstream error observed mid-call and, if it's
    /// transient, drive the healing state machine (§4.B step 3).
    ///
    /// Transitions to `Reconnecting` synchronously and hands the
    /// retry/backoff loop to a detached task, so the caller (the single
    /// dispatcher loop) is free to go back to popping requests — and
    /// rejecting them with `SessionNotReady` — for the whole duration of
    /// the reconnect instead of blocking on it (§8 "Worker state
    /// `reconnecting` implies every new command is rejected ... within
    /// one dispatch tick").
    pub fn heal_from(self: &Arc<Self>, err: &UpstreamError)
    where
        S: 'static,
    {
        use crate::upstream::classify;
        if !classify(err).is_transient() {
            return;
        }
        if self.state() == WorkerState::Reconnecting {
            // Already healing from a prior incident; don't stack a
            // second reconnect loop on top of it.
            return;
        }
        self.set_state(WorkerState::Reconnecting);
        let manager = self.clone();
        tokio::spawn(async move {
            manager.reconnect_loop().await;
        });
    }

    /// The actual retry/backoff loop, run off the dispatch path by
    /// [`Self::heal_from`].
    async fn reconnect_loop(self: Arc<Self>) {
        for attempt in 0..self.retry.max_attempts {
            match self.session.login().await {
                Ok(()) => {
                    self.set_state(WorkerState::Ready);
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "reconnect attempt failed");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }
        tracing::error!("reconnect exhausted retries, entering degraded state");
        self.set_state(WorkerState::Degraded);
    }

    /// Clean logout on process shutdown (§4.B step 4).
    pub async fn retire(&self) {
        if let Err(e) = self.session.logout().await {
            tracing::warn!(error = %e, "logout failed during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::fake::FakeUpstream;

    #[tokio::test]
    async fn establish_transitions_to_ready() {
        let manager = WorkerSessionManager::new(Arc::new(FakeUpstream::new()), RetryPolicy::default());
        assert_eq!(manager.state(), WorkerState::Starting);
        manager.establish().await;
        assert_eq!(manager.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn heal_from_business_error_does_not_change_state() {
        let manager = Arc::new(WorkerSessionManager::new(Arc::new(FakeUpstream::new()), RetryPolicy::default()));
        manager.establish().await;
        let err = UpstreamError::new("INSUFFICIENT_MARGIN", "no margin");
        manager.heal_from(&err);
        assert_eq!(manager.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn heal_from_transient_error_rejects_immediately_then_recovers() {
        let manager = Arc::new(WorkerSessionManager::new(Arc::new(FakeUpstream::new()), RetryPolicy::default()));
        manager.establish().await;
        let err = UpstreamError::new("TOKEN_EXPIRED", "token expired");
        manager.heal_from(&err);
        // The transition to `Reconnecting` is synchronous: a command
        // dispatched in the same tick sees it immediately.
        assert_eq!(manager.state(), WorkerState::Reconnecting);
        // The reconnect loop itself runs on a detached task.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.state(), WorkerState::Ready);
    }
}

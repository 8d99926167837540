//! Cancellable execution context for a single request.
//!
//! A `Context` pairs a `CancellationToken` with an optional deadline. Clones
//! share the token, so one thread can cancel while another is blocked in
//! `BackstageClient::execute`; the call returns as soon as the token fires.
//! The deadline becomes the transport timeout.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wrap a token owned elsewhere, e.g. by an async shutdown path.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a context that is cancelled with this one and whose deadline is
    /// no later than `timeout` from now. Cancelling the child leaves the
    /// parent alone.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(current) if current < candidate => current,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Fail if the context is already cancelled or expired, otherwise return
    /// the time budget left for the call.
    pub(crate) fn check(&self) -> Result<Option<Duration>, TransportError> {
        if self.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(TransportError::DeadlineExceeded),
            left => Ok(left),
        }
    }
}

//! Deferred primitive results
//!
//! A primitive that cannot produce its value right away returns a [`Deferred`] and
//! hands the matching [`Resolver`] to whoever will eventually produce it (a prompt, a
//! host callback, another OS thread). The thread that ran the primitive parks in
//! `PromiseWait` and the sequencer polls the deferred once per pass.

use crate::runtime::value::Value;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::fmt;

/// Outcome of polling a [`Deferred`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredState {
    Pending,
    Resolved(Value),
    Rejected(String),
}

/// Receiving half of a deferred result
pub struct Deferred {
    receiver: Receiver<Result<Value, String>>,
}

/// Sending half of a deferred result
#[derive(Clone)]
pub struct Resolver {
    sender: Sender<Result<Value, String>>,
}

/// Create a linked deferred/resolver pair
pub fn deferred() -> (Deferred, Resolver) {
    let (sender, receiver) = channel::bounded(1);
    (Deferred { receiver }, Resolver { sender })
}

impl Deferred {
    /// A deferred that is already resolved
    pub fn resolved(value: Value) -> Self {
        let (deferred, resolver) = deferred();
        resolver.resolve(value);
        deferred
    }

    /// Check for a result without blocking.
    ///
    /// A deferred whose resolvers were all dropped without answering counts as rejected.
    pub fn poll(&self) -> DeferredState {
        match self.receiver.try_recv() {
            Ok(Ok(value)) => DeferredState::Resolved(value),
            Ok(Err(reason)) => DeferredState::Rejected(reason),
            Err(TryRecvError::Empty) => DeferredState::Pending,
            Err(TryRecvError::Disconnected) => {
                DeferredState::Rejected("deferred dropped without a result".to_string())
            }
        }
    }
}

impl Resolver {
    /// Deliver the value. Returns `false` when nobody is waiting any more.
    pub fn resolve(
        &self,
        value: Value,
    ) -> bool {
        self.sender.try_send(Ok(value)).is_ok()
    }

    /// Fail the deferred. Returns `false` when nobody is waiting any more.
    pub fn reject(
        &self,
        reason: impl Into<String>,
    ) -> bool {
        self.sender.try_send(Err(reason.into())).is_ok()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Deferred(ready: {})", !self.receiver.is_empty())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("Resolver")
    }
}

//! Cloud variables
//!
//! Writes to cloud variables become requests in an outbox. Each step drains the outbox
//! through a [`RateLimiter`]: a refused request stays at the front and is retried on the
//! next step, so bursts are delayed, never dropped. Remote updates come back through
//! [`IoDevice::post_data`] and land directly in the stage's variable.

use super::{IoContext, IoDevice};
use crate::runtime::engine::VariableKind;
use crate::runtime::value::Value;
use crate::util::rate_limiter::RateLimiter;
use crate::util::timer::SharedClock;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Remote side of cloud variable sync
pub trait CloudProvider: Send {
    fn update_variable(
        &mut self,
        name: &str,
        value: &Value,
    );

    fn create_variable(
        &mut self,
        name: &str,
        value: &Value,
    );

    fn rename_variable(
        &mut self,
        old_name: &str,
        new_name: &str,
    );

    fn delete_variable(
        &mut self,
        name: &str,
    );
}

/// An outgoing request waiting in the outbox
#[derive(Debug, Clone, PartialEq)]
pub enum CloudRequest {
    Update { name: String, value: Value },
    Create { name: String, value: Value },
    Rename { old_name: String, new_name: String },
    Delete { name: String },
}

/// Incoming remote update
#[derive(Debug, Clone, PartialEq)]
pub struct VarUpdate {
    pub name: String,
    pub value: Value,
}

/// Cloud device: provider handle, outbox and limiter
pub struct Cloud {
    provider: Option<Box<dyn CloudProvider>>,
    outbox: VecDeque<CloudRequest>,
    limiter: RateLimiter,
}

impl Cloud {
    pub fn new(
        updates_per_second: u32,
        clock: SharedClock,
    ) -> Self {
        Self {
            provider: None,
            outbox: VecDeque::new(),
            limiter: RateLimiter::new(updates_per_second, clock),
        }
    }

    pub fn set_provider(
        &mut self,
        provider: Box<dyn CloudProvider>,
    ) {
        self.provider = Some(provider);
    }

    /// Detach the provider. Queued requests are dropped with it.
    pub fn clear_provider(&mut self) {
        self.provider = None;
        self.outbox.clear();
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn request_update(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.enqueue(CloudRequest::Update {
            name: name.into(),
            value,
        });
    }

    pub fn request_create(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.enqueue(CloudRequest::Create {
            name: name.into(),
            value,
        });
    }

    pub fn request_rename(
        &mut self,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) {
        self.enqueue(CloudRequest::Rename {
            old_name: old_name.into(),
            new_name: new_name.into(),
        });
    }

    pub fn request_delete(
        &mut self,
        name: impl Into<String>,
    ) {
        self.enqueue(CloudRequest::Delete { name: name.into() });
    }

    fn enqueue(
        &mut self,
        request: CloudRequest,
    ) {
        if self.provider.is_none() {
            debug!(?request, "no cloud provider, discarding request");
            return;
        }
        self.outbox.push_back(request);
    }

    /// Send queued requests while the limiter allows. Returns how many were sent.
    pub fn flush(&mut self) -> usize {
        let Some(provider) = self.provider.as_mut() else {
            return 0;
        };
        let mut sent = 0;
        while !self.outbox.is_empty() {
            if !self.limiter.okay_to_send() {
                debug!(queued = self.outbox.len(), "cloud updates throttled");
                break;
            }
            let Some(request) = self.outbox.pop_front() else {
                break;
            };
            match &request {
                CloudRequest::Update { name, value } => provider.update_variable(name, value),
                CloudRequest::Create { name, value } => provider.create_variable(name, value),
                CloudRequest::Rename { old_name, new_name } => {
                    provider.rename_variable(old_name, new_name)
                }
                CloudRequest::Delete { name } => provider.delete_variable(name),
            }
            sent += 1;
        }
        sent
    }

    /// Requests waiting for the limiter
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }
}

impl IoDevice for Cloud {
    type Data = VarUpdate;

    fn post_data(
        &mut self,
        data: VarUpdate,
        cx: &mut IoContext<'_>,
    ) {
        let Some(stage) = cx.stage.as_deref_mut() else {
            warn!(name = %data.name, "cloud update without a stage");
            return;
        };
        let key = stage
            .find_variable_by_name(&data.name, VariableKind::Scalar)
            .map(str::to_owned);
        match key.and_then(|key| stage.variables.get_mut(&key)) {
            Some(variable) if variable.is_cloud => variable.set(data.value),
            _ => warn!(name = %data.name, "cloud update for unknown variable"),
        }
    }
}

impl fmt::Debug for Cloud {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Cloud")
            .field("provider", &self.provider.is_some())
            .field("outbox", &self.outbox)
            .field("limiter", &self.limiter)
            .finish()
    }
}

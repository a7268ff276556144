// Request-scoped correlation context, bound to the tokio task serving the request

use std::{ future::Future, sync::{ Arc, Mutex, MutexGuard, PoisonError } };

use serde::Serialize;
use tokio::task_local;

/// Correlation facts about the request currently being served.
///
/// Every field starts out absent. `user_id` is filled in by the authentication
/// middleware once a token has been verified, so records emitted before that point
/// carry no user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub host: Option<String>,
    pub full_url: Option<String>,
    pub path: Option<String>,
    pub http_method: Option<String>,
    pub protocol: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    IpAddress,
    Host,
    FullUrl,
    Path,
    HttpMethod,
    Protocol,
    UserId,
}

impl RequestContext {
    pub fn get(&self, field: ContextField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: ContextField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: ContextField) -> &Option<String> {
        match field {
            ContextField::IpAddress => &self.ip_address,
            ContextField::Host => &self.host,
            ContextField::FullUrl => &self.full_url,
            ContextField::Path => &self.path,
            ContextField::HttpMethod => &self.http_method,
            ContextField::Protocol => &self.protocol,
            ContextField::UserId => &self.user_id,
        }
    }

    fn slot_mut(&mut self, field: ContextField) -> &mut Option<String> {
        match field {
            ContextField::IpAddress => &mut self.ip_address,
            ContextField::Host => &mut self.host,
            ContextField::FullUrl => &mut self.full_url,
            ContextField::Path => &mut self.path,
            ContextField::HttpMethod => &mut self.http_method,
            ContextField::Protocol => &mut self.protocol,
            ContextField::UserId => &mut self.user_id,
        }
    }
}

/// Shared handle to the one live context of a request.
///
/// Cloning the handle does not copy the context: every clone mutates and reads the
/// same instance.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    inner: Arc<Mutex<RequestContext>>,
}

impl ContextHandle {
    pub fn new(context: RequestContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub fn snapshot(&self) -> RequestContext {
        self.lock().clone()
    }

    pub fn set_field(&self, field: ContextField, value: Option<String>) {
        self.lock().set(field, value);
    }

    pub fn same_instance(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // a panic while holding the lock must not take logging down with it
    fn lock(&self) -> MutexGuard<'_, RequestContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

task_local! {
    static CURRENT: ContextHandle;
}

/// Runs `future` with `context` active for its whole extent, across every `.await`.
pub async fn run<F>(context: RequestContext, future: F) -> F::Output where F: Future {
    CURRENT.scope(ContextHandle::new(context), future).await
}

/// Snapshot of the active context, or `None` outside of any request.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(ContextHandle::snapshot).ok()
}

pub fn handle() -> Option<ContextHandle> {
    CURRENT.try_with(ContextHandle::clone).ok()
}

/// Sets a field on the active context. Does nothing outside of a request.
pub fn set_field(field: ContextField, value: impl Into<String>) {
    let value = value.into();
    let _ = CURRENT.try_with(|handle| handle.set_field(field, Some(value)));
}

pub fn user_id() -> Option<String> {
    CURRENT.try_with(|handle| handle.lock().user_id.clone())
        .ok()
        .flatten()
}

/// Carries the caller's context into a future that will run on another task.
///
/// Task-locals are not inherited by `tokio::spawn`, so anything spawned from a request
/// has to be wrapped explicitly to keep logging under the same request.
pub fn propagate<F>(future: F) -> impl Future<Output = F::Output> where F: Future {
    let handle = handle();
    async move {
        match handle {
            Some(handle) => CURRENT.scope(handle, future).await,
            None => future.await,
        }
    }
}

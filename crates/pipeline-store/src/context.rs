//! Component K: an opaque identity/tenant surrogate threaded through the
//! executor without this crate knowing anything about how auth is
//! actually performed upstream (collaborator concern, §6.1).

use std::sync::Arc;

/// Carries whatever the caller (HTTP layer) resolved about who owns this
/// job, without the pipeline crates depending on an auth implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    tenant_id: Arc<str>,
    principal_id: Option<Arc<str>>,
}

impl RequestContext {
    pub fn new(tenant_id: impl Into<Arc<str>>) -> Self {
        Self { tenant_id: tenant_id.into(), principal_id: None }
    }

    pub fn with_principal(mut self, principal_id: impl Into<Arc<str>>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.principal_id.as_deref()
    }

    /// A surrogate for anonymous/system-initiated work (maintenance
    /// sweeps, tests) where there is no upstream request.
    pub fn system() -> Self {
        Self { tenant_id: Arc::from("system"), principal_id: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_context_has_no_principal() {
        let ctx = RequestContext::system();
        assert_eq!(ctx.tenant_id(), "system");
        assert!(ctx.principal_id().is_none());
    }

    #[test]
    fn carries_principal_when_set() {
        let ctx = RequestContext::new("acme-clinic").with_principal("user-42");
        assert_eq!(ctx.tenant_id(), "acme-clinic");
        assert_eq!(ctx.principal_id(), Some("user-42"));
    }
}

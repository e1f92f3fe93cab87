use std::sync::Arc;

use crate::cache::ContextResolver;
use crate::cache::StaticContextResolver;
use crate::json_ext::Object;

/// The permission checked to fill the `bypass field security` global.
pub const BYPASS_FIELD_SECURITY_PERMISSION: &str = "bypass graphql field security";

/// Answers permission checks for the current caller.
pub trait Permissions: Send + Sync {
    fn has_permission(&self, permission: &str) -> bool;
}

impl<F> Permissions for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn has_permission(&self, permission: &str) -> bool {
        self(permission)
    }
}

/// Per-request collaborators: how cache contexts resolve for this caller, what
/// they may do, and the globals shared by every operation of the request.
#[derive(Clone)]
pub struct RequestScope {
    context_resolver: Arc<dyn ContextResolver>,
    permissions: Arc<dyn Permissions>,
    globals: Object,
}

impl RequestScope {
    pub fn new(context_resolver: impl ContextResolver + 'static) -> Self {
        Self {
            context_resolver: Arc::new(context_resolver),
            permissions: Arc::new(|_: &str| false),
            globals: Object::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl Permissions + 'static) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    /// Extra globals. The processor overwrites the keys it owns.
    pub fn with_globals(mut self, globals: Object) -> Self {
        self.globals = globals;
        self
    }

    pub fn context_resolver(&self) -> &dyn ContextResolver {
        self.context_resolver.as_ref()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.has_permission(permission)
    }

    pub fn globals(&self) -> &Object {
        &self.globals
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new(StaticContextResolver::default())
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("globals", &self.globals)
            .finish_non_exhaustive()
    }
}

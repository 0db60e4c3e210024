//! Method name to handler bindings.

use sipahi_core::{DynHandler, Handler, RegistryError};
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    sync::Arc,
};

/// Maps method names to their bound handlers.
///
/// A method has at most one handler. Binding a name twice is rejected with
/// [`RegistryError::DuplicateBinding`]; the first binding stays in place.
#[derive(Clone, Default)]
pub struct MethodBindings {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

impl MethodBindings {
    /// Create an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `method`.
    pub fn insert<H: Handler>(
        &mut self,
        method: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.insert_dyn(method, Arc::new(handler))
    }

    /// Bind an already type-erased handler to `method`.
    pub fn insert_dyn(
        &mut self,
        method: impl Into<String>,
        handler: Arc<dyn DynHandler>,
    ) -> Result<(), RegistryError> {
        match self.handlers.entry(method.into()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateBinding(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// The handler bound to `method`.
    pub fn get(&self, method: &str) -> Option<&Arc<dyn DynHandler>> {
        self.handlers.get(method)
    }

    /// Whether `method` has a handler.
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Names of all bound methods, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of bound methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for MethodBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingHandler;

    #[test]
    fn test_bind_and_lookup() {
        let mut bindings = MethodBindings::new();
        bindings.insert("Echo", CountingHandler::echo()).unwrap();

        assert!(bindings.contains("Echo"));
        assert!(bindings.get("Echo").is_some());
        assert!(bindings.get("echo").is_none());
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let first = CountingHandler::echo();
        let mut bindings = MethodBindings::new();
        bindings.insert("Echo", first.clone()).unwrap();

        let err = bindings
            .insert("Echo", CountingHandler::failing("second"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateBinding("Echo".into()));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_methods_lists_names() {
        let mut bindings = MethodBindings::new();
        bindings.insert("A", CountingHandler::echo()).unwrap();
        bindings.insert("B", CountingHandler::echo()).unwrap();

        let mut names: Vec<_> = bindings.methods().collect();
        names.sort_unstable();
        assert_eq!(names, ["A", "B"]);
    }
}

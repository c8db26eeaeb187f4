use std::fmt;

use tracing::warn;

use crate::id::ContextId;
use crate::registry::ResourceRegistry;

/// One logical execution context: a sequential call path or a single task.
///
/// The context is created by whoever starts the call path and is handed down by mutable
/// reference. It is `Send` so it can move with a task between threads, but it is never shared,
/// which keeps its resource bindings invisible to every other context.
pub struct ExecutionContext {
    id: ContextId,
    resources: ResourceRegistry,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let id = ContextId::next();
        Self {
            id,
            resources: ResourceRegistry::new(id),
        }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    #[inline]
    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("resources", &self.resources)
            .finish()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            warn!(
                context = %self.id,
                bound = self.resources.len(),
                "execution context dropped with resources still bound"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::id::ResourceKey;
    use crate::registry::BoundResource;

    struct Holder(u32);

    impl BoundResource for Holder {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_contexts_are_isolated() {
        let key = ResourceKey::next();
        let mut first = ExecutionContext::new();
        let mut second = ExecutionContext::new();
        assert_ne!(first.id(), second.id());

        first.resources_mut().bind(key, Arc::new(Holder(1))).unwrap();
        assert!(first.resources().has(key));
        assert!(!second.resources().has(key));

        second.resources_mut().bind(key, Arc::new(Holder(2))).unwrap();
        let one = first.resources_mut().unbind::<Holder>(key).unwrap();
        let two = second.resources_mut().unbind::<Holder>(key).unwrap();
        assert_eq!((one.0, two.0), (1, 2));
    }

    #[test]
    fn test_context_moves_between_threads() {
        let key = ResourceKey::next();
        let mut context = ExecutionContext::new();
        context.resources_mut().bind(key, Arc::new(Holder(7))).unwrap();

        let mut context = thread::spawn(move || {
            assert!(context.resources().has(key));
            context
        })
        .join()
        .unwrap();
        let holder = context.resources_mut().unbind::<Holder>(key).unwrap();
        assert_eq!(holder.0, 7);
    }
}

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{RegistryError, RegistryResult};
use crate::id::{ContextId, ResourceKey};

/// A value that can be bound in a [`ResourceRegistry`].
pub trait BoundResource: Any + Send + Sync {
    /// Returns true once the holder has been cleared and must no longer be handed out.
    fn is_void(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Mapping from resource-factory key to the holder bound for it, scoped to one execution
/// context.
pub struct ResourceRegistry {
    context: ContextId,
    resources: HashMap<ResourceKey, Arc<dyn BoundResource>>,
}

impl ResourceRegistry {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            resources: HashMap::new(),
        }
    }

    #[inline]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Returns true if a non-void holder is bound for `key`.
    pub fn has(&self, key: ResourceKey) -> bool {
        self.resources.get(&key).is_some_and(|holder| !holder.is_void())
    }

    /// Retrieves the holder bound for `key`.
    ///
    /// A void holder found under `key` is removed and reported as absent.
    pub fn get<H: BoundResource>(&mut self, key: ResourceKey) -> RegistryResult<Option<Arc<H>>> {
        let Some(holder) = self.resources.get(&key) else {
            return Ok(None);
        };
        if holder.is_void() {
            self.resources.remove(&key);
            trace!(context = %self.context, %key, "dropped void resource holder");
            return Ok(None);
        }
        self.downcast(key, holder.clone()).map(Some)
    }

    /// Binds `holder` for `key`. Fails if a non-void holder is already bound.
    pub fn bind<H: BoundResource>(
        &mut self,
        key: ResourceKey,
        holder: Arc<H>,
    ) -> RegistryResult<()> {
        if self.has(key) {
            return Err(RegistryError::AlreadyBound {
                key,
                context: self.context,
            });
        }
        self.resources.insert(key, holder);
        trace!(context = %self.context, %key, "bound resource holder");
        Ok(())
    }

    /// Removes and returns the holder bound for `key`. Fails if nothing is bound.
    pub fn unbind<H: BoundResource>(&mut self, key: ResourceKey) -> RegistryResult<Arc<H>> {
        self.unbind_if_possible(key)?
            .ok_or(RegistryError::NotBound {
                key,
                context: self.context,
            })
    }

    /// Removes and returns the holder bound for `key`, if any.
    ///
    /// The binding is left in place when it holds a different holder type.
    pub fn unbind_if_possible<H: BoundResource>(
        &mut self,
        key: ResourceKey,
    ) -> RegistryResult<Option<Arc<H>>> {
        match self.resources.get(&key) {
            None => return Ok(None),
            Some(holder) if !holder.as_any().is::<H>() => {
                return Err(self.mismatch::<H>(key));
            }
            Some(_) => {}
        }
        let Some(holder) = self.resources.remove(&key) else {
            return Ok(None);
        };
        trace!(context = %self.context, %key, "unbound resource holder");
        if holder.is_void() {
            return Ok(None);
        }
        self.downcast(key, holder).map(Some)
    }

    pub fn keys(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.resources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Drops every binding, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.resources.len();
        self.resources.clear();
        count
    }

    fn downcast<H: BoundResource>(
        &self,
        key: ResourceKey,
        holder: Arc<dyn BoundResource>,
    ) -> RegistryResult<Arc<H>> {
        holder
            .into_any()
            .downcast::<H>()
            .map_err(|_| self.mismatch::<H>(key))
    }

    fn mismatch<H>(&self, key: ResourceKey) -> RegistryError {
        RegistryError::HolderTypeMismatch {
            key,
            context: self.context,
            expected: type_name::<H>(),
        }
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("context", &self.context)
            .field("keys", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct Holder {
        void: AtomicBool,
    }

    impl BoundResource for Holder {
        fn is_void(&self) -> bool {
            self.void.load(Ordering::SeqCst)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Other;

    impl BoundResource for Other {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(ContextId::next())
    }

    #[test]
    fn test_bind_get_unbind() {
        let mut registry = registry();
        let key = ResourceKey::next();
        let holder = Arc::new(Holder::default());

        assert!(registry.get::<Holder>(key).unwrap().is_none());
        registry.bind(key, holder.clone()).unwrap();
        assert!(registry.has(key));

        let bound = registry.get::<Holder>(key).unwrap().unwrap();
        assert!(Arc::ptr_eq(&bound, &holder));

        let unbound = registry.unbind::<Holder>(key).unwrap();
        assert!(Arc::ptr_eq(&unbound, &holder));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bind_twice_fails() {
        let mut registry = registry();
        let key = ResourceKey::next();
        registry.bind(key, Arc::new(Holder::default())).unwrap();
        let err = registry.bind(key, Arc::new(Holder::default())).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyBound { key: k, .. } if k == key));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unbind_empty_fails() {
        let mut registry = registry();
        let key = ResourceKey::next();
        let err = registry.unbind::<Holder>(key).unwrap_err();
        assert!(matches!(err, RegistryError::NotBound { key: k, .. } if k == key));
        assert!(registry.unbind_if_possible::<Holder>(key).unwrap().is_none());
    }

    #[test]
    fn test_void_holder_is_purged() {
        let mut registry = registry();
        let key = ResourceKey::next();
        let holder = Arc::new(Holder::default());
        registry.bind(key, holder.clone()).unwrap();

        holder.void.store(true, Ordering::SeqCst);
        assert!(!registry.has(key));
        assert!(registry.get::<Holder>(key).unwrap().is_none());
        assert!(registry.is_empty());

        // a void binding does not block a new one
        registry.bind(key, holder.clone()).unwrap();
        registry.bind(key, Arc::new(Holder::default())).unwrap();
    }

    #[test]
    fn test_type_mismatch_keeps_binding() {
        let mut registry = registry();
        let key = ResourceKey::next();
        registry.bind(key, Arc::new(Other)).unwrap();

        assert!(matches!(
            registry.get::<Holder>(key),
            Err(RegistryError::HolderTypeMismatch { .. })
        ));
        assert!(matches!(
            registry.unbind::<Holder>(key),
            Err(RegistryError::HolderTypeMismatch { .. })
        ));
        assert!(registry.has(key));
        assert!(registry.unbind::<Other>(key).is_ok());
    }

    #[test]
    fn test_clear() {
        let mut registry = registry();
        registry.bind(ResourceKey::next(), Arc::new(Holder::default())).unwrap();
        registry.bind(ResourceKey::next(), Arc::new(Other)).unwrap();
        assert_eq!(registry.keys().count(), 2);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}

//! Type-keyed service collection with registration markers.
//!
//! Registrars add the services they wire into a [`ServiceCollection`];
//! consumers resolve them by *interface type* (which may be a trait object).
//! Services can be keyed, so a provider family with several configured
//! instances registers one entry per scheme under the same type.
//!
//! The collection also owns the registration markers: a set of type keys
//! recording which registrars have already been processed. The marker set
//! grows monotonically for the lifetime of the collection.
//!
//! Implementation details:
//! - Key = (type name, optional service key). `type_name::<T>()` works for `T = dyn Trait`.
//! - Value = `Arc<T>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Marker check-and-set happens under one write lock, so concurrent callers
//!   observe exactly one winner.

use parking_lot::RwLock;
use std::{
    any::Any,
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// Stable type key — uses fully-qualified `type_name::<T>()`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeKey(&'static str);

impl TypeKey {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey(std::any::type_name::<T>())
    }

    /// Fully-qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Optional service key (e.g. an authentication scheme name).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ServiceKey(Option<Arc<str>>);

impl ServiceKey {
    #[inline]
    fn unkeyed() -> Self {
        ServiceKey(None)
    }

    #[inline]
    fn named(s: impl Into<Arc<str>>) -> Self {
        ServiceKey(Some(s.into()))
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("<unkeyed>"),
            Some(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service not found: type={type_key:?}, key={key:?}")]
    NotFound { type_key: TypeKey, key: ServiceKey },

    #[error("type mismatch in service collection for type={type_key:?}, key={key:?}")]
    TypeMismatch { type_key: TypeKey, key: ServiceKey },
}

type Boxed = Box<dyn Any + Send + Sync>;

type ServiceMap = HashMap<(TypeKey, ServiceKey), Boxed>;

/// Registry of services keyed by (interface type, optional key), plus registration markers.
pub struct ServiceCollection {
    services: RwLock<ServiceMap>,
    markers: RwLock<HashSet<TypeKey>>,
}

impl ServiceCollection {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            markers: RwLock::new(HashSet::new()),
        }
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("services", &self.services.read().keys().collect::<Vec<_>>())
            .field("markers", &self.markers.read())
            .finish()
    }
}

impl ServiceCollection {
    /// Register a singleton under the interface type `T`.
    /// `T` can be a trait object like `dyn my_provider::TokenIssuer`.
    pub fn add_singleton<T>(&self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceKey::unkeyed(), service);
    }

    /// Register a singleton under the interface type `T` and a service key.
    pub fn add_keyed_singleton<T>(&self, key: impl Into<Arc<str>>, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceKey::named(key), service);
    }

    fn insert<T>(&self, key: ServiceKey, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        tracing::trace!(service = type_key.name(), key = ?key, "Adding service");
        self.services
            .write()
            .insert((type_key, key), Box::new(service));
    }

    /// Resolve an unkeyed service by interface type `T`.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if nothing is registered under `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve::<T>(ServiceKey::unkeyed())
    }

    /// Resolve a keyed service by interface type `T`.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if nothing is registered under `T` and `key`.
    pub fn get_keyed<T>(&self, key: impl Into<Arc<str>>) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve::<T>(ServiceKey::named(key))
    }

    fn resolve<T>(&self, key: ServiceKey) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        let r = self.services.read();

        let boxed = r
            .get(&(type_key.clone(), key.clone()))
            .ok_or_else(|| ServiceError::NotFound {
                type_key: type_key.clone(),
                key: key.clone(),
            })?;

        // Stored value is exactly `Arc<T>`.
        boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ServiceError::TypeMismatch { type_key, key })
    }

    /// Whether an unkeyed service is registered under `T`.
    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .read()
            .contains_key(&(TypeKey::of::<T>(), ServiceKey::unkeyed()))
    }

    /// Introspection: total service entries (markers excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    /// Whether a marker for `T` has been recorded.
    #[must_use]
    pub fn is_marker_type_registered<T: ?Sized + 'static>(&self) -> bool {
        self.markers.read().contains(&TypeKey::of::<T>())
    }

    /// Record a marker for `T`.
    ///
    /// Returns `true` if this call inserted the marker, `false` if it was already present.
    pub fn mark_type_as_registered<T: ?Sized + 'static>(&self) -> bool {
        self.markers.write().insert(TypeKey::of::<T>())
    }
}

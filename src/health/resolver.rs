// src/health/resolver.rs
use super::check::HealthCheck;
use dashmap::DashMap;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Names a health check type whose instance is supplied at run time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeDescriptor {
    type_name: String,
}

impl ProbeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn of<T: HealthCheck + 'static>() -> Self {
        Self::new(type_name::<T>())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)
    }
}

/// Turns a descriptor into a live check.
pub trait ProbeResolver: Send + Sync {
    fn resolve(&self, descriptor: &ProbeDescriptor) -> Option<Arc<dyn HealthCheck>>;
}

#[derive(Debug, thiserror::Error)]
#[error("no health check registered for type '{descriptor}'")]
pub struct ResolveError {
    pub descriptor: ProbeDescriptor,
}

/// Resolver for registries that only hold concrete checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl ProbeResolver for NoopResolver {
    fn resolve(&self, _descriptor: &ProbeDescriptor) -> Option<Arc<dyn HealthCheck>> {
        None
    }
}

type Factory = dyn Fn() -> Arc<dyn HealthCheck> + Send + Sync;

/// Factory-backed resolver. The first instance stored for a descriptor is
/// shared by every later resolution. Concurrent first resolutions may each
/// call the factory; only one of the instances is kept.
#[derive(Default)]
pub struct ServiceResolver {
    factories: DashMap<ProbeDescriptor, Arc<Factory>>,
    instances: DashMap<ProbeDescriptor, Arc<dyn HealthCheck>>,
}

impl ServiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, F>(&self, factory: F) -> ProbeDescriptor
    where
        T: HealthCheck + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let descriptor = ProbeDescriptor::of::<T>();
        let factory: Arc<Factory> = Arc::new(move || Arc::new(factory()) as Arc<dyn HealthCheck>);
        self.factories.insert(descriptor.clone(), factory);
        self.instances.remove(&descriptor);
        descriptor
    }

    pub fn register_instance<T>(&self, instance: T) -> ProbeDescriptor
    where
        T: HealthCheck + 'static,
    {
        let descriptor = ProbeDescriptor::of::<T>();
        self.factories.remove(&descriptor);
        self.instances.insert(descriptor.clone(), Arc::new(instance));
        descriptor
    }

    pub fn is_registered(&self, descriptor: &ProbeDescriptor) -> bool {
        self.instances.contains_key(descriptor) || self.factories.contains_key(descriptor)
    }
}

impl ProbeResolver for ServiceResolver {
    fn resolve(&self, descriptor: &ProbeDescriptor) -> Option<Arc<dyn HealthCheck>> {
        if let Some(instance) = self.instances.get(descriptor) {
            return Some(instance.value().clone());
        }

        // The factory runs with no map guard held, so it may resolve other
        // checks through this resolver.
        let factory = self.factories.get(descriptor)?.value().clone();
        let created = factory();
        tracing::debug!("Resolved health check type '{}'", descriptor);

        let instance = self
            .instances
            .entry(descriptor.clone())
            .or_insert(created)
            .value()
            .clone();
        Some(instance)
    }
}

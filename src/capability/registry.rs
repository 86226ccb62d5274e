// src/capability/registry.rs
//! Capability registration and dispatch

use crate::error::{AcqError, AcqResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Predicate evaluated at the moment of use
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Capability action, returning whether it succeeded
pub type Action = Arc<dyn Fn() -> bool + Send + Sync>;

/// One fully bound optional feature
#[derive(Clone)]
pub struct Capability {
    name: String,
    available: Predicate,
    enabled: Predicate,
    perform: Action,
}

impl Capability {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        (self.available)()
    }

    /// Enabled implies available
    pub fn is_enabled(&self) -> bool {
        self.is_available() && (self.enabled)()
    }

    fn perform(&self) -> bool {
        (self.perform)()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Partially specified capability, as produced by device code that binds
/// members conditionally.
///
/// A binding with no members is skipped; one with only some members is a
/// configuration error.
#[derive(Default)]
pub struct CapabilityBinding {
    name: String,
    available: Option<Predicate>,
    enabled: Option<Predicate>,
    perform: Option<Action>,
}

impl CapabilityBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn available<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.available = Some(Arc::new(predicate));
        self
    }

    pub fn enabled<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(predicate));
        self
    }

    pub fn perform<F>(mut self, action: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.perform = Some(Arc::new(action));
        self
    }

    fn missing_members(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.available.is_none() {
            missing.push("available");
        }
        if self.enabled.is_none() {
            missing.push("enabled");
        }
        if self.perform.is_none() {
            missing.push("perform");
        }
        missing
    }
}

/// Collects capabilities while a device connects
#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    entries: Vec<Capability>,
}

impl CapabilityRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fully bound capability
    pub fn register<A, E, P>(
        &mut self,
        name: impl Into<String>,
        available: A,
        enabled: E,
        perform: P,
    ) -> AcqResult<()>
    where
        A: Fn() -> bool + Send + Sync + 'static,
        E: Fn() -> bool + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.insert(Capability {
            name: name.into(),
            available: Arc::new(available),
            enabled: Arc::new(enabled),
            perform: Arc::new(perform),
        })
    }

    /// Register a binding, returning whether it was registered
    pub fn register_binding(&mut self, binding: CapabilityBinding) -> AcqResult<bool> {
        let missing = binding.missing_members();
        if missing.len() == 3 {
            tracing::debug!(feature = %binding.name, "skipping capability with no bound members");
            return Ok(false);
        }

        match binding {
            CapabilityBinding {
                name,
                available: Some(available),
                enabled: Some(enabled),
                perform: Some(perform),
            } => {
                self.insert(Capability {
                    name,
                    available,
                    enabled,
                    perform,
                })?;
                Ok(true)
            }
            CapabilityBinding { name, .. } => Err(AcqError::Configuration(format!(
                "capability '{}' is partially bound, missing: {}",
                name,
                missing.join(", ")
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn build(self) -> CapabilityRegistry {
        let index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name.clone(), i))
            .collect();
        CapabilityRegistry {
            entries: self.entries,
            index,
        }
    }

    fn insert(&mut self, capability: Capability) -> AcqResult<()> {
        if capability.name.trim().is_empty() {
            return Err(AcqError::Configuration(
                "capability name must not be empty".to_string(),
            ));
        }
        if self.contains(&capability.name) {
            return Err(AcqError::Configuration(format!(
                "capability '{}' is registered more than once",
                capability.name
            )));
        }
        self.entries.push(capability);
        Ok(())
    }
}

/// Immutable table of optional features bound to one connected device.
///
/// Probes never fail on unknown names so callers can check optimistically.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: Vec<Capability>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.get(name).is_some_and(Capability::is_available)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(Capability::is_enabled)
    }

    /// Run a capability action after re-checking availability and enabled-ness
    pub fn invoke(&self, name: &str) -> AcqResult<bool> {
        let capability = self
            .get(name)
            .filter(|capability| capability.is_enabled())
            .ok_or_else(|| AcqError::UnsupportedFeature(name.to_string()))?;

        let succeeded = capability.perform();
        tracing::debug!(feature = name, succeeded, "capability invoked");
        Ok(succeeded)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Capability::name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of capabilities injected into a device at construction.
///
/// Providers register after the hardware's own capabilities, on every
/// connect.
pub trait CapabilityProvider: Send + Sync {
    fn register(&self, registry: &mut CapabilityRegistryBuilder) -> AcqResult<()>;
}

impl<F> CapabilityProvider for F
where
    F: Fn(&mut CapabilityRegistryBuilder) -> AcqResult<()> + Send + Sync,
{
    fn register(&self, registry: &mut CapabilityRegistryBuilder) -> AcqResult<()> {
        self(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn test_unknown_names_probe_false() {
        let registry = CapabilityRegistry::default();
        assert!(!registry.is_available("FirmwareUpdate"));
        assert!(!registry.is_enabled("FirmwareUpdate"));
        assert!(matches!(
            registry.invoke("FirmwareUpdate"),
            Err(AcqError::UnsupportedFeature(name)) if name == "FirmwareUpdate"
        ));
    }

    #[test]
    fn test_invoke_runs_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut builder = CapabilityRegistry::builder();
        builder
            .register(
                "Calibration",
                || true,
                || true,
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    true
                },
            )
            .unwrap();
        let registry = builder.build();

        assert!(registry.invoke("Calibration").unwrap());
        assert!(registry.invoke("Calibration").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_action_failure_is_reported() {
        let mut builder = CapabilityRegistry::builder();
        builder.register("Flaky", || true, || true, || false).unwrap();
        let registry = builder.build();

        assert!(!registry.invoke("Flaky").unwrap());
    }

    #[test]
    fn test_disabled_feature_is_unsupported() {
        let mut builder = CapabilityRegistry::builder();
        builder
            .register("FirmwareUpdate", || true, || false, || true)
            .unwrap();
        builder
            .register("Ohmeter", || false, || true, || true)
            .unwrap();
        let registry = builder.build();

        assert!(registry.is_available("FirmwareUpdate"));
        assert!(!registry.is_enabled("FirmwareUpdate"));
        assert!(registry.invoke("FirmwareUpdate").is_err());

        assert!(!registry.is_available("Ohmeter"));
        assert!(!registry.is_enabled("Ohmeter"));
        assert!(registry.invoke("Ohmeter").is_err());
    }

    #[test]
    fn test_enabled_is_evaluated_at_use() {
        let enabled = Arc::new(AtomicBool::new(false));
        let flag = enabled.clone();

        let mut builder = CapabilityRegistry::builder();
        builder
            .register("Ohmeter", || true, move || flag.load(Ordering::SeqCst), || true)
            .unwrap();
        let registry = builder.build();

        assert!(!registry.is_enabled("Ohmeter"));
        enabled.store(true, Ordering::SeqCst);
        assert!(registry.is_enabled("Ohmeter"));
        assert!(registry.invoke("Ohmeter").unwrap());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = CapabilityRegistry::builder();
        builder.register("Ohmeter", || true, || true, || true).unwrap();
        let err = builder
            .register("Ohmeter", || true, || true, || true)
            .unwrap_err();
        assert!(matches!(err, AcqError::Configuration(_)));
    }

    #[test]
    fn test_bindings() {
        let mut builder = CapabilityRegistry::builder();

        assert!(!builder
            .register_binding(CapabilityBinding::new("Absent"))
            .unwrap());

        let err = builder
            .register_binding(CapabilityBinding::new("Half").available(|| true).perform(|| true))
            .unwrap_err();
        match err {
            AcqError::Configuration(message) => {
                assert!(message.contains("Half"));
                assert!(message.contains("enabled"));
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }

        assert!(builder
            .register_binding(
                CapabilityBinding::new("Full")
                    .available(|| true)
                    .enabled(|| true)
                    .perform(|| true)
            )
            .unwrap());

        let registry = builder.build();
        assert_eq!(registry.names(), vec!["Full"]);
        assert!(!registry.contains("Absent"));
        assert!(!registry.contains("Half"));
    }

    #[test]
    fn test_names_keep_registration_order() {
        let mut builder = CapabilityRegistry::builder();
        for name in ["FirmwareUpdate", "Ohmeter", "Calibration"] {
            builder.register(name, || true, || true, || true).unwrap();
        }
        let registry = builder.build();
        assert_eq!(registry.names(), vec!["FirmwareUpdate", "Ohmeter", "Calibration"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |registry: &mut CapabilityRegistryBuilder| {
            registry.register("Injected", || true, || true, || true)
        };

        let mut builder = CapabilityRegistry::builder();
        CapabilityProvider::register(&provider, &mut builder).unwrap();
        assert!(builder.build().is_enabled("Injected"));
    }
}

// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::HashMap;

use gdo_app::normalize_name;
use gdo_core::{DoorConfig, DynResult, PinIo};

pub mod sim;

#[cfg(feature = "rppal")]
pub mod raspi;

pub use sim::{SimDoor, SimPins};

pub type BackendFactory = fn(&DoorConfig) -> DynResult<Box<dyn PinIo>>;

/// Context for registering and instantiating pin backends.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, BackendFactory>,
}

impl RegistrationContext {
    /// Create a new empty registration context.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory under a stable name (e.g. "sim").
    pub fn register_backend(&mut self, name: &str, factory: BackendFactory) {
        let key = normalize_name(name);
        self.factories.insert(key, factory);
    }

    /// Check whether a backend name is registered.
    pub fn is_backend_registered(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.factories.contains_key(&key)
    }

    /// List registered backend names.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate the pin backend registered under `name` for this door.
    pub fn build_pins(&self, name: &str, config: &DoorConfig) -> DynResult<Box<dyn PinIo>> {
        let key = normalize_name(name);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| format!("Unknown pin backend: {}", name))?;
        factory(config)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Register all built-in backends enabled by features on a context.
pub fn register_builtin_backends_on(context: &mut RegistrationContext) {
    context.register_backend("sim", sim_factory);
    #[cfg(feature = "rppal")]
    context.register_backend("rppal", rppal_factory);
}

fn sim_factory(config: &DoorConfig) -> DynResult<Box<dyn PinIo>> {
    Ok(Box::new(SimPins::new(SimDoor::from_config(config))))
}

#[cfg(feature = "rppal")]
fn rppal_factory(_config: &DoorConfig) -> DynResult<Box<dyn PinIo>> {
    Ok(Box::new(raspi::RppalPins::new()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration() {
        let mut ctx = RegistrationContext::new();
        register_builtin_backends_on(&mut ctx);
        assert!(ctx.is_backend_registered("sim"));
        assert!(ctx.is_backend_registered("SIM"));
        assert!(ctx.registered_backends().contains(&"sim".to_string()));
    }

    #[test]
    fn test_unknown_backend() {
        let ctx = RegistrationContext::default();
        let err = ctx
            .build_pins("gpiod", &DoorConfig::default())
            .err()
            .map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Unknown pin backend: gpiod"));
    }

    #[test]
    fn test_build_sim() {
        let mut ctx = RegistrationContext::new();
        register_builtin_backends_on(&mut ctx);
        assert!(ctx.build_pins("sim", &DoorConfig::default()).is_ok());
    }
}

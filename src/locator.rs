// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

use crate::config::LocatorConfig;
use crate::error::{LocError, Result};
use crate::gridsearch::GridSearchLocator;
use crate::model::{Origin, PickCatalog};

/// Optional features a locator may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Accepts a caller-provided starting hypocenter.
    InitialLocation = 1,
    /// Can keep the depth fixed.
    FixedDepth = 2,
    /// Can ignore arrivals beyond a distance.
    DistanceCutOff = 4,
    /// Can compute its own starting hypocenter.
    IgnoreInitialLocation = 8,
}

/// Set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No capability.
    pub const NONE: Capabilities = Capabilities(0);

    /// True if `cap` is in the set.
    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap as u8 != 0
    }
}

impl From<Capability> for Capabilities {
    fn from(cap: Capability) -> Self {
        Capabilities(cap as u8)
    }
}

impl BitOr for Capability {
    type Output = Capabilities;

    fn bitor(self, rhs: Capability) -> Capabilities {
        Capabilities(self as u8 | rhs as u8)
    }
}

impl BitOr<Capability> for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capability) -> Capabilities {
        Capabilities(self.0 | rhs as u8)
    }
}

/// A solver that turns an origin with arrivals into a relocated origin.
pub trait Locator {
    /// Registry name.
    fn name(&self) -> &str;

    /// Features this locator supports.
    fn capabilities(&self) -> Capabilities;

    /// True if `cap` is supported.
    fn supports(&self, cap: Capability) -> bool {
        self.capabilities().contains(cap)
    }

    /// Relocate `origin`, resolving picks and stations through `catalog`.
    ///
    /// The input origin is not modified; the result is a new origin.
    fn relocate(&mut self, origin: &Origin, catalog: &dyn PickCatalog) -> Result<Origin>;
}

/// Constructor stored in a [`LocatorRegistry`].
pub type LocatorFactory = fn(&LocatorConfig) -> Result<Box<dyn Locator>>;

/// Name-to-factory map of available locators.
#[derive(Clone, Default)]
pub struct LocatorRegistry {
    factories: BTreeMap<String, LocatorFactory>,
}

impl fmt::Debug for LocatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl LocatorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the locators shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(GridSearchLocator::NAME, |config| {
            Ok(Box::new(GridSearchLocator::from_config(config)?))
        });
        registry
    }

    /// Add or replace a factory.
    pub fn register(&mut self, name: &str, factory: LocatorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }

    /// Instantiate the locator registered under `name`.
    pub fn create(&self, name: &str, config: &LocatorConfig) -> Result<Box<dyn Locator>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LocError::UnknownLocator(name.to_string()))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Locator for Echo {
        fn name(&self) -> &str {
            "ECHO"
        }

        fn capabilities(&self) -> Capabilities {
            Capability::FixedDepth.into()
        }

        fn relocate(&mut self, origin: &Origin, _catalog: &dyn PickCatalog) -> Result<Origin> {
            Ok(origin.clone())
        }
    }

    #[test]
    fn capability_sets() {
        let caps = Capability::InitialLocation | Capability::FixedDepth;
        assert!(caps.contains(Capability::InitialLocation));
        assert!(caps.contains(Capability::FixedDepth));
        assert!(!caps.contains(Capability::DistanceCutOff));
        let caps = caps | Capability::DistanceCutOff;
        assert!(caps.contains(Capability::DistanceCutOff));
        assert!(!Capabilities::NONE.contains(Capability::FixedDepth));
    }

    #[test]
    fn supports_uses_capabilities() {
        assert!(Echo.supports(Capability::FixedDepth));
        assert!(!Echo.supports(Capability::InitialLocation));
    }

    #[test]
    fn registry_dispatch() {
        let mut registry = LocatorRegistry::new();
        registry.register("ECHO", |_| Ok(Box::new(Echo)));
        let loc = registry.create("ECHO", &LocatorConfig::default()).unwrap();
        assert_eq!(loc.name(), "ECHO");
        assert!(matches!(
            registry.create("LOCSAT", &LocatorConfig::default()),
            Err(LocError::UnknownLocator(_))
        ));
    }

    #[test]
    fn builtin_names() {
        let registry = LocatorRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["GRIDSEARCH"]);
    }
}

//! Name-keyed plugin registries.
//!
//! A registry maps a case-insensitive name to a factory. Registration is
//! additive (a later registration under the same name replaces the earlier
//! one) and is expected to happen once, before any build runs. Builders get a
//! [`Plugins`] bundle injected instead of reaching for global state.

use crate::layout::{self, Formation};
use crate::shapes::{self, GrowthShape, ShapeOptions};
use crate::{Error, Result};

/// Builds a growth shape from the caller's overrides.
pub type ShapeFactory = fn(&ShapeOptions) -> Box<dyn GrowthShape>;

/// Builds a layout formation.
pub type FormationFactory = fn() -> Box<dyn Formation>;

pub type ShapeRegistry = PluginRegistry<ShapeFactory>;
pub type FormationRegistry = PluginRegistry<FormationFactory>;

// ============================================================================
// Generic registry
// ============================================================================

#[derive(Clone)]
pub struct PluginRegistry<F> {
    kind: &'static str,
    entries: Vec<(String, F)>,
}

impl<F: Copy> PluginRegistry<F> {
    /// `kind` names the plugin family in error messages ("shape", "formation").
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: Vec::new() }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn register(&mut self, name: &str, factory: F) -> &mut Self {
        let key = name.to_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == key) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((key, factory)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<F> {
        let key = name.to_lowercase();
        self.entries.iter().find(|(n, _)| *n == key).map(|(_, f)| *f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order.
    pub fn list_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `name`, failing with every registered name listed.
    pub fn resolve(&self, name: &str) -> Result<F> {
        self.get(name).ok_or_else(|| Error::UnknownPlugin {
            kind: self.kind,
            name: name.to_string(),
            available: self.list_names().join(", "),
        })
    }
}

impl<F> std::fmt::Debug for PluginRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("kind", &self.kind)
            .field("names", &self.entries.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Concrete registries
// ============================================================================

impl PluginRegistry<ShapeFactory> {
    /// Every built-in growth shape.
    pub fn builtin() -> Self {
        let mut registry = Self::new("shape");
        registry
            .register("organic", shapes::OrganicShape::boxed)
            .register("radial", shapes::RadialShape::boxed)
            .register("grid", shapes::GridShape::boxed)
            .register("linear", shapes::LinearShape::boxed)
            .register("cascade", shapes::CascadeShape::boxed)
            .register("mountain", shapes::MountainShape::boxed)
            .register("spiky", shapes::SpikyShape::boxed)
            .register("cloud", shapes::CloudShape::boxed);
        registry
    }

    pub fn create(&self, name: &str, options: &ShapeOptions) -> Result<Box<dyn GrowthShape>> {
        let factory = self.resolve(name)?;
        Ok(factory(options))
    }
}

impl PluginRegistry<FormationFactory> {
    /// Every built-in layout formation.
    pub fn builtin() -> Self {
        let mut registry = Self::new("formation");
        registry
            .register("radial", layout::RadialFormation::boxed)
            .register("layered", layout::LayeredFormation::boxed);
        registry
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Formation>> {
        let factory = self.resolve(name)?;
        Ok(factory())
    }
}

/// The registries a builder resolves names against.
#[derive(Debug, Clone)]
pub struct Plugins {
    pub shapes: ShapeRegistry,
    pub formations: FormationRegistry,
}

impl Plugins {
    pub fn builtin() -> Self {
        Self {
            shapes: ShapeRegistry::builtin(),
            formations: FormationRegistry::builtin(),
        }
    }
}

impl Default for Plugins {
    fn default() -> Self {
        Self::builtin()
    }
}

//! Type tag → constructor registry used to decode units polymorphically.

use crate::unit::{Unit, UnitType};
use crate::units::{List, Note, Todo};
use std::collections::HashMap;
use unitstore_types::UnitId;

/// Builds an empty unit of one concrete type.
pub type UnitConstructor = fn(UnitId) -> Box<dyn Unit>;

fn construct_blank<T: UnitType>(id: UnitId) -> Box<dyn Unit> {
    Box::new(T::blank(id))
}

/// Maps type tags to constructors.
///
/// New unit types are supported by registering them; nothing else in the storage layer needs
/// to know about them.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    constructors: HashMap<String, UnitConstructor>,
}

impl UnitRegistry {
    /// An empty registry. Loading any unit through it fails with an unknown type.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every unit type defined in this crate.
    pub fn with_builtin_units() -> Self {
        let mut registry = Self::new();
        registry.register::<Note>();
        registry.register::<Todo>();
        registry.register::<List>();
        registry
    }

    /// Registers `T` under [`UnitType::TYPE`], replacing any previous registration.
    pub fn register<T: UnitType>(&mut self) -> &mut Self {
        self.register_with(T::TYPE, construct_blank::<T>)
    }

    /// Registers an arbitrary constructor under `tag`.
    pub fn register_with(&mut self, tag: impl Into<String>, constructor: UnitConstructor) -> &mut Self {
        let tag = tag.into();
        if self.constructors.insert(tag.clone(), constructor).is_some() {
            tracing::debug!(tag = %tag, "replaced unit constructor");
        }
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Builds a blank unit for `tag`, or `None` if the tag is not registered.
    pub fn construct(&self, tag: &str, id: UnitId) -> Option<Box<dyn Unit>> {
        self.constructors.get(tag).map(|constructor| constructor(id))
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_knows_all_units() {
        let registry = UnitRegistry::with_builtin_units();
        assert_eq!(registry.tags(), vec!["list", "note", "todo"]);
    }

    #[test]
    fn test_construct_returns_blank_unit_of_the_tag() {
        let registry = UnitRegistry::with_builtin_units();
        let id = UnitId::new("n1").unwrap();

        let unit = registry.construct("note", id.clone()).expect("note is registered");
        assert_eq!(unit.unit_type(), "note");
        assert_eq!(unit.id(), &id);
        assert!(unit.as_any().downcast_ref::<Note>().is_some());
    }

    #[test]
    fn test_unknown_tag_constructs_nothing() {
        let registry = UnitRegistry::new();
        assert!(!registry.contains("note"));
        assert!(registry
            .construct("note", UnitId::new("x").unwrap())
            .is_none());
    }

    #[test]
    fn test_register_with_overrides_tag() {
        fn as_todo(id: UnitId) -> Box<dyn Unit> {
            Box::new(Todo::blank(id))
        }

        let mut registry = UnitRegistry::with_builtin_units();
        registry.register_with("note", as_todo);
        let unit = registry
            .construct("note", UnitId::new("x").unwrap())
            .unwrap();
        assert_eq!(unit.unit_type(), "todo");
    }
}

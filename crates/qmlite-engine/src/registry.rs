//! Element type registry.
//!
//! Maps class names to factories. The engine owns one registry, seeded with
//! the built-in elements; hosts add their own types through
//! `Engine::register_type`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::elements;
use crate::engine::Engine;
use crate::error::EvalError;
use crate::meta::MetaElement;
use crate::object::{Context, ObjectRef};

/// What a factory needs to create the bare object for one element.
pub struct CreateArgs<'a> {
    pub meta: &'a Rc<MetaElement>,
    /// Owning object.
    pub parent: Option<&'a ObjectRef>,
    /// Component scope the element is declared in.
    pub context: &'a Rc<Context>,
}

/// Creates an object with its declared properties, signals and methods.
/// The constructor applies the element's entries afterwards.
pub type Factory = Rc<dyn Fn(&Engine, &CreateArgs<'_>) -> Result<ObjectRef, EvalError>>;

#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in element types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        elements::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Factory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Factory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = TypeRegistry::with_builtins();
        for name in ["QtObject", "Item", "Rectangle", "Text", "State", "PropertyChanges", "Transition", "NumberAnimation", "PropertyAnimation", "SequentialAnimation", "ParallelAnimation", "Behavior", "Timer"] {
            assert!(registry.contains(name), "{name}");
        }
        assert!(!registry.contains("Flickable"));
        assert_eq!(registry.names().first(), Some(&"Behavior"));
    }
}

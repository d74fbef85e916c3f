//! Per-owner table of decorator definitions.

use crate::arguments::DeclarationContext;
use crate::chain::ChainNode;
use crate::definition::{DecoratorDefinition, DecoratorKind};
use crate::error::DecorateError;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Outcome of putting a definition into a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// the name was not known before
    Created,
    /// the name was known and now resolves to the new behavior
    Replaced,
    /// the very same definition object was registered again
    Unchanged,
}

impl Registration {
    pub fn is_override(self) -> bool {
        self == Registration::Replaced
    }
}

/// Decorator names known to one owner.
///
/// A name resolves either to a definition created here, which [`define`](Registry::define)
/// changes in place, or to a definition shared with other registries through
/// [`adopt`](Registry::adopt), which this registry never changes.
pub struct Registry<V> {
    owner: Arc<str>,
    definitions: HashMap<String, Arc<DecoratorDefinition<V>>>,
    local: HashSet<String>,
}

impl<V> Registry<V> {
    pub fn new(owner: impl Into<Arc<str>>) -> Self {
        Self { owner: owner.into(), definitions: HashMap::new(), local: HashSet::new() }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Create `name`, or override it.
    ///
    /// A definition created by this registry is replaced in place. A shared one is
    /// left alone and shadowed by a new definition local to this registry.
    pub fn define(&mut self, name: &str, kind: DecoratorKind<V>) -> (Arc<DecoratorDefinition<V>>, Registration) {
        if self.local.contains(name)
            && let Some(existing) = self.definitions.get(name)
        {
            existing.redefine(kind);
            return (Arc::clone(existing), Registration::Replaced);
        }

        let definition = Arc::new(DecoratorDefinition::new(name, kind));
        let registration = match self.definitions.insert(name.to_owned(), Arc::clone(&definition)) {
            None => Registration::Created,
            Some(_) => Registration::Replaced,
        };
        self.local.insert(name.to_owned());
        (definition, registration)
    }

    /// Register a definition object shared with other registries.
    pub fn adopt(&mut self, definition: Arc<DecoratorDefinition<V>>) -> Registration {
        let name = definition.name().to_owned();
        match self.definitions.insert(name.clone(), Arc::clone(&definition)) {
            None => {
                self.local.remove(&name);
                Registration::Created
            }
            Some(previous) if Arc::ptr_eq(&previous, &definition) => Registration::Unchanged,
            Some(_) => {
                self.local.remove(&name);
                Registration::Replaced
            }
        }
    }

    /// Whether `name` resolves to `definition` itself.
    pub fn resolves_to(&self, name: &str, definition: &Arc<DecoratorDefinition<V>>) -> bool {
        self.get(name).is_some_and(|current| Arc::ptr_eq(current, definition))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DecoratorDefinition<V>>> {
        self.definitions.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<DecoratorDefinition<V>>, DecorateError> {
        self.get(name).cloned().ok_or_else(|| DecorateError::unknown_decorator(&self.owner, name))
    }

    /// Look up `name` and create a free chain node from it.
    pub fn instantiate(&self, name: &str, context: DeclarationContext<V>) -> Result<Arc<ChainNode<V>>, DecorateError> {
        self.lookup(name)?.instantiate(context)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<V> Debug for Registry<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = self.definitions.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Registry").field("owner", &self.owner).field("decorators", &names).finish()
    }
}

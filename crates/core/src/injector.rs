//! The per-owner injection state machine.
//!
//! Per scope an injector is either idle or pending. Queueing a decoration makes
//! the scope pending; the next method definition of that scope consumes the whole
//! pending chain and merges it into the method's bound chain, installing the
//! method's dispatch shim the first time. Binding by name skips the pending state
//! and merges straight into the named method.
//!
//! All declaration-time transitions of one owner run in a single critical
//! section. Dispatch only takes that lock long enough to find the shim, the chain
//! itself is walked without it.

use crate::arguments::{Arguments, Block, DeclarationContext, InvokeResult, Value};
use crate::chain::{ChainNode, link};
use crate::definition::{DecoratorDefinition, DecoratorKind};
use crate::error::DecorateError;
use crate::observer::{DecorationObserver, LogObserver};
use crate::registry::{Registration, Registry};
use crate::scope::{MethodKey, Scope};
use crate::shim::DispatchShim;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, trace};

/// Observable state of one scope of an injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionState {
    /// nothing queued, the next method definition is left alone
    Idle,
    /// `queued` decorations wait for the next method definition
    Pending { queued: usize },
}

struct Inner<V> {
    registry: Registry<V>,
    pending: [Option<Arc<ChainNode<V>>>; 2],
    shims: HashMap<MethodKey, Arc<DispatchShim<V>>>,
}

impl<V> Inner<V> {
    fn pending_mut(&mut self, scope: Scope) -> &mut Option<Arc<ChainNode<V>>> {
        match scope {
            Scope::Instance => &mut self.pending[0],
            Scope::Type => &mut self.pending[1],
        }
    }

    fn pending(&self, scope: Scope) -> Option<&Arc<ChainNode<V>>> {
        match scope {
            Scope::Instance => self.pending[0].as_ref(),
            Scope::Type => self.pending[1].as_ref(),
        }
    }

    /// Merge `chain` into the bound chain of `method`, returns the shim and whether
    /// it was installed by this call.
    fn merge(
        &mut self,
        owner: &Arc<str>,
        method: MethodKey,
        chain: Arc<ChainNode<V>>,
    ) -> Result<(Arc<DispatchShim<V>>, bool), DecorateError> {
        if let Some(shim) = self.shims.get(&method) {
            link(Some(Arc::clone(shim.chain())), chain)?;
            return Ok((Arc::clone(shim), false));
        }

        let shim = Arc::new(DispatchShim::new(Arc::clone(owner), method.clone(), chain));
        self.shims.insert(method, Arc::clone(&shim));
        Ok((shim, true))
    }
}

/// Binds queued decorations to the methods of one owner.
///
/// An injector is meant to be created once per owner type and shared, by
/// `Arc`, with every owner composed from it.
pub struct Injector<V> {
    owner: Arc<str>,
    inner: RwLock<Inner<V>>,
    observer: Arc<dyn DecorationObserver>,
}

impl<V: Value> Injector<V> {
    pub fn new(owner: impl Into<Arc<str>>) -> Self {
        Self::builder().owner(owner).build()
    }

    pub fn builder() -> InjectorBuilder<V> {
        InjectorBuilder::new()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, name: &str, registration: Registration) {
        if registration.is_override() {
            self.observer.on_redefined(&self.owner, name);
        }
    }

    /// Create or override a decorator definition of this owner.
    ///
    /// Overriding is allowed and reported to the observer.
    pub fn register_definition(&self, name: &str, kind: DecoratorKind<V>) -> Arc<DecoratorDefinition<V>> {
        let (definition, registration) = self.write().registry.define(name, kind);
        self.report(name, registration);
        definition
    }

    /// Register a definition object shared with other owners.
    pub fn register_shared(&self, definition: Arc<DecoratorDefinition<V>>) -> Registration {
        let name = definition.name().to_owned();
        let registration = self.write().registry.adopt(definition);
        self.report(&name, registration);
        registration
    }

    /// Report that a shared `definition` was redefined where it was declared.
    ///
    /// The observer hears about it only while this owner still resolves the name
    /// to that very definition. Returns whether it was reported.
    pub fn report_redefinition(&self, definition: &Arc<DecoratorDefinition<V>>) -> bool {
        let resolves = self.read().registry.resolves_to(definition.name(), definition);
        if resolves {
            self.observer.on_redefined(&self.owner, definition.name());
        }
        resolves
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<DecoratorDefinition<V>>, DecorateError> {
        self.read().registry.lookup(name)
    }

    pub fn decorator_names(&self) -> Vec<String> {
        let mut names = self.read().registry.names().map(str::to_owned).collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Create a free chain node for `name`, to be used with [`bind_by_name`](Injector::bind_by_name).
    pub fn instantiate(&self, name: &str, context: DeclarationContext<V>) -> Result<Arc<ChainNode<V>>, DecorateError> {
        // the factory runs outside the lock, it may call back into this injector
        self.lookup(name)?.instantiate(context)
    }

    /// Append a decoration to the pending chain of `scope`.
    pub fn queue_decoration(
        &self,
        scope: Scope,
        name: &str,
        context: DeclarationContext<V>,
    ) -> Result<Arc<ChainNode<V>>, DecorateError> {
        let node = self.instantiate(name, context)?;
        {
            let mut inner = self.write();
            let pending = inner.pending_mut(scope);
            *pending = Some(link(pending.clone(), Arc::clone(&node))?);
            node.mark_queued();
        }
        self.observer.on_queued(&self.owner, scope, name);
        Ok(node)
    }

    /// A method named `method_name` was just defined in `scope`.
    ///
    /// Consumes the pending chain of `scope`, if any, and merges it into the
    /// method. Returns the method's shim when something was bound.
    pub fn notify_method_defined(&self, scope: Scope, method_name: &str) -> Option<Arc<DispatchShim<V>>> {
        let method = MethodKey::new(scope, method_name);
        let (shim, installed, added) = {
            let mut inner = self.write();
            let Some(chain) = inner.pending_mut(scope).take() else {
                trace!(owner = %self.owner, %method, "method defined without pending decorations");
                return None;
            };
            chain.mark_bound();
            let added = chain.len();
            match inner.merge(&self.owner, method, chain) {
                Ok((shim, installed)) => (shim, installed, added),
                Err(e) => {
                    error!(owner = %self.owner, scope = %scope, method = method_name, cause = %e, "pending decorations dropped");
                    return None;
                }
            }
        };
        trace!(owner = %self.owner, method = %shim.method(), added, "pending decorations consumed");
        self.observer.on_bound(&self.owner, shim.method(), shim.len(), installed);
        Some(shim)
    }

    /// Merge a free chain into an already defined method, without waiting for a
    /// method definition.
    pub fn bind_by_name(
        &self,
        scope: Scope,
        method_name: &str,
        chain: Arc<ChainNode<V>>,
    ) -> Result<Arc<DispatchShim<V>>, DecorateError> {
        let method = MethodKey::new(scope, method_name);
        let (shim, installed) = {
            let mut inner = self.write();
            chain.claim_free()?;
            inner.merge(&self.owner, method, chain)?
        };
        self.observer.on_bound(&self.owner, shim.method(), shim.len(), installed);
        Ok(shim)
    }

    /// Instantiate `name` and bind it to `method_name` right away.
    pub fn decorate_method(
        &self,
        scope: Scope,
        method_name: &str,
        name: &str,
        context: DeclarationContext<V>,
    ) -> Result<Arc<DispatchShim<V>>, DecorateError> {
        let node = self.instantiate(name, context)?;
        self.bind_by_name(scope, method_name, node)
    }

    /// Call `method_name` through its dispatch shim.
    ///
    /// Methods without bound decorations run `original` directly.
    pub fn invoke<F>(
        &self,
        scope: Scope,
        method_name: &str,
        arguments: Arguments<V>,
        block: Option<Block<V>>,
        original: F,
    ) -> InvokeResult<V>
    where
        F: Fn(Arguments<V>, Option<&Block<V>>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        match self.shim(scope, method_name) {
            Some(shim) => shim.call(arguments, block, original),
            None => original(arguments, block.as_ref()),
        }
    }

    pub fn shim(&self, scope: Scope, method_name: &str) -> Option<Arc<DispatchShim<V>>> {
        self.read().shims.get(&MethodKey::new(scope, method_name)).cloned()
    }

    pub fn shim_count(&self) -> usize {
        self.read().shims.len()
    }

    pub fn state(&self, scope: Scope) -> InjectionState {
        match self.read().pending(scope) {
            None => InjectionState::Idle,
            Some(chain) => InjectionState::Pending { queued: chain.len() },
        }
    }

    /// Head of the pending chain of `scope`.
    pub fn pending(&self, scope: Scope) -> Option<Arc<ChainNode<V>>> {
        self.read().pending(scope).cloned()
    }
}

impl<V> Debug for Injector<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector").field("owner", &self.owner).finish_non_exhaustive()
    }
}

pub struct InjectorBuilder<V> {
    owner: Option<Arc<str>>,
    observer: Option<Arc<dyn DecorationObserver>>,
    _phantom: PhantomData<fn() -> V>,
}

impl<V: Value> InjectorBuilder<V> {
    fn new() -> Self {
        Self { owner: None, observer: None, _phantom: PhantomData }
    }

    /// Name used in diagnostics, usually the owner type's name.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: impl DecorationObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    #[must_use]
    pub fn shared_observer(mut self, observer: Arc<dyn DecorationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Injector<V> {
        let owner = self.owner.unwrap_or_else(|| Arc::from("<anonymous>"));
        let observer = self.observer.unwrap_or_else(|| Arc::new(LogObserver));
        let registry = Registry::new(Arc::clone(&owner));
        Injector {
            owner,
            inner: RwLock::new(Inner { registry, pending: [None, None], shims: HashMap::new() }),
            observer,
        }
    }
}

impl<V> Debug for InjectorBuilder<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectorBuilder").field("owner", &self.owner).finish_non_exhaustive()
    }
}

use crate::scope::{MethodKey, Scope};
use tracing::{debug, warn};

/// Receives the declaration-time events of an injector.
///
/// Every method has a no-op default, implement only what you need. Observers are
/// called outside the injector's critical section and may call back into it.
#[cfg_attr(test, mockall::automock)]
pub trait DecorationObserver: Send + Sync {
    /// A decorator name was registered again and now resolves to the new definition.
    fn on_redefined(&self, _owner: &str, _decorator: &str) {}

    /// A decoration was queued and waits for the next method definition of `scope`.
    fn on_queued(&self, _owner: &str, _scope: Scope, _decorator: &str) {}

    /// A chain was merged into `method`.
    ///
    /// `shim_installed` is true only for the first binding of that method.
    fn on_bound(&self, _owner: &str, _method: &MethodKey, _chain_len: usize, _shim_installed: bool) {}
}

/// The default observer, reports events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl DecorationObserver for LogObserver {
    fn on_redefined(&self, owner: &str, decorator: &str) {
        warn!(owner, decorator, "decorator already defined, overriding");
    }

    fn on_queued(&self, owner: &str, scope: Scope, decorator: &str) {
        debug!(owner, %scope, decorator, "decoration queued");
    }

    fn on_bound(&self, owner: &str, method: &MethodKey, chain_len: usize, shim_installed: bool) {
        debug!(owner, %method, chain_len, shim_installed, "decorations bound");
    }
}

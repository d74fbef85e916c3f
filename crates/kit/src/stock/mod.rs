//! Ready-made decorators.
//!
//! Each function returns a [`DecoratorKind`](micro_decorator::DecoratorKind) to be
//! registered under a name of the caller's choosing, see [`stock_module`].

mod background;
mod memoize;
mod retry;
mod thread_cache;
mod trace;

pub use background::background;
pub use memoize::memoize;
pub use retry::DEFAULT_ATTEMPTS;
pub use retry::retry;
pub use thread_cache::thread_local_cache;
pub use trace::trace;

use crate::module::DecoratorModule;
use micro_decorator::Value;
use std::fmt::Debug;
use std::hash::Hash;

/// A module with `trace`, `memoize`, `thread_local_cache` and `retry` registered
/// under those names.
pub fn stock_module<V>() -> DecoratorModule<V>
where
    V: Value + Debug + Eq + Hash + TryInto<u32>,
{
    let mut module = DecoratorModule::new("Stock");
    module.define("trace", trace());
    module.define("memoize", memoize());
    module.define("thread_local_cache", thread_local_cache());
    module.define("retry", retry());
    module
}

#[cfg(test)]
mod tests {
    use super::stock_module;
    use crate::Owner;
    use micro_decorator::{Arguments, Scope};

    #[test]
    fn test_stock_module() {
        let module = stock_module::<u32>();
        let names = module.definitions().map(|definition| definition.name().to_owned()).collect::<Vec<_>>();
        assert_eq!(names, vec!["memoize", "retry", "thread_local_cache", "trace"]);

        let owner = Owner::new("Stocked");
        owner.include(&module);
        owner.decorate("trace").queue(Scope::Type).unwrap();
        owner.decorate("retry").arg(2).queue(Scope::Type).unwrap();
        owner.decorate("memoize").queue(Scope::Type).unwrap();
        let shim = owner.type_method_defined("config").unwrap();
        assert_eq!(shim.decorator_names(), vec!["trace", "retry", "memoize"]);

        let result = owner.invoke(Scope::Type, "config", Arguments::empty(), None, |_, _| Ok(8));
        assert_eq!(result.unwrap(), 8);
    }
}

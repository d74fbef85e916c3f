use crate::lock;
use micro_decorator::{Arguments, Continuation, DecoratorKind, MethodKey, Value};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// The memoized value of one method, and the thread computing it.
struct Slot<V> {
    value: OnceCell<V>,
    initializer: Mutex<Option<ThreadId>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self { value: OnceCell::new(), initializer: Mutex::new(None) }
    }
}

/// Clears the initializer when the first computation ends, even by panic.
struct Initializing<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for Initializing<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

type Slots<V> = Mutex<HashMap<(String, MethodKey), Arc<Slot<V>>>>;

/// Runs the decorated method once per owner and method, every later call
/// returns the first successful result. Arguments are not part of the key.
///
/// A failed call is not cached, the next call tries again. Concurrent first
/// calls run the method only once. A method that calls itself while computing
/// its first result gets an error instead of waiting on itself.
pub fn memoize<V: Value>() -> DecoratorKind<V> {
    let slots: Arc<Slots<V>> = Arc::default();
    DecoratorKind::context_free(move |c: &Continuation<V>, _: Arguments<V>| {
        let slot = {
            let mut slots = lock(&slots);
            Arc::clone(slots.entry((c.owner().to_owned(), c.method().clone())).or_default())
        };
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }

        let current = thread::current().id();
        if *lock(&slot.initializer) == Some(current) {
            return Err(format!("memoized method {} re-entered while computing its value", c.method()).into());
        }

        slot.value
            .get_or_try_init(|| {
                *lock(&slot.initializer) = Some(current);
                let _initializing = Initializing(&slot.initializer);
                c.proceed()
            })
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::memoize;
    use micro_decorator::{Arguments, Injector, Scope};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_memoize_runs_once() {
        let injector = Injector::<i64>::new("Constants");
        injector.register_definition("memoize", memoize());
        injector.decorate_method(Scope::Type, "answer", "memoize", Default::default()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let result = injector.invoke(Scope::Type, "answer", Arguments::empty(), None, move |_, _| {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as i64 + 42)
            });
            assert_eq!(result.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_memoize_skips_failures() {
        let injector = Injector::<i64>::new("Constants");
        injector.register_definition("memoize", memoize());
        injector.decorate_method(Scope::Type, "flaky", "memoize", Default::default()).unwrap();

        let result = injector.invoke(Scope::Type, "flaky", Arguments::empty(), None, |_, _| Err("not yet".into()));
        assert!(result.is_err());

        let result = injector.invoke(Scope::Type, "flaky", Arguments::empty(), None, |_, _| Ok(1));
        assert_eq!(result.unwrap(), 1);
        let result = injector.invoke(Scope::Type, "flaky", Arguments::empty(), None, |_, _| Ok(2));
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_memoize_per_method() {
        let injector = Injector::<i64>::new("Constants");
        injector.register_definition("memoize", memoize());
        injector.decorate_method(Scope::Type, "one", "memoize", Default::default()).unwrap();
        injector.decorate_method(Scope::Type, "two", "memoize", Default::default()).unwrap();

        assert_eq!(injector.invoke(Scope::Type, "one", Arguments::empty(), None, |_, _| Ok(1)).unwrap(), 1);
        assert_eq!(injector.invoke(Scope::Type, "two", Arguments::empty(), None, |_, _| Ok(2)).unwrap(), 2);
    }

    #[test]
    fn test_memoize_reentry_fails_fast() {
        let injector = Arc::new(Injector::<i64>::new("Constants"));
        injector.register_definition("memoize", memoize());
        injector.decorate_method(Scope::Type, "answer", "memoize", Default::default()).unwrap();

        let inner = Arc::clone(&injector);
        let result = injector.invoke(Scope::Type, "answer", Arguments::empty(), None, move |_, _| {
            inner.invoke(Scope::Type, "answer", Arguments::empty(), None, |_, _| Ok(1))
        });
        assert!(result.unwrap_err().to_string().contains("re-entered"));

        // nothing was cached and the slot is usable again
        let result = injector.invoke(Scope::Type, "answer", Arguments::empty(), None, |_, _| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }
}

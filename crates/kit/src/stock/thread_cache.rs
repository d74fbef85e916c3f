use micro_decorator::{Arguments, Continuation, DeclarationContext, DecoratorKind, Value};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STORE: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Per store id, a `HashMap<V, V>` of this thread's cached values. Dropped with the thread.
    static STORES: RefCell<HashMap<u64, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

fn cached<V: Value + Eq + Hash>(store: u64, key: &V) -> Option<V> {
    STORES.with_borrow(|stores| stores.get(&store)?.downcast_ref::<HashMap<V, V>>()?.get(key).cloned())
}

fn remember<V: Value + Eq + Hash>(store: u64, key: V, value: V) -> V {
    STORES.with_borrow_mut(|stores| {
        let entries = stores.entry(store).or_insert_with(|| Box::new(HashMap::<V, V>::new()) as Box<dyn Any>);
        match entries.downcast_mut::<HashMap<V, V>>() {
            Some(entries) => entries.entry(key).or_insert(value).clone(),
            None => value,
        }
    })
}

/// Caches the decorated method's result per thread under a key given at
/// declaration, e.g. `decorate("thread_local_cache").arg(key)`.
///
/// Methods declared with the same key share the cached value on each thread. A
/// thread's values go away with the thread.
pub fn thread_local_cache<V: Value + Eq + Hash>() -> DecoratorKind<V> {
    let store = NEXT_STORE.fetch_add(1, Ordering::Relaxed);
    DecoratorKind::context_factory(move |context: &DeclarationContext<V>| {
        let key = context.arg(0).cloned().ok_or("thread_local_cache needs a cache key")?;

        Ok(move |c: &Continuation<V>, _: Arguments<V>| {
            if let Some(hit) = cached(store, &key) {
                return Ok(hit);
            }

            let value = c.proceed()?;
            Ok(remember(store, key.clone(), value))
        })
    })
}

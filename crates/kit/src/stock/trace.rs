use micro_decorator::{Arguments, Continuation, DecoratorKind, Value};
use std::fmt::Debug;
use tracing::{debug, info_span, warn};

/// Logs the arguments and the outcome of every call, inside a span named after
/// the method.
pub fn trace<V: Value + Debug>() -> DecoratorKind<V> {
    DecoratorKind::context_free(|c: &Continuation<V>, arguments: Arguments<V>| {
        let span = info_span!("decorated", owner = c.owner(), method = %c.method());
        let _entered = span.enter();

        debug!(?arguments, "call");
        let result = c.proceed();
        match &result {
            Ok(value) => debug!(?value, "return"),
            Err(e) => warn!(cause = %e, "raise"),
        }
        result
    })
}

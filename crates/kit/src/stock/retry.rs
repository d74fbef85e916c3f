use micro_decorator::{Arguments, Continuation, DeclarationContext, DecoratorKind, Value};
use tracing::warn;

/// Attempts used when the declaration gives none.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Re-runs the rest of the chain until it succeeds or the attempts given at
/// declaration are used up, the last error is returned.
pub fn retry<V>() -> DecoratorKind<V>
where
    V: Value + TryInto<u32>,
{
    DecoratorKind::context_factory(|context: &DeclarationContext<V>| {
        let attempts: u32 = match context.arg(0) {
            Some(value) => value.clone().try_into().map_err(|_overflow| "retry attempts must be a small unsigned number")?,
            None => DEFAULT_ATTEMPTS,
        };
        if attempts == 0 {
            return Err("retry needs at least one attempt".into());
        }

        Ok(move |c: &Continuation<V>, _: Arguments<V>| {
            let mut attempt = 1;
            loop {
                match c.proceed() {
                    Err(e) if attempt < attempts => {
                        warn!(owner = c.owner(), method = %c.method(), attempt, attempts, cause = %e, "call failed, retrying");
                        attempt += 1;
                    }
                    result => return result,
                }
            }
        })
    })
}

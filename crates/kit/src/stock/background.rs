use micro_decorator::{Arguments, Continuation, DecoratorKind, Value};
use tokio::runtime::Handle;
use tracing::{debug, error};

/// Runs the rest of the chain on the blocking pool of `handle` and returns
/// `V::default()` right away.
///
/// The caller never sees the outcome, failures are logged.
pub fn background<V: Value + Default>(handle: Handle) -> DecoratorKind<V> {
    DecoratorKind::context_free(move |c: &Continuation<V>, _: Arguments<V>| {
        let continuation = c.clone();
        debug!(owner = c.owner(), method = %c.method(), "moving call to the background");
        handle.spawn_blocking(move || {
            if let Err(e) = continuation.proceed() {
                error!(owner = continuation.owner(), method = %continuation.method(), cause = %e, "background call failed");
            }
        });
        Ok(V::default())
    })
}

#[cfg(test)]
mod tests {
    use super::background;
    use micro_decorator::{Arguments, Injector, Scope};
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_background_returns_default() {
        let injector = Injector::<i64>::new("Mailer");
        injector.register_definition("background", background(Handle::current()));
        injector.decorate_method(Scope::Instance, "deliver", "background", Default::default()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = injector.invoke(Scope::Instance, "deliver", Arguments::positional([7]), None, move |arguments, _| {
            let value = arguments.arg(0).copied().unwrap_or_default();
            tx.send(value * 6).map_err(|e| e.to_string())?;
            Ok(value)
        });

        assert_eq!(result.unwrap(), 0);
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_background_failure_is_swallowed() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let injector = Injector::<i64>::new("Mailer");
        injector.register_definition("background", background(Handle::current()));
        injector.decorate_method(Scope::Instance, "deliver", "background", Default::default()).unwrap();

        let result = injector.invoke(Scope::Instance, "deliver", Arguments::empty(), None, |_, _| Err("smtp down".into()));
        assert_eq!(result.unwrap(), 0);
    }
}

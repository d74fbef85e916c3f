use crate::module::DecoratorModule;
use micro_decorator::{
    Arguments, Block, ChainNode, DeclarationContext, DecorateError, DispatchShim, Injector, InvokeResult, Scope, Value,
};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

/// A type whose methods can be decorated.
///
/// Clones share the same injector, so every handle to an owner sees the same
/// decorators and the same bound methods.
#[derive(Debug)]
pub struct Owner<V> {
    injector: Arc<Injector<V>>,
}

impl<V> Clone for Owner<V> {
    fn clone(&self) -> Self {
        Self { injector: Arc::clone(&self.injector) }
    }
}

impl<V: Value> Owner<V> {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_injector(Arc::new(Injector::new(name)))
    }

    /// Compose an owner from an existing injector, e.g. one built with a custom observer.
    pub fn with_injector(injector: Arc<Injector<V>>) -> Self {
        Self { injector }
    }

    pub fn name(&self) -> &str {
        self.injector.owner()
    }

    pub fn injector(&self) -> &Arc<Injector<V>> {
        &self.injector
    }

    /// Make every decorator of `module` available to this owner.
    ///
    /// A module included later wins over earlier ones for the names they share.
    pub fn include(&self, module: &DecoratorModule<V>) -> &Self {
        for definition in module.definitions() {
            self.injector.register_shared(Arc::clone(definition));
        }
        module.track(&self.injector);
        debug!(owner = self.name(), module = module.name(), decorators = module.len(), "module included");
        self
    }

    /// Start declaring a decoration with the decorator `name`.
    pub fn decorate(&self, name: &str) -> Decoration<'_, V> {
        Decoration { owner: self, decorator: name.to_owned(), arguments: Arguments::empty(), block: None }
    }

    /// Report a method definition, binding whatever is pending in `scope`.
    pub fn method_defined(&self, scope: Scope, method: &str) -> Option<Arc<DispatchShim<V>>> {
        self.injector.notify_method_defined(scope, method)
    }

    pub fn instance_method_defined(&self, method: &str) -> Option<Arc<DispatchShim<V>>> {
        self.method_defined(Scope::Instance, method)
    }

    pub fn type_method_defined(&self, method: &str) -> Option<Arc<DispatchShim<V>>> {
        self.method_defined(Scope::Type, method)
    }

    /// Call `method` through its shim, or `original` alone when nothing is bound.
    pub fn invoke<F>(
        &self,
        scope: Scope,
        method: &str,
        arguments: Arguments<V>,
        block: Option<Block<V>>,
        original: F,
    ) -> InvokeResult<V>
    where
        F: Fn(Arguments<V>, Option<&Block<V>>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        self.injector.invoke(scope, method, arguments, block, original)
    }
}

/// A decoration being declared, see [`Owner::decorate`].
#[must_use = "a decoration does nothing until it is queued or bound"]
pub struct Decoration<'a, V> {
    owner: &'a Owner<V>,
    decorator: String,
    arguments: Arguments<V>,
    block: Option<Block<V>>,
}

impl<V: Value> Decoration<'_, V> {
    pub fn arg(mut self, value: V) -> Self {
        self.arguments.args_mut().push(value);
        self
    }

    pub fn args(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.arguments.args_mut().extend(values);
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: V) -> Self {
        self.arguments.kwargs_mut().insert(key.into(), value);
        self
    }

    /// Attach a block to the declaration, handed to the decorator's factory.
    pub fn block<F>(mut self, f: F) -> Self
    where
        F: Fn(Arguments<V>) -> InvokeResult<V> + Send + Sync + 'static,
    {
        self.block = Some(Block::new(f));
        self
    }

    /// Queue the decoration for the next method defined in `scope`.
    pub fn queue(self, scope: Scope) -> Result<Arc<ChainNode<V>>, DecorateError> {
        let Self { owner, decorator, arguments, block } = self;
        owner.injector.queue_decoration(scope, &decorator, DeclarationContext::new(arguments, block))
    }

    /// Like [`queue`](Decoration::queue), with the scope given by name.
    pub fn queue_for(self, scope: &str) -> Result<Arc<ChainNode<V>>, DecorateError> {
        let scope = scope.parse::<Scope>()?;
        self.queue(scope)
    }

    /// Bind the decoration to the already defined `method` right away.
    pub fn bind(self, scope: Scope, method: &str) -> Result<Arc<DispatchShim<V>>, DecorateError> {
        let Self { owner, decorator, arguments, block } = self;
        owner.injector.decorate_method(scope, method, &decorator, DeclarationContext::new(arguments, block))
    }
}

impl<V: Value + Debug> Debug for Decoration<'_, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoration")
            .field("owner", &self.owner.name())
            .field("decorator", &self.decorator)
            .field("arguments", &self.arguments)
            .field("block", &self.block.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Owner;
    use crate::module::DecoratorModule;
    use micro_decorator::{Arguments, Continuation, DecorateError, DecorationObserver, DecoratorKind, Injector, MethodKey, Scope};
    use mockall::mock;
    use std::sync::Arc;

    mock! {
        Observer {}

        impl DecorationObserver for Observer {
            fn on_redefined(&self, owner: &str, decorator: &str);
            fn on_queued(&self, owner: &str, scope: Scope, decorator: &str);
            fn on_bound(&self, owner: &str, method: &MethodKey, chain_len: usize, shim_installed: bool);
        }
    }

    fn math() -> DecoratorModule<i64> {
        let mut module = DecoratorModule::new("MathDecorators");
        module.def_decorator_factory("add", |context| {
            let amount = *context.arg(0).ok_or("add needs an amount")?;
            Ok(move |c: &Continuation<i64>, _: Arguments<i64>| Ok(c.proceed()? + amount))
        });
        module.def_decorator("double", |c, _| Ok(c.proceed()? * 2));
        module
    }

    #[test]
    fn test_queue_then_define() {
        let owner = Owner::new("Calculator");
        owner.include(&math());

        owner.decorate("add").arg(3).queue(Scope::Instance).unwrap();
        owner.decorate("double").queue(Scope::Instance).unwrap();
        let shim = owner.instance_method_defined("five").unwrap();
        assert_eq!(shim.decorator_names(), vec!["add", "double"]);

        let result = owner.invoke(Scope::Instance, "five", Arguments::empty(), None, |_, _| Ok(5));
        assert_eq!(result.unwrap(), 13);

        // nothing pending any more
        assert!(owner.instance_method_defined("six").is_none());
    }

    #[test]
    fn test_type_scope() {
        let owner = Owner::new("Calculator");
        owner.include(&math());

        owner.decorate("double").queue_for("singleton").unwrap();
        assert!(owner.instance_method_defined("seven").is_none());
        assert!(owner.type_method_defined("seven").is_some());

        let result = owner.invoke(Scope::Type, "seven", Arguments::empty(), None, |_, _| Ok(7));
        assert_eq!(result.unwrap(), 14);
        let result = owner.invoke(Scope::Instance, "seven", Arguments::empty(), None, |_, _| Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_queue_for_invalid_scope() {
        let owner = Owner::new("Calculator");
        owner.include(&math());

        let err = owner.decorate("double").queue_for("module").unwrap_err();
        assert!(matches!(err, DecorateError::InvalidScope { .. }));
    }

    #[test]
    fn test_unknown_decorator() {
        let owner = Owner::<i64>::new("Calculator");

        let err = owner.decorate("double").queue(Scope::Instance).unwrap_err();
        assert!(matches!(err, DecorateError::UnknownDecorator { .. }));
        assert!(owner.injector().pending(Scope::Instance).is_none());
    }

    #[test]
    fn test_bind_existing_method() {
        let owner = Owner::new("Calculator");
        owner.include(&math());

        let shim = owner.decorate("add").arg(10).bind(Scope::Instance, "one").unwrap();
        assert_eq!(shim.len(), 1);
        owner.decorate("double").bind(Scope::Instance, "one").unwrap();

        let result = owner.invoke(Scope::Instance, "one", Arguments::empty(), None, |_, _| Ok(1));
        assert_eq!(result.unwrap(), 12);
        assert_eq!(owner.injector().shim_count(), 1);
    }

    #[test]
    fn test_clones_share_injector() {
        let owner = Owner::new("Calculator");
        let other = owner.clone();
        other.include(&math());

        owner.decorate("double").queue(Scope::Instance).unwrap();
        assert!(other.instance_method_defined("two").is_some());
        assert!(owner.injector().shim(Scope::Instance, "two").is_some());
    }

    #[test]
    fn test_module_redefinition_after_include() {
        let mut module = math();
        let owner = Owner::new("Calculator");
        owner.include(&module);

        owner.decorate("double").queue(Scope::Instance).unwrap();
        owner.instance_method_defined("three");

        module.def_decorator("double", |c, _| Ok(c.proceed()? * 10));
        let result = owner.invoke(Scope::Instance, "three", Arguments::empty(), None, |_, _| Ok(3));
        assert_eq!(result.unwrap(), 30);
    }

    #[test]
    fn test_later_module_wins() {
        let mut shadow = DecoratorModule::new("Shadow");
        shadow.def_decorator("double", |c: &Continuation<i64>, _| Ok(c.proceed()? + 1));

        let owner = Owner::new("Calculator");
        owner.include(&math()).include(&shadow);

        owner.decorate("double").queue(Scope::Instance).unwrap();
        owner.instance_method_defined("four");
        let result = owner.invoke(Scope::Instance, "four", Arguments::empty(), None, |_, _| Ok(4));
        assert_eq!(result.unwrap(), 5);
    }

    #[test]
    fn test_declaration_block() {
        let mut module = DecoratorModule::new("Blocks");
        module.def_decorator_factory("tap", |context| {
            let block = context.block().cloned().ok_or("tap needs a block")?;
            Ok(move |c: &Continuation<i64>, _: Arguments<i64>| {
                let value = c.proceed()?;
                block.call(Arguments::positional([value]))
            })
        });

        let owner = Owner::new("Tapped");
        owner.include(&module);
        owner.decorate("tap").block(|arguments| Ok(arguments.arg(0).copied().unwrap_or_default() - 1)).queue(Scope::Instance).unwrap();
        owner.instance_method_defined("nine");

        let result = owner.invoke(Scope::Instance, "nine", Arguments::empty(), None, |_, _| Ok(9));
        assert_eq!(result.unwrap(), 8);

        let err = owner.decorate("tap").queue(Scope::Instance).unwrap_err();
        assert!(matches!(err, DecorateError::FactoryFailed { .. }));
    }

    #[test]
    fn test_owner_override_stays_local() {
        let module = math();
        let first = Owner::new("First");
        let second = Owner::new("Second");
        first.include(&module);
        second.include(&module);
        second.decorate("double").bind(Scope::Instance, "m").unwrap();

        first.injector().register_definition("double", DecoratorKind::context_free(|c: &Continuation<i64>, _| Ok(c.proceed()? + 100)));

        let result = second.invoke(Scope::Instance, "m", Arguments::empty(), None, |_, _| Ok(5));
        assert_eq!(result.unwrap(), 10);
        assert!(!Arc::ptr_eq(module.get("double").unwrap(), &first.injector().lookup("double").unwrap()));
        assert!(Arc::ptr_eq(module.get("double").unwrap(), &second.injector().lookup("double").unwrap()));
    }

    #[test]
    fn test_module_redefinition_reaches_observers() {
        let mut observer = MockObserver::new();
        observer
            .expect_on_redefined()
            .withf(|owner, decorator| owner == "Observed" && decorator == "double")
            .times(1)
            .return_const(());
        let observed = Owner::with_injector(Arc::new(Injector::builder().owner("Observed").observer(observer).build()));

        let mut module = math();
        observed.include(&module);
        // an owner that shadowed the name locally is not told
        let shadowing = Owner::new("Shadowing");
        shadowing.include(&module);
        shadowing.injector().register_definition("double", DecoratorKind::context_free(|c: &Continuation<i64>, _| c.proceed()));
        // a dropped owner is skipped
        Owner::new("Dropped").include(&module);

        module.def_decorator("double", |c, _| Ok(c.proceed()? * 10));
        module.def_decorator("triple", |c, _| Ok(c.proceed()? * 3));
    }
}

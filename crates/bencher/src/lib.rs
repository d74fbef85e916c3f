use micro_decorator::{Arguments, Continuation, DeclarationContext, DecorateError, DecoratorKind, Injector, Scope};

/// Name of the decorated method every case binds.
pub const METHOD: &str = "target";

#[derive(Debug, Copy, Clone)]
pub struct DispatchCase {
    name: &'static str,
    group: CaseGroup,
    depth: usize,
}

impl DispatchCase {
    pub fn new(name: &'static str, group: CaseGroup, depth: usize) -> Self {
        Self { name, group, depth }
    }

    pub fn shallow(name: &'static str, depth: usize) -> Self {
        Self::new(name, CaseGroup::Shallow, depth)
    }

    pub fn deep(name: &'static str, depth: usize) -> Self {
        Self::new(name, CaseGroup::Deep, depth)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> CaseGroup {
        self.group
    }

    /// Number of decorators around the method.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// An injector with `depth` pass-through decorators bound to [`METHOD`].
    pub fn injector(&self) -> Result<Injector<u64>, DecorateError> {
        let injector = Injector::new(self.name);
        injector.register_definition("pass", DecoratorKind::context_free(|c: &Continuation<u64>, _| c.proceed()));
        injector.register_definition(
            "add",
            DecoratorKind::context_factory(|context| {
                let amount = context.arg(0).copied().unwrap_or(1);
                Ok(move |c: &Continuation<u64>, _: Arguments<u64>| Ok(c.proceed()? + amount))
            }),
        );

        for level in 0..self.depth {
            let (name, context) = if level % 2 == 0 {
                ("pass", DeclarationContext::empty())
            } else {
                ("add", DeclarationContext::from(Arguments::positional([level as u64])))
            };
            injector.queue_decoration(Scope::Instance, name, context)?;
        }
        injector.notify_method_defined(Scope::Instance, METHOD);
        Ok(injector)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum CaseGroup {
    Shallow,
    Deep,
}

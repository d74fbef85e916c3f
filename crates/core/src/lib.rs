//! A method decoration engine.
//!
//! Cross-cutting behaviors ("decorators") are declared once and composed, in
//! declaration order, into a chain that runs around a target operation. The first
//! declared decorator is the outermost one.
//!
//! The moving parts, leaf first:
//!
//! - [`DecoratorDefinition`]: a named template, either context-free or a factory
//!   fed with the arguments given when the decoration is declared
//! - [`ChainNode`]: one application of a definition, linked to the next one
//! - [`Continuation`]: what a behavior calls to run the rest of the chain
//! - [`Registry`]: the decorator names known to an owner
//! - [`Injector`]: queues decorations and binds them to methods, once per method
//! - [`DispatchShim`]: the entry point of one decorated method
//!
//! # Example
//!
//! ```
//! use micro_decorator::{Arguments, Continuation, DeclarationContext, DecoratorKind, Injector, Scope};
//!
//! let injector: Injector<i64> = Injector::new("Calculator");
//! injector.register_definition(
//!     "add",
//!     DecoratorKind::context_factory(|context| {
//!         let amount = *context.arg(0).ok_or("add needs an amount")?;
//!         Ok(move |c: &Continuation<i64>, _: Arguments<i64>| Ok(c.proceed()? + amount))
//!     }),
//! );
//! injector.register_definition(
//!     "double",
//!     DecoratorKind::context_free(|c: &Continuation<i64>, _| Ok(c.proceed()? * 2)),
//! );
//!
//! // declared before the method exists, bound when it is defined
//! injector.queue_decoration(Scope::Instance, "add", DeclarationContext::from(Arguments::positional([3]))).unwrap();
//! injector.queue_decoration(Scope::Instance, "double", DeclarationContext::empty()).unwrap();
//! injector.notify_method_defined(Scope::Instance, "five");
//!
//! let result = injector.invoke(Scope::Instance, "five", Arguments::empty(), None, |_, _| Ok(5));
//! assert_eq!(result.unwrap(), 13);
//! ```

mod arguments;
mod chain;
mod continuation;
mod definition;
mod error;
mod injector;
mod observer;
mod registry;
mod scope;
mod shim;

pub use arguments::Arguments;
pub use arguments::Block;
pub use arguments::BoxError;
pub use arguments::DeclarationContext;
pub use arguments::InvokeResult;
pub use arguments::Kwargs;
pub use arguments::Value;
pub use chain::ChainIter;
pub use chain::ChainNode;
pub use chain::Linkage;
pub use chain::append;
pub use continuation::Continuation;
pub use continuation::Operation;
pub use definition::Behavior;
pub use definition::DecoratorDefinition;
pub use definition::DecoratorKind;
pub use definition::Factory;
pub use error::DecorateError;
pub use injector::InjectionState;
pub use injector::Injector;
pub use injector::InjectorBuilder;
pub use observer::DecorationObserver;
pub use observer::LogObserver;
pub use registry::Registration;
pub use registry::Registry;
pub use scope::MethodKey;
pub use scope::Scope;
pub use shim::DispatchShim;

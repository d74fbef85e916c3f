//! Declaration helpers and stock decorators for `micro-decorator`.
//!
//! Decorators are grouped into a [`DecoratorModule`], an [`Owner`] includes
//! modules and declares decorations with a small builder:
//!
//! ```
//! use micro_decorator::{Arguments, Continuation, Scope};
//! use micro_decorator_kit::{DecoratorModule, Owner};
//!
//! let mut math = DecoratorModule::new("Math");
//! math.def_decorator_factory("add", |context| {
//!     let amount = *context.arg(0).ok_or("add needs an amount")?;
//!     Ok(move |c: &Continuation<i64>, _: Arguments<i64>| Ok(c.proceed()? + amount))
//! });
//!
//! let calculator = Owner::new("Calculator");
//! calculator.include(&math);
//! calculator.decorate("add").arg(3).queue(Scope::Instance).unwrap();
//! calculator.instance_method_defined("two");
//!
//! let five = calculator.invoke(Scope::Instance, "two", Arguments::empty(), None, |_, _| Ok(2));
//! assert_eq!(five.unwrap(), 5);
//! ```

mod module;
mod owner;
pub mod stock;

pub use module::DecoratorModule;
pub use owner::Decoration;
pub use owner::Owner;

use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

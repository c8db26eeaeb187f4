//! Interception engine: reified invocations and the interceptor chain that drives them.
//!
//! An [`InterceptorChain`] is an immutable, shareable list of [`Interceptor`]s. Executing it
//! creates one [`Invocation`] per call; each interceptor runs its pre-`proceed` logic in chain
//! order and its post-`proceed` logic in reverse order, with the target operation innermost.

pub mod chain;
pub mod error;
pub mod interceptor;
pub mod invocation;
pub mod operation;
pub mod trace;
pub mod value;

pub use chain::InterceptorChain;
pub use error::{BoxError, InvocationResult};
pub use interceptor::{FnInterceptor, Interceptor, InterceptorRef, interceptor};
pub use invocation::{Invocation, Receiver, Target};
pub use operation::{ErrorMatcher, Operation};
pub use trace::TraceInterceptor;
pub use value::Value;

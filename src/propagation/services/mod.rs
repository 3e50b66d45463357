//! Application services for status propagation.

mod dispatcher;
mod resolver;

pub use dispatcher::PropagationDispatcher;
pub use resolver::RuleResolver;

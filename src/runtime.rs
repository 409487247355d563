//! Runtime support library linked by converted programs.
//!
//! The generated Rust imports `jam2rs::runtime` and nothing else: `JamList`
//! carries the list-of-strings value model, `JamContext` the variable stores
//! and dispatch tables. The in-process evaluator drives the same types.
pub mod context;
pub mod list;
pub mod path;

pub use context::{ActionsEntry, ActionsInvocation, JamContext, RuleFn, TargetScope, UnitFn};
pub use list::{AssignOp, JamList};
pub use path::PathParts;

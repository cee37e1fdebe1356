//! A minimal, embeddable unit-testing harness with nested test sets.
//!
//! Assertions record into named, nestable test sets. While a set is open it
//! collects every outcome produced under it, including whole child sets;
//! failing assertions print a one-line diagnostic the moment they happen,
//! while all aggregate reporting waits for the outermost set to close. The
//! root then prints a recursive summary table with pass/fail/error counts
//! rolled up through the tree, gated by a per-set verbosity threshold.
//!
//! ```
//! use testset::{TestContext, check};
//!
//! let mut ctx = TestContext::new().with_target(Vec::<u8>::new());
//! let closed = ctx.set("math", |ctx| {
//!     check!(ctx, 1 + 1 == 2);
//!     ctx.set("negatives", |ctx| {
//!         check!(ctx, -1 < 0);
//!     });
//! });
//!
//! let conclusion = closed.conclusion().expect("\"math\" is the root set");
//! assert_eq!(conclusion.counts.total(), 2);
//! assert!(!conclusion.has_failures());
//! ```
//!
//! Assertions executed with no test set open fall back to fail-fast
//! behavior: the first failure prints its diagnostic and aborts the context.
//! Each [`TestContext`] is scoped to one logical thread of control and must
//! not be shared across threads; independent threads own independent
//! contexts.

pub mod eval;
pub mod outcome;
pub mod set;
pub mod summary;
pub mod value;

mod context;
pub use context::*;

mod stack;
pub use stack::*;

mod report;
pub use report::*;

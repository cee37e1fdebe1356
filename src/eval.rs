//! Evaluating predicates and classifying their outcome.
//!
//! The evaluator is the single place an assertion turns into an
//! [`Assertion`] record. Ordinary predicate failures never unwind past it: a
//! predicate that returns `false`, produces a non-boolean value, or panics is
//! classified and recorded, and execution continues with the next assertion.
//!
//! Two entry points exist. [`check`] evaluates a boolean predicate;
//! [`check_panics`] expects an action to panic with a payload of a given
//! type. The [`check!`] and [`check_panics!`] macros are thin sugar that
//! capture the source text via `stringify!`.

use std::{
    any::{self, Any, TypeId},
    borrow::Cow,
    cell::RefCell,
    io,
    panic::{self, PanicHookInfo, UnwindSafe, catch_unwind},
};

use crate::{
    context::TestContext,
    outcome::{Assertion, AssertionError, AssertionFailure, AssertionStatus, CheckKind},
    value::{BoxedValue, TestValue},
};

/// What a predicate handed back to the evaluator.
#[derive(Debug)]
pub struct Checked {
    /// Rendering of the expression with evaluated terms substituted, when
    /// the caller produced one. The harness only carries this text; building
    /// it is the caller's concern.
    pub expanded: Option<String>,
    pub value: Evaluated,
}

impl Checked {
    pub fn plain(value: impl Into<Evaluated>) -> Self {
        Self {
            expanded: None,
            value: value.into(),
        }
    }

    pub fn expanded(expanded: impl Into<String>, value: impl Into<Evaluated>) -> Self {
        Self {
            expanded: Some(expanded.into()),
            value: value.into(),
        }
    }
}

/// The value a predicate evaluated to.
#[derive(Debug)]
pub enum Evaluated {
    Bool(bool),

    /// Anything else. Produced by embedders whose predicates evaluate
    /// dynamically typed host values; classified as an error, not a failure.
    Other(BoxedValue),
}

impl Evaluated {
    pub fn other(value: impl TestValue) -> Self {
        Evaluated::Other(Box::new(value))
    }
}

impl From<bool> for Evaluated {
    fn from(value: bool) -> Self {
        Evaluated::Bool(value)
    }
}

/// Evaluate a boolean predicate and record the classified outcome.
///
/// The outcome is recorded into `ctx` exactly once and also returned:
/// - `true` passes, `false` fails;
/// - a non-boolean [`Evaluated::Other`] is an error of the test itself;
/// - a panic inside the predicate is caught and recorded as an error
///   together with its payload and origin location.
pub fn check<W, F>(
    ctx: &mut TestContext<W>,
    source: impl Into<Cow<'static, str>>,
    predicate: F,
) -> Assertion
where
    W: io::Write,
    F: FnOnce() -> Checked + UnwindSafe,
{
    let guard = PanicOriginGuard::install();
    let evaluated = catch_unwind(predicate);
    drop(guard);

    let (status, expanded) = match evaluated {
        Ok(Checked {
            expanded,
            value: Evaluated::Bool(true),
        }) => (AssertionStatus::Passed, expanded),
        Ok(Checked {
            expanded,
            value: Evaluated::Bool(false),
        }) => (
            AssertionStatus::Failed(AssertionFailure::ReturnedFalse),
            expanded,
        ),
        Ok(Checked {
            expanded,
            value: Evaluated::Other(value),
        }) => (
            AssertionStatus::Errored(AssertionError::NonBool { value }),
            expanded,
        ),
        Err(payload) => (
            AssertionStatus::Errored(AssertionError::Raised {
                payload: payload_as_string(payload),
                origin: take_last_origin(),
            }),
            None,
        ),
    };

    let assertion = Assertion {
        kind: CheckKind::Bool,
        status,
        source: source.into(),
        expanded,
    };
    ctx.record(assertion.clone());
    assertion
}

/// Run an action that is expected to panic with a payload of type `E`.
///
/// A completed action fails, a panic with a payload of the expected type
/// passes, and a panic with any other payload fails with both sides of the
/// mismatch. A panic here is informative, never a harness defect, so this
/// path cannot produce an errored assertion.
///
/// `panic!` carries `&'static str` for constant messages and `String` for
/// formatted ones, so an expectation of either string type accepts both.
pub fn check_panics<E, W, F>(
    ctx: &mut TestContext<W>,
    source: impl Into<Cow<'static, str>>,
    action: F,
) -> Assertion
where
    E: Any,
    W: io::Write,
    F: FnOnce() + UnwindSafe,
{
    let guard = PanicOriginGuard::install();
    let outcome = catch_unwind(action);
    drop(guard);
    let _ = take_last_origin();

    let expected = any::type_name::<E>();
    let status = match outcome {
        Ok(()) => AssertionStatus::Failed(AssertionFailure::DidNotPanic { expected }),
        Err(payload) => match payload_matches::<E>(payload.as_ref()) {
            true => AssertionStatus::Passed,
            false => AssertionStatus::Failed(AssertionFailure::PanicMismatch {
                expected,
                got: payload_as_string(payload),
            }),
        },
    };

    let assertion = Assertion {
        kind: CheckKind::Panics,
        status,
        source: source.into(),
        expanded: None,
    };
    ctx.record(assertion.clone());
    assertion
}

/// Whether a panic payload satisfies the expected payload type.
///
/// Whether `panic!` produces `&'static str` or `String` depends on how the
/// message was built, so the two string types stand in for each other here,
/// the same way [`payload_as_string`] reads both.
fn payload_matches<E: Any>(payload: &(dyn Any + Send)) -> bool {
    if payload.is::<E>() {
        return true;
    }
    let expected = TypeId::of::<E>();
    (expected == TypeId::of::<String>() && payload.is::<&'static str>())
        || (expected == TypeId::of::<&'static str>() && payload.is::<String>())
}

/// Convert a panic payload into a string.
///
/// This matches the common payload types produced by `panic!` (`&'static str`
/// and `String`). Other payload types are formatted as a generic placeholder.
pub fn payload_as_string(payload: Box<dyn Any + Send + 'static>) -> String {
    payload
        .downcast::<&'static str>()
        .map(|s| s.to_string())
        .or_else(|payload| payload.downcast::<String>().map(|s| *s))
        .unwrap_or_else(|_| String::from("non-string panic payload"))
}

thread_local! {
    static LAST_PANIC_ORIGIN: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn take_last_origin() -> Option<String> {
    LAST_PANIC_ORIGIN.with_borrow_mut(|slot| slot.take())
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Replaces the process panic hook for the duration of one evaluation.
///
/// The replacement records the panic origin into a thread-local slot and
/// keeps expected panics from printing the default backtrace noise. The
/// previous hook is restored on drop.
struct PanicOriginGuard(Option<PanicHook>);

impl PanicOriginGuard {
    fn install() -> Self {
        let old_hook = panic::take_hook();

        panic::set_hook(Box::new(|panic_hook_info| {
            let origin = panic_hook_info.location().map(|location| location.to_string());
            LAST_PANIC_ORIGIN.with_borrow_mut(|slot| *slot = origin);
        }));

        Self(Some(old_hook))
    }
}

impl Drop for PanicOriginGuard {
    fn drop(&mut self) {
        if let Some(old_hook) = self.0.take() {
            panic::set_hook(old_hook);
        }
    }
}

/// Assert that a boolean expression holds.
///
/// Evaluates the expression inside the current test set and records a
/// passing, failing, or errored assertion. Returns the [`Assertion`].
///
/// ```
/// use testset::{TestContext, check};
///
/// let mut ctx = TestContext::new().with_target(Vec::<u8>::new());
/// ctx.set("math", |ctx| {
///     check!(ctx, 1 + 1 == 2);
/// });
/// ```
#[macro_export]
macro_rules! check {
    ($ctx:expr, $cond:expr $(,)?) => {
        $ctx.check(::std::stringify!($cond), || $crate::eval::Checked::plain($cond))
    };
}

/// Assert that an expression panics with a payload of the given type.
///
/// ```
/// use testset::{TestContext, check_panics};
///
/// let mut ctx = TestContext::new().with_target(Vec::<u8>::new());
/// ctx.set("overflow", |ctx| {
///     check_panics!(ctx, String, vec![1][3]);
/// });
/// ```
#[macro_export]
macro_rules! check_panics {
    ($ctx:expr, $kind:ty, $action:expr $(,)?) => {
        $ctx.check_panics::<$kind, _>(::std::stringify!($action), || {
            let _ = $action;
        })
    };
}

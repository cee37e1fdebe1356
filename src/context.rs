//! The execution context that owns the test-set stack and the output target.
//!
//! One [`TestContext`] exists per logical thread of control. Opening a test
//! set pushes a recording scope, assertions record into the innermost open
//! scope, and closing a scope either attaches it to its parent or, at the
//! root, prints the aggregated summary. With no scope open the context falls
//! back to fail-fast behavior: the first failing assertion prints its
//! diagnostic and aborts the context.

use std::{
    any::Any,
    borrow::Cow,
    io,
    mem,
    panic::{self, UnwindSafe},
};

use crate::{
    eval::{self, Checked},
    outcome::Assertion,
    report::Conclusion,
    set::{RecordingSet, SetOptions, Verbosity},
    stack::{ActiveSet, PoppedSet, SetStack},
    summary,
};

pub struct TestContext<W: io::Write = io::Stdout> {
    stack: SetStack,
    target: W,
    fmt_errors: Vec<io::Error>,
}

impl TestContext<io::Stdout> {
    pub fn new() -> Self {
        Self {
            stack: SetStack::new(),
            target: io::stdout(),
            fmt_errors: Vec::new(),
        }
    }
}

impl Default for TestContext<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: io::Write> TestContext<W> {
    /// Swap the output target, e.g. to capture diagnostics and the summary
    /// in a buffer.
    pub fn with_target<WithTarget: io::Write>(self, with_target: WithTarget) -> TestContext<WithTarget> {
        TestContext {
            stack: self.stack,
            target: with_target,
            fmt_errors: self.fmt_errors,
        }
    }

    /// Number of currently open test sets. Zero after a balanced run; a
    /// non-zero depth at top-level completion means a scope was opened but
    /// never closed.
    pub fn open_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Open a test set with the verbosity inherited from its parent.
    pub fn open(&mut self, description: impl Into<String>) {
        self.open_with(description, SetOptions::new());
    }

    /// Open a test set. The default verbosity is the parent's decremented by
    /// one, or [`Verbosity::Unbounded`] at the root; `options` may override
    /// it.
    pub fn open_with(&mut self, description: impl Into<String>, options: SetOptions) {
        let inherited = match self.stack.top() {
            Some(parent) => parent.verbosity().child_default(),
            None => Verbosity::Unbounded,
        };
        let verbosity = options.verbosity.unwrap_or(inherited);
        self.stack.push(RecordingSet::new(description.into(), verbosity));
    }

    /// Close the innermost open test set.
    ///
    /// A set with a still-open parent merges into it and reports nothing
    /// yet; the root set prints the full summary and hands back its
    /// [`Conclusion`]. Closing with nothing open is a scope bug in the
    /// caller and returns [`Closed::NoOpenSet`] without touching any state.
    pub fn close(&mut self) -> Closed {
        let mut set = match self.stack.pop() {
            PoppedSet::Recording(set) => set,
            PoppedSet::Fallback => return Closed::NoOpenSet,
        };
        set.seal();

        match self.stack.current() {
            ActiveSet::Recording(parent) => {
                parent.record_set(set);
                Closed::Nested
            }
            ActiveSet::Fallback => {
                let mut fmt_errors = mem::take(&mut self.fmt_errors);
                if let Err(err) = summary::print_summary(&mut self.target, &set) {
                    fmt_errors.push(err);
                }
                let counts = summary::counts(&set);
                Closed::Root(Conclusion {
                    counts,
                    set,
                    fmt_errors,
                })
            }
        }
    }

    /// Run `body` inside a freshly opened test set and close it afterwards.
    pub fn set(&mut self, description: impl Into<String>, body: impl FnOnce(&mut Self)) -> Closed {
        self.set_with(description, SetOptions::new(), body)
    }

    pub fn set_with(
        &mut self,
        description: impl Into<String>,
        options: SetOptions,
        body: impl FnOnce(&mut Self),
    ) -> Closed {
        self.open_with(description, options);
        body(self);
        self.close()
    }

    /// Open one test set per item, substituting the item into `template` at
    /// the first `{}`. Each iteration behaves exactly like [`set`](Self::set),
    /// so this is usually run inside an enclosing set that collects the
    /// per-item results.
    pub fn set_each<I>(
        &mut self,
        template: &str,
        items: I,
        mut body: impl FnMut(&mut Self, I::Item),
    ) where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        for item in items {
            let description = template.replacen("{}", &item.to_string(), 1);
            self.open(description);
            body(self, item);
            self.close();
        }
    }

    /// Evaluate a boolean predicate as an assertion in this context.
    ///
    /// See [`eval::check`]; the [`check!`](crate::check) macro captures the
    /// source text for you.
    pub fn check<F>(&mut self, source: impl Into<Cow<'static, str>>, predicate: F) -> Assertion
    where
        F: FnOnce() -> Checked + UnwindSafe,
    {
        eval::check(self, source, predicate)
    }

    /// Run an action expected to panic with a payload of type `E`.
    ///
    /// See [`eval::check_panics`]; the [`check_panics!`](crate::check_panics)
    /// macro captures the source text for you.
    pub fn check_panics<E, F>(
        &mut self,
        source: impl Into<Cow<'static, str>>,
        action: F,
    ) -> Assertion
    where
        E: Any,
        F: FnOnce() + UnwindSafe,
    {
        eval::check_panics::<E, W, F>(self, source, action)
    }

    /// Record one assertion outcome into the innermost open test set.
    ///
    /// Failing and erroring assertions print a one-line diagnostic the
    /// moment they are recorded; recording continues afterwards. With no set
    /// open, a failing assertion is fatal: the diagnostic is printed and the
    /// context aborts by panicking with a [`FallbackAbort`] payload.
    pub fn record(&mut self, assertion: Assertion) {
        let diagnostic = assertion.diagnostic();
        match self.stack.current() {
            ActiveSet::Fallback => {
                let Some(diagnostic) = diagnostic else { return };
                let _ = writeln!(self.target, "{diagnostic}");
                let _ = self.target.flush();
                panic::panic_any(FallbackAbort { assertion });
            }
            ActiveSet::Recording(set) => {
                if let Some(diagnostic) = diagnostic {
                    let line = match set.description().is_empty() {
                        true => diagnostic,
                        false => format!("{}: {diagnostic}", set.description()),
                    };
                    if let Err(err) = writeln!(self.target, "{line}") {
                        self.fmt_errors.push(err);
                    }
                }
                set.record_check(assertion);
            }
        }
    }
}

/// What closing a test set amounted to.
#[derive(Debug)]
#[non_exhaustive]
pub enum Closed {
    /// The set merged into its still-open parent. Reporting is deferred to
    /// the root.
    Nested,

    /// The set was the root: the summary has been printed and the aggregate
    /// outcome is in the [`Conclusion`].
    Root(Conclusion),

    /// Nothing was open. The caller closed a scope it never opened.
    NoOpenSet,
}

impl Closed {
    /// The conclusion of a root set, if this close finished one.
    pub fn conclusion(self) -> Option<Conclusion> {
        match self {
            Closed::Root(conclusion) => Some(conclusion),
            Closed::Nested | Closed::NoOpenSet => None,
        }
    }
}

/// Panic payload used to abort a context when an assertion fails with no
/// test set open.
///
/// Assertions outside any set have no aggregation target, so the first
/// failure is fatal. Hosts that catch the unwind can downcast to this type
/// to tell a harness abort from an ordinary panic.
#[derive(Debug)]
pub struct FallbackAbort {
    pub assertion: Assertion,
}

impl std::fmt::Display for FallbackAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "assertion failed outside any open test set: {}",
            self.assertion.source
        )
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::check;

    fn quiet() -> TestContext<Vec<u8>> {
        TestContext::new().with_target(Vec::<u8>::new())
    }

    fn transcript(ctx: TestContext<Vec<u8>>) -> String {
        String::from_utf8(ctx.target).unwrap()
    }

    #[test]
    fn round_trip_prints_diagnostics_at_record_time() {
        let mut ctx = quiet();
        let closed = ctx.set("outer", |ctx| {
            ctx.set("inner1", |ctx| {
                check!(ctx, 1 == 1);
                check!(ctx, 2 == 3);
            });
        });

        let conclusion = closed.conclusion().expect("outer is the root set");
        assert_eq!(conclusion.counts.total_passed(), 1);
        assert_eq!(conclusion.counts.total_failed(), 1);
        assert_eq!(conclusion.counts.total_errored(), 0);
        assert_eq!(ctx.open_depth(), 0);

        let expected = [
            // printed when the assertion was recorded, not deferred
            "inner1: check failed: 2 == 3",
            "Test Summary:",
            "outer    | Pass: 1  Fail: 1  Total: 2",
            "  inner1 | Pass: 1  Fail: 1  Total: 2",
            "",
        ]
        .join("\n");
        assert_eq!(transcript(ctx), expected);
    }

    #[test]
    fn nested_close_defers_all_summary_printing() {
        let mut ctx = quiet();
        ctx.open("outer");
        ctx.open("inner");
        check!(ctx, true);
        assert!(matches!(ctx.close(), Closed::Nested));
        assert_eq!(transcript(ctx), "");
    }

    #[test]
    fn closing_without_opening_is_detectable() {
        let mut ctx = quiet();
        assert!(matches!(ctx.close(), Closed::NoOpenSet));

        // the stray close corrupted nothing
        let closed = ctx.set("still fine", |ctx| {
            check!(ctx, true);
        });
        let conclusion = closed.conclusion().unwrap();
        assert_eq!(conclusion.counts.total(), 1);
        assert!(!conclusion.has_failures());
    }

    #[test]
    fn fallback_failure_aborts_before_the_next_assertion() {
        let mut ctx = quiet();
        let mut third_ran = false;

        let unwound = catch_unwind(AssertUnwindSafe(|| {
            check!(ctx, true);
            check!(ctx, false);
            third_ran = true;
            check!(ctx, true);
        }));

        let payload = unwound.expect_err("fallback failure must abort");
        let abort = payload
            .downcast_ref::<FallbackAbort>()
            .expect("payload should be a FallbackAbort");
        assert_eq!(abort.assertion.source, "false");
        assert!(!third_ran);
    }

    #[test]
    fn fallback_passes_are_silent_no_ops() {
        let mut ctx = quiet();
        check!(ctx, 1 == 1);
        assert_eq!(ctx.open_depth(), 0);
        assert_eq!(transcript(ctx), "");
    }

    #[test]
    fn verbosity_zero_suppresses_passing_detail() {
        let mut ctx = quiet();
        ctx.set_with(
            "quiet root",
            SetOptions::new().with_verbosity(0),
            |ctx| {
                ctx.set("child", |ctx| {
                    check!(ctx, true);
                });
                check!(ctx, true);
            },
        );

        assert_eq!(transcript(ctx), "Test Summary:\n");
    }

    #[test]
    fn failing_descendant_overrides_suppression() {
        let mut ctx = quiet();
        ctx.set_with(
            "quiet root",
            SetOptions::new().with_verbosity(0),
            |ctx| {
                ctx.set("noisy child", |ctx| {
                    check!(ctx, 1 == 2);
                });
            },
        );

        let expected = [
            "noisy child: check failed: 1 == 2",
            "Test Summary:",
            "quiet root    | Fail: 1  Total: 1",
            "  noisy child | Fail: 1  Total: 1",
            "",
        ]
        .join("\n");
        assert_eq!(transcript(ctx), expected);
    }

    #[test]
    fn verbosity_limit_fades_out_with_depth() {
        let mut ctx = quiet();
        ctx.set_with("root", SetOptions::new().with_verbosity(1), |ctx| {
            check!(ctx, true);
            ctx.set("hidden", |ctx| {
                check!(ctx, true);
            });
        });

        // root shows its own passes, the child inherited Limit(0); the
        // alignment still accounts for the suppressed child's row
        let expected = [
            "Test Summary:",
            "root     | Pass: 2  Total: 2",
            "",
        ]
        .join("\n");
        assert_eq!(transcript(ctx), expected);
    }

    #[test]
    fn set_each_substitutes_the_loop_value() {
        let mut ctx = quiet();
        let closed = ctx.set("root", |ctx| {
            ctx.set_each("case {}", [1, 2, 3], |ctx, n| {
                check!(ctx, n > 0);
            });
        });

        let conclusion = closed.conclusion().unwrap();
        assert_eq!(conclusion.counts.total_passed(), 3);

        let descriptions: Vec<_> = conclusion
            .set
            .children()
            .iter()
            .filter_map(|entry| match entry {
                crate::set::Entry::Set(child) => Some(child.description().to_owned()),
                crate::set::Entry::Check(_) => None,
            })
            .collect();
        assert_eq!(descriptions, ["case 1", "case 2", "case 3"]);
    }

    #[test]
    fn contexts_are_isolated_per_thread() {
        let (tx, rx) = crossbeam_channel::unbounded();

        std::thread::scope(|scope| {
            for failures in [0usize, 2] {
                let tx = tx.clone();
                scope.spawn(move || {
                    let mut ctx = quiet();
                    let closed = ctx.set(format!("worker {failures}"), |ctx| {
                        check!(ctx, true);
                        for _ in 0..failures {
                            check!(ctx, false);
                        }
                    });
                    let _ = tx.send((failures, closed.conclusion().unwrap()));
                });
            }
        });
        drop(tx);

        let mut seen = 0;
        while let Ok((failures, conclusion)) = rx.recv() {
            assert_eq!(conclusion.counts.total_passed(), 1);
            assert_eq!(conclusion.counts.total_failed(), failures);
            seen += 1;
        }
        assert_eq!(seen, 2);
    }
}

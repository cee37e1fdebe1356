use std::borrow::Cow;

use crate::value::BoxedValue;

/// The recorded outcome of a single assertion.
///
/// An assertion is immutable once produced. It carries the assertion as
/// written ([`source`](Self::source)), an optional rendering with evaluated
/// terms substituted ([`expanded`](Self::expanded)), and the classified
/// [`AssertionStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Assertion {
    pub kind: CheckKind,
    pub status: AssertionStatus,
    pub source: Cow<'static, str>,
    pub expanded: Option<String>,
}

impl Assertion {
    pub fn passed(&self) -> bool {
        self.status.passed()
    }

    pub fn failed(&self) -> bool {
        self.status.failed()
    }

    pub fn errored(&self) -> bool {
        self.status.errored()
    }

    /// A one-line description of a failed or errored assertion.
    ///
    /// Returns `None` for a passing assertion, which has nothing to report.
    pub fn diagnostic(&self) -> Option<String> {
        let source = self.source.as_ref();
        Some(match &self.status {
            AssertionStatus::Passed => return None,
            AssertionStatus::Failed(AssertionFailure::ReturnedFalse) => match &self.expanded {
                None => format!("check failed: {source}"),
                Some(expanded) => format!("check failed: {source} evaluated as {expanded}"),
            },
            AssertionStatus::Failed(AssertionFailure::DidNotPanic { expected }) => {
                format!("check failed: {source} did not panic, expected {expected}")
            }
            AssertionStatus::Failed(AssertionFailure::PanicMismatch { expected, got }) => {
                format!("check failed: {source} panicked with {got:?}, expected {expected}")
            }
            AssertionStatus::Errored(AssertionError::NonBool { value }) => {
                format!("check errored: {source} produced non-boolean value {value}")
            }
            AssertionStatus::Errored(AssertionError::Raised { payload, origin }) => match origin {
                Some(origin) => {
                    format!("check errored: {source} panicked at {origin}: {payload}")
                }
                None => format!("check errored: {source} panicked: {payload}"),
            },
        })
    }
}

/// Which entry point produced an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckKind {
    /// A boolean predicate was evaluated.
    Bool,

    /// The checked action was expected to panic with a given payload kind.
    Panics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssertionStatus {
    Passed,
    Failed(AssertionFailure),
    Errored(AssertionError),
}

impl AssertionStatus {
    pub fn passed(&self) -> bool {
        matches!(self, AssertionStatus::Passed)
    }

    pub fn failed(&self) -> bool {
        matches!(self, AssertionStatus::Failed(_))
    }

    pub fn errored(&self) -> bool {
        matches!(self, AssertionStatus::Errored(_))
    }
}

/// Why an assertion failed.
///
/// A failure means the check evaluated cleanly and the result was not what
/// the assertion claimed. Contrast with [`AssertionError`], which means the
/// check could not be evaluated at all.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssertionFailure {
    /// The checked expression evaluated cleanly to `false`.
    ReturnedFalse,

    /// The action was expected to panic but returned normally.
    DidNotPanic { expected: &'static str },

    /// The action panicked with a payload of an unexpected type.
    PanicMismatch { expected: &'static str, got: String },
}

/// Why an assertion could not be evaluated.
///
/// Errors signal a defect in the test itself rather than in the code under
/// test. They are recorded and execution continues.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssertionError {
    /// The predicate produced something other than a boolean.
    NonBool { value: BoxedValue },

    /// The predicate panicked while being evaluated.
    Raised {
        payload: String,
        origin: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion(status: AssertionStatus) -> Assertion {
        Assertion {
            kind: CheckKind::Bool,
            status,
            source: "a == b".into(),
            expanded: None,
        }
    }

    #[test]
    fn exactly_one_status_predicate_holds() {
        let statuses = [
            AssertionStatus::Passed,
            AssertionStatus::Failed(AssertionFailure::ReturnedFalse),
            AssertionStatus::Errored(AssertionError::Raised {
                payload: "boom".into(),
                origin: None,
            }),
        ];

        for status in statuses {
            let a = assertion(status);
            let hits = [a.passed(), a.failed(), a.errored()]
                .into_iter()
                .filter(|hit| *hit)
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn passing_assertions_have_no_diagnostic() {
        assert_eq!(assertion(AssertionStatus::Passed).diagnostic(), None);
    }

    #[test]
    fn diagnostics_carry_the_source_text() {
        let failed = assertion(AssertionStatus::Failed(AssertionFailure::ReturnedFalse));
        assert_eq!(failed.diagnostic().unwrap(), "check failed: a == b");

        let expanded = Assertion {
            expanded: Some("1 == 2".into()),
            ..failed
        };
        assert_eq!(
            expanded.diagnostic().unwrap(),
            "check failed: a == b evaluated as 1 == 2"
        );
    }
}

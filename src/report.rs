use std::{io, process::ExitCode};

use crate::{set::RecordingSet, summary::Counts};

/// The aggregate outcome of a finished root test set.
///
/// Produced after the summary has been printed; surfacing failure status is
/// deliberately left to the caller so that the report always lands in full
/// before the run is declared failed.
#[derive(Debug)]
#[non_exhaustive]
pub struct Conclusion {
    /// The sealed root set with every recorded descendant.
    pub set: RecordingSet,

    /// Rolled-up counts of the whole tree.
    pub counts: Counts,

    /// Write errors hit while printing diagnostics or the summary. The run
    /// itself is unaffected by a broken output target.
    pub fmt_errors: Vec<io::Error>,
}

impl Conclusion {
    pub fn has_failures(&self) -> bool {
        self.counts.has_failures()
    }

    /// The exit status a host process should propagate for this run.
    pub fn exit_code(&self) -> ExitCode {
        match self.has_failures() {
            true => ExitCode::FAILURE,
            false => ExitCode::SUCCESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::Verbosity;

    #[test]
    fn failure_status_follows_the_counts() {
        let set = RecordingSet::new("done".into(), Verbosity::Unbounded);
        let clean = Conclusion {
            set: set.clone(),
            counts: Counts {
                passed: 3,
                ..Counts::default()
            },
            fmt_errors: Vec::new(),
        };
        assert!(!clean.has_failures());

        let failed = Conclusion {
            set,
            counts: Counts {
                passed: 3,
                child_errored: 1,
                ..Counts::default()
            },
            fmt_errors: Vec::new(),
        };
        assert!(failed.has_failures());

        // ExitCode has no PartialEq; compare through its Debug rendering
        assert_ne!(
            format!("{:?}", clean.exit_code()),
            format!("{:?}", failed.exit_code())
        );
    }
}

//! Aggregation and printing of a finished test-set tree.
//!
//! Everything in this module is a pure function over a sealed
//! [`RecordingSet`]: rolling up pass/fail/error counts, computing the column
//! alignment for the printed table, deciding which rows verbosity allows, and
//! rendering the summary itself.

use std::io;

use crate::set::{Entry, RecordingSet};

/// Rolled-up outcome counts for one set.
///
/// `passed`/`failed`/`errored` count assertions recorded directly under the
/// set; the `child_*` fields sum everything below its nested sets. Totals are
/// own plus child at every level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub child_passed: usize,
    pub child_failed: usize,
    pub child_errored: usize,
}

impl Counts {
    pub fn total_passed(&self) -> usize {
        self.passed + self.child_passed
    }

    pub fn total_failed(&self) -> usize {
        self.failed + self.child_failed
    }

    pub fn total_errored(&self) -> usize {
        self.errored + self.child_errored
    }

    pub fn total(&self) -> usize {
        self.total_passed() + self.total_failed() + self.total_errored()
    }

    pub fn has_failures(&self) -> bool {
        self.total_failed() > 0 || self.total_errored() > 0
    }
}

/// Roll up the counts of a set and everything below it.
pub fn counts(set: &RecordingSet) -> Counts {
    let mut rolled = Counts::default();
    for entry in set.children() {
        match entry {
            Entry::Check(assertion) => match () {
                _ if assertion.passed() => rolled.passed += 1,
                _ if assertion.failed() => rolled.failed += 1,
                _ => rolled.errored += 1,
            },
            Entry::Set(child) => {
                let sub = counts(child);
                rolled.child_passed += sub.total_passed();
                rolled.child_failed += sub.total_failed();
                rolled.child_errored += sub.total_errored();
            }
        }
    }
    rolled
}

/// The character offset at which the count columns start, computed over the
/// whole tree so every row lines up regardless of depth or description
/// length.
pub fn alignment(set: &RecordingSet, depth: usize) -> usize {
    let own = 2 * depth + set.description().chars().count();
    set.children()
        .iter()
        .filter_map(|entry| match entry {
            Entry::Set(child) => Some(alignment(child, depth + 1)),
            Entry::Check(_) => None,
        })
        .fold(own, usize::max)
}

/// Whether a set gets a row in the printed summary.
///
/// Failures are always visible, and carry visibility up through every
/// ancestor so they are never hidden behind a suppressed set. Passing detail
/// is visible only while the set's verbosity allows it.
pub fn visible(set: &RecordingSet) -> bool {
    set.verbosity().shows_passes()
        || set.children().iter().any(|entry| match entry {
            Entry::Check(assertion) => !assertion.passed(),
            Entry::Set(child) => visible(child),
        })
}

/// Print the summary table for a finished root set.
///
/// The header line is followed by one row per visible set in depth-first
/// pre-order. Count columns are sized once from the whole tree; a category
/// whose tree-wide total is zero is omitted entirely.
pub fn print_summary<W: io::Write>(target: &mut W, root: &RecordingSet) -> io::Result<()> {
    let align = alignment(root, 0);
    let columns = Columns::measure(&counts(root));
    writeln!(target, "Test Summary:")?;
    print_set(target, root, 0, align, &columns)
}

struct Columns {
    passed: Option<usize>,
    failed: Option<usize>,
    errored: Option<usize>,
    total: usize,
}

impl Columns {
    /// Totals only grow toward the root, so the root's counts bound every
    /// printed number.
    fn measure(root: &Counts) -> Self {
        Self {
            passed: (root.total_passed() > 0).then(|| digit_width(root.total_passed())),
            failed: (root.total_failed() > 0).then(|| digit_width(root.total_failed())),
            errored: (root.total_errored() > 0).then(|| digit_width(root.total_errored())),
            total: digit_width(root.total()),
        }
    }
}

fn digit_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

fn print_set<W: io::Write>(
    target: &mut W,
    set: &RecordingSet,
    depth: usize,
    align: usize,
    columns: &Columns,
) -> io::Result<()> {
    if !visible(set) {
        return Ok(());
    }

    let rolled = counts(set);
    let indent = "  ".repeat(depth);
    let pad = align - 2 * depth;
    write!(target, "{indent}{:<pad$} | ", set.description())?;
    match rolled.total() {
        0 => writeln!(target, "No tests")?,
        total => {
            if let Some(width) = columns.passed {
                write!(target, "Pass: {:>width$}  ", rolled.total_passed())?;
            }
            if let Some(width) = columns.failed {
                write!(target, "Fail: {:>width$}  ", rolled.total_failed())?;
            }
            if let Some(width) = columns.errored {
                write!(target, "Error: {:>width$}  ", rolled.total_errored())?;
            }
            writeln!(target, "Total: {total:>width$}", width = columns.total)?;
        }
    }

    // Nothing below can differ from this row when every recorded test is a
    // direct pass, so stop descending.
    if rolled.total() == rolled.passed {
        return Ok(());
    }

    for entry in set.children() {
        if let Entry::Set(child) = entry {
            print_set(target, child, depth + 1, align, columns)?;
        }
    }
    Ok(())
}

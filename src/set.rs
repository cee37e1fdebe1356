use crate::outcome::Assertion;

/// One opened test-set scope and everything recorded under it.
///
/// A recording set accepts [`record_check`](Self::record_check) and
/// [`record_set`](Self::record_set) calls while it is [`SetState::Open`] and
/// the top of its context's stack. Closing the scope seals it; a sealed set
/// is immutable and safe to read from anywhere.
#[derive(Debug, Clone)]
pub struct RecordingSet {
    description: String,
    verbosity: Verbosity,
    children: Vec<Entry>,
    state: SetState,
}

impl RecordingSet {
    pub(crate) fn new(description: String, verbosity: Verbosity) -> Self {
        Self {
            description,
            verbosity,
            children: Vec::new(),
            state: SetState::Open,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Recorded entries in insertion order. Insertion order is also the
    /// iteration order for aggregation and printing.
    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    pub fn is_closed(&self) -> bool {
        self.state == SetState::Closed
    }

    pub(crate) fn record_check(&mut self, assertion: Assertion) {
        debug_assert_eq!(self.state, SetState::Open);
        self.children.push(Entry::Check(assertion));
    }

    pub(crate) fn record_set(&mut self, set: RecordingSet) {
        debug_assert_eq!(self.state, SetState::Open);
        debug_assert!(set.is_closed());
        self.children.push(Entry::Set(set));
    }

    /// Transition `Open` to `Closed`. Returns whether the transition happened,
    /// so a second call is a detectable no-op.
    pub(crate) fn seal(&mut self) -> bool {
        match self.state {
            SetState::Open => {
                self.state = SetState::Closed;
                true
            }
            SetState::Closed => false,
        }
    }
}

/// One recorded child of a [`RecordingSet`].
#[derive(Debug, Clone)]
pub enum Entry {
    Check(Assertion),
    Set(RecordingSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetState {
    Open,
    Closed,
}

/// How many nesting levels below a set still print passing detail.
///
/// A set created inside another inherits its parent's verbosity decremented
/// by one, so a limit set at one level fades out as the tree deepens.
/// Failures are always reported regardless of verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Print passing detail at every depth.
    #[default]
    Unbounded,

    /// Print passing detail for this set only while the limit is above zero.
    /// `Limit(0)` suppresses passing detail at this set and below.
    Limit(u32),
}

impl Verbosity {
    /// The default verbosity for a set opened directly below one with `self`.
    pub fn child_default(self) -> Verbosity {
        match self {
            Verbosity::Unbounded => Verbosity::Unbounded,
            Verbosity::Limit(0) => Verbosity::Limit(0),
            Verbosity::Limit(n) => Verbosity::Limit(n - 1),
        }
    }

    /// Whether passing results recorded directly under this set are shown.
    pub fn shows_passes(self) -> bool {
        !matches!(self, Verbosity::Limit(0))
    }
}

impl From<u32> for Verbosity {
    fn from(limit: u32) -> Self {
        Verbosity::Limit(limit)
    }
}

/// Construction options for a test set.
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct SetOptions {
    pub verbosity: Option<Verbosity>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the inherited verbosity for this set.
    pub fn with_verbosity(self, verbosity: impl Into<Verbosity>) -> Self {
        Self {
            verbosity: Some(verbosity.into()),
        }
    }
}

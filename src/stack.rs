use crate::set::RecordingSet;

/// The ordered collection of currently open test sets.
///
/// One stack exists per logical execution context and is never shared across
/// threads. The top of the stack is the innermost open set; assertions record
/// into it. An empty stack means assertions fall through to the fallback
/// context, which fails fast instead of aggregating.
#[derive(Debug, Default)]
pub struct SetStack {
    open: Vec<RecordingSet>,
}

impl SetStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open sets. Zero at the start and end of a
    /// well-formed run.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn push(&mut self, set: RecordingSet) {
        self.open.push(set);
    }

    /// The set assertions currently record into. Never fails: an empty stack
    /// yields [`ActiveSet::Fallback`].
    pub fn current(&mut self) -> ActiveSet<'_> {
        match self.open.last_mut() {
            Some(set) => ActiveSet::Recording(set),
            None => ActiveSet::Fallback,
        }
    }

    pub fn top(&self) -> Option<&RecordingSet> {
        self.open.last()
    }

    /// Remove and return the innermost open set. Popping an empty stack
    /// returns [`PoppedSet::Fallback`]: a scope-management bug upstream, but
    /// deliberately not a panic so the caller can report it.
    pub fn pop(&mut self) -> PoppedSet {
        match self.open.pop() {
            Some(set) => PoppedSet::Recording(set),
            None => PoppedSet::Fallback,
        }
    }
}

/// The target an assertion records into.
#[derive(Debug)]
pub enum ActiveSet<'s> {
    Recording(&'s mut RecordingSet),
    Fallback,
}

/// The result of popping the stack.
#[derive(Debug)]
pub enum PoppedSet {
    Recording(RecordingSet),
    Fallback,
}

use std::{
    any::Any,
    fmt::{Debug, Display},
};

pub type BoxedValue = Box<dyn TestValue>;

/// A dynamically typed value observed by an assertion.
///
/// Most assertions produce plain booleans and never touch this trait. It
/// exists for embedders whose predicates evaluate host-language values: when
/// a predicate produces something that is not a boolean, the harness records
/// the observed value so the diagnostic can show what the predicate actually
/// returned.
///
/// The trait is blanket-implemented, so any `Debug + Display + Clone + Eq`
/// value that is `Send + Sync` can be boxed into a [`BoxedValue`]. Cloning
/// and comparing go through [`as_any`](Self::as_any) so that two boxes are
/// equal exactly when they hold the same concrete type with an equal value.
pub trait TestValue: Debug + Display + Send + Sync + 'static {
    /// The value behind its concrete type, for comparisons across boxes.
    fn as_any(&self) -> &dyn Any;

    fn boxed_clone(&self) -> BoxedValue;

    /// Whether `other` holds the same concrete type as `self` with an equal
    /// value.
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T> TestValue for T
where
    T: Any + Debug + Display + Clone + Eq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn boxed_clone(&self) -> BoxedValue {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| other == self)
    }
}

// `Box<dyn TestValue>` satisfies the blanket bounds itself, so these impls
// deref first: calling through `self` would resolve to the blanket impl for
// the box instead of dispatching to the stored value.
impl Clone for BoxedValue {
    fn clone(&self) -> Self {
        (**self).boxed_clone()
    }
}

impl PartialEq for BoxedValue {
    fn eq(&self, other: &Self) -> bool {
        (**self).dyn_eq((**other).as_any())
    }
}

impl Eq for BoxedValue {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_dispatches_to_the_stored_value() {
        let a: BoxedValue = Box::new(42i64);
        let b: BoxedValue = Box::new(42i64);
        let c: BoxedValue = Box::new(7i64);
        let s: BoxedValue = Box::new(String::from("42"));

        assert_eq!(&a, &b);
        assert_ne!(&a, &c);
        assert_ne!(&a, &s);
    }

    #[test]
    fn clone_preserves_the_underlying_type() {
        let a: BoxedValue = Box::new(String::from("observed"));
        let b = a.clone();
        assert_eq!(&a, &b);
        assert_eq!(b.to_string(), "observed");
    }
}

//! Key orderings used to place nodes in the tree.

use core::cmp::Ordering;
use core::fmt;

/// A total order over `Q`.
///
/// The tree relies on the order staying the same for as long as it holds
/// keys; an ordering that changes after insertion breaks the search tree.
pub trait Comparator<Q: ?Sized> {
    fn compare(&self, a: &Q, b: &Q) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation. The default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

impl<Q> Comparator<Q> for NaturalOrder
where
    Q: Ord + ?Sized,
{
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        a.cmp(b)
    }
}

/// Reverse of [`NaturalOrder`], largest key first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReverseOrder;

impl<Q> Comparator<Q> for ReverseOrder
where
    Q: Ord + ?Sized,
{
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        b.cmp(a)
    }
}

/// Adapts a closure `Fn(&Q, &Q) -> Ordering` into a [`Comparator`].
#[derive(Clone, Copy)]
pub struct FnComparator<F>(pub F);

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparator(..)")
    }
}

impl<Q, F> Comparator<Q> for FnComparator<F>
where
    Q: ?Sized,
    F: Fn(&Q, &Q) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        (self.0)(a, b)
    }
}

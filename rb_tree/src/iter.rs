use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::node::{Node, RawNode};

/// In-order iterator over the entries of a [`RedBlackTree`].
///
/// Walks the tree through parent links, so it needs no stack. Both ends are
/// tracked and the iterator stops once they have handed out `len` entries
/// between them.
///
/// [`RedBlackTree`]: crate::RedBlackTree
pub struct Iter<'a, K, V> {
    front: RawNode<K, V>,
    back: RawNode<K, V>,
    nil: RawNode<K, V>,
    remaining: usize,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<K, V> Iter<'_, K, V> {
    pub(crate) fn new(root: RawNode<K, V>, nil: RawNode<K, V>, len: usize) -> Self {
        unsafe {
            Self {
                front: root.min(nil),
                back: root.max(nil),
                nil,
                remaining: len,
                marker: PhantomData,
            }
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            nil: self.nil,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.front;
        self.remaining -= 1;
        unsafe {
            self.front = node.next(self.nil);
            Some(node.as_refs())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.back;
        self.remaining -= 1;
        unsafe {
            self.back = node.prev(self.nil);
            Some(node.as_refs())
        }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> fmt::Debug for Iter<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V, C, A> IntoIterator for &'a crate::RedBlackTree<K, V, C, A>
where
    A: allocator_api2::alloc::Allocator,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A position in a [`RedBlackTree`].
///
/// Besides the entries there is one extra "end" position which sits between
/// the largest and the smallest entry. Moving past either end lands on it and
/// moving once more wraps around to the other end.
///
/// [`RedBlackTree`]: crate::RedBlackTree
pub struct Cursor<'a, K, V> {
    current: RawNode<K, V>,
    root: RawNode<K, V>,
    nil: RawNode<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            current: self.current,
            root: self.root,
            nil: self.nil,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn new(current: RawNode<K, V>, root: RawNode<K, V>, nil: RawNode<K, V>) -> Self {
        Self {
            current,
            root,
            nil,
            marker: PhantomData,
        }
    }

    /// Returns `true` if the cursor is on the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.current == self.nil
    }

    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        self.entry(self.current)
    }

    pub fn key(&self) -> Option<&'a K> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.get().map(|(_, v)| v)
    }

    /// Moves to the next larger entry. From the largest entry this moves to
    /// the end position, from the end position to the smallest entry.
    pub fn move_next(&mut self) {
        self.current = self.step_next();
    }

    /// Moves to the next smaller entry. From the smallest entry this moves to
    /// the end position, from the end position to the largest entry.
    pub fn move_prev(&mut self) {
        self.current = self.step_prev();
    }

    pub fn peek_next(&self) -> Option<(&'a K, &'a V)> {
        self.entry(self.step_next())
    }

    pub fn peek_prev(&self) -> Option<(&'a K, &'a V)> {
        self.entry(self.step_prev())
    }

    fn step_next(&self) -> RawNode<K, V> {
        unsafe {
            if self.is_end() {
                self.root.min(self.nil)
            } else {
                self.current.next(self.nil)
            }
        }
    }

    fn step_prev(&self) -> RawNode<K, V> {
        unsafe {
            if self.is_end() {
                self.root.max(self.nil)
            } else {
                self.current.prev(self.nil)
            }
        }
    }

    fn entry(&self, node: RawNode<K, V>) -> Option<(&'a K, &'a V)> {
        (node != self.nil).then(|| unsafe { node.as_refs() })
    }
}

impl<K, V> fmt::Debug for Cursor<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::compare::ReverseOrder;
    use crate::RedBlackTree;

    fn tree_of(keys: &[i32]) -> RedBlackTree<i32, i32> {
        let mut tree = RedBlackTree::new();
        for &it in keys {
            tree.insert(it, it * 10).unwrap();
        }
        tree
    }

    #[test]
    fn iter_both_ends() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);

        let forward: Vec<_> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(forward, [1, 3, 4, 5, 7, 8, 9]);

        let backward: Vec<_> = tree.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(backward, [9, 8, 7, 5, 4, 3, 1]);

        let mut iter = tree.iter();
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some((&1, &10)));
        assert_eq!(iter.next_back(), Some((&9, &90)));
        assert_eq!(iter.len(), 5);

        // both ends meet in the middle without yielding anything twice
        let rest: Vec<_> = iter.by_ref().map(|(k, _)| *k).collect();
        assert_eq!(rest, [3, 4, 5, 7, 8]);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn iter_empty() {
        let tree = RedBlackTree::<i32, i32>::new();
        assert_eq!(tree.iter().next(), None);
        assert_eq!(tree.iter().next_back(), None);
        assert_eq!(tree.iter().len(), 0);
        assert_eq!(format!("{:?}", tree.iter()), "[]");
    }

    #[test]
    fn into_iter_ref() {
        let tree = tree_of(&[2, 1]);
        let mut keys = Vec::new();
        for (k, v) in &tree {
            keys.push((*k, *v));
        }
        assert_eq!(keys, [(1, 10), (2, 20)]);
        assert_eq!(format!("{:?}", tree.iter()), "[(1, 10), (2, 20)]");
    }

    #[test]
    fn cursor_walk() {
        let tree = tree_of(&[20, 10, 30]);

        let mut cursor = tree.cursor_front();
        assert_eq!(cursor.key(), Some(&10));
        assert_eq!(cursor.peek_prev(), None);
        assert_eq!(cursor.peek_next(), Some((&20, &200)));

        cursor.move_next();
        cursor.move_next();
        assert_eq!(cursor.value(), Some(&300));

        // off the end and around
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor.get(), None);
        assert_eq!(cursor.peek_next(), Some((&10, &100)));
        assert_eq!(cursor.peek_prev(), Some((&30, &300)));
        cursor.move_next();
        assert_eq!(cursor.key(), Some(&10));

        cursor.move_prev();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert_eq!(cursor.key(), Some(&30));
        assert_eq!(tree.cursor_back().key(), Some(&30));
    }

    #[test]
    fn cursor_from_find() {
        let tree = tree_of(&[50, 40, 30, 20, 10]);

        let mut cursor = tree.find(&30);
        let copy = cursor.clone();
        cursor.move_prev();
        assert_eq!(cursor.key(), Some(&20));
        assert_eq!(copy.key(), Some(&30));
        assert_eq!(format!("{copy:?}"), "Cursor(Some((30, 300)))");

        let missing = tree.find(&35);
        assert!(missing.is_end());
        assert_eq!(missing.peek_next(), Some((&10, &100)));
    }

    #[test]
    fn cursor_empty_tree() {
        let tree = RedBlackTree::<i32, i32>::new();
        let mut cursor = tree.cursor_front();
        assert!(cursor.is_end());
        assert_eq!(cursor.peek_next(), None);
        assert_eq!(cursor.peek_prev(), None);
        cursor.move_next();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert!(cursor.is_end());
        assert!(tree.cursor_back().is_end());
    }

    #[test]
    fn reverse_order_iter() {
        let mut tree = RedBlackTree::with_comparator(ReverseOrder);
        for it in 0..10 {
            tree.insert(it, ()).unwrap();
        }
        assert!(tree.iter().map(|(k, _)| *k).eq((0..10).rev()));
        assert_eq!(tree.cursor_front().key(), Some(&9));
    }

    mod proptests {
        use std::collections::BTreeMap;

        use proptest::prelude::*;

        use super::*;

        proptest!(
            #[test]
            fn matches_btree_map(
                inserts in proptest::collection::vec(-1000..1000i32, 0..300),
                deletes in proptest::collection::vec(-1000..1000i32, 0..100),
            ) {
                let mut reference = BTreeMap::new();
                let mut tree = RedBlackTree::new();
                for &it in &inserts {
                    reference.entry(it).or_insert(it);
                    tree.insert(it, it).unwrap();
                }
                for it in &deletes {
                    prop_assert_eq!(reference.remove(it).is_some(), tree.delete(it).is_ok());
                }

                prop_assert!(tree.iter().eq(reference.iter()));
                prop_assert!(tree.iter().rev().eq(reference.iter().rev()));
                prop_assert_eq!(tree.iter().len(), reference.len());

                let mut cursor = tree.cursor_front();
                for (k, v) in &reference {
                    prop_assert_eq!(cursor.get(), Some((k, v)));
                    cursor.move_next();
                }
                prop_assert!(cursor.is_end());
            }
        );
    }
}

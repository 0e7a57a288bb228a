use core::alloc::Layout;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::{fmt, mem};
use std::alloc::handle_alloc_error;

use allocator_api2::alloc::{Allocator, Global};
use log::{debug, trace, warn};

use crate::compare::{Comparator, NaturalOrder};
use crate::iter::{Cursor, Iter};
use crate::node::{Color, DebugNode, Node, NodePos, RawNode};
use crate::TreeError;

/// An ordered map with unique keys, backed by a red-black tree.
///
/// Every leaf position and the parent of the root point at one per-tree
/// sentinel node, so the rebalancing code never has to special case a
/// missing child. Keys are placed with the comparator `C` and every node is
/// allocated one at a time from `A`.
pub struct RedBlackTree<K, V, C = NaturalOrder, A = Global>
where
    A: Allocator,
{
    // INVARIANTS:
    //  * `root == nil` iff `len == 0`
    //  * every link of a real node points to a real node or to `nil`
    //  * `nil` is black, its key and value are never initialized and its
    //    links are only meaningful inside `delete_core`
    root: RawNode<K, V>,
    nil: RawNode<K, V>,
    len: usize,
    cmp: C,
    alloc: A,
    marker: PhantomData<Box<Node<K, V>>>,
}

/// Where a key lives or would be attached.
enum Slot<K, V> {
    Occupied(RawNode<K, V>),
    Vacant {
        parent: RawNode<K, V>,
        side: Ordering,
    },
}

impl<K, V, C, A> Drop for RedBlackTree<K, V, C, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        // `clear` empties the tree before freeing anything, so a panic in
        // `K::drop` or `V::drop` leaks the remaining nodes and the sentinel
        // but never frees a node twice
        self.clear();
        unsafe { self.deallocate_node(self.nil) };
    }
}

impl<K, V, C, A> fmt::Debug for RedBlackTree<K, V, C, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct TreeDebug<'a, K, V> {
            root: RawNode<K, V>,
            nil: RawNode<K, V>,
            marker: PhantomData<&'a Node<K, V>>,
        }

        impl<K, V> fmt::Debug for TreeDebug<'_, K, V>
        where
            K: fmt::Debug,
            V: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut f = f.debug_list();

                let nil = self.nil;
                let mut func = |node: RawNode<K, V>| {
                    f.entry(&DebugNode {
                        node,
                        nil,
                        marker: PhantomData,
                    });
                };

                unsafe { inorder_for_each_core(self.root, nil, &mut func) };
                f.finish()
            }
        }

        let mut f = f.debug_struct("RedBlackTree");
        f.field("len", &self.len);

        match self.len {
            0 => {
                f.field("root", &None::<K>);
                let nodes: &[K] = &[];
                f.field("nodes", &nodes);
            }
            _ => {
                f.field(
                    "root",
                    &Some(DebugNode {
                        node: self.root,
                        nil: self.nil,
                        marker: PhantomData,
                    }),
                );
                f.field(
                    "nodes",
                    &TreeDebug {
                        root: self.root,
                        nil: self.nil,
                        marker: PhantomData,
                    },
                );
            }
        }

        f.finish()
    }
}

impl<K, V> RedBlackTree<K, V> {
    pub fn new() -> Self {
        Self::with_comparator_in(NaturalOrder, Global)
    }
}

impl<K, V> Default for RedBlackTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> RedBlackTree<K, V, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, Global)
    }
}

impl<K, V, A> RedBlackTree<K, V, NaturalOrder, A>
where
    A: Allocator,
{
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(NaturalOrder, alloc)
    }
}

impl<K, V, C, A> RedBlackTree<K, V, C, A>
where
    A: Allocator,
{
    const NODE_LAYOUT: Layout = Layout::new::<Node<K, V>>();

    /// Creates an empty tree.
    ///
    /// The sentinel is allocated from `alloc` up front; if that fails this
    /// calls [`handle_alloc_error`]. Use [`try_with_comparator_in`] to get an
    /// error instead.
    ///
    /// [`try_with_comparator_in`]: Self::try_with_comparator_in
    pub fn with_comparator_in(cmp: C, alloc: A) -> Self {
        match Self::try_with_comparator_in(cmp, alloc) {
            Ok(tree) => tree,
            Err(_) => handle_alloc_error(Self::NODE_LAYOUT),
        }
    }

    pub fn try_with_comparator_in(cmp: C, alloc: A) -> Result<Self, TreeError> {
        let ptr = Self::allocate_node(&alloc)?;
        let nil = RawNode::from_ptr(ptr);
        // SAFETY: `ptr` is freshly allocated with the layout of `Node<K, V>`
        unsafe { ptr.as_ptr().write(Node::sentinel(nil)) };

        Ok(Self {
            root: nil,
            nil,
            len: 0,
            cmp,
            alloc,
            marker: PhantomData,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn allocate_node(alloc: &A) -> Result<NonNull<Node<K, V>>, TreeError> {
        match alloc.allocate(Self::NODE_LAYOUT) {
            Ok(ptr) => Ok(ptr.cast()),
            Err(_) => {
                warn!(
                    "allocation of a {} byte tree node failed",
                    Self::NODE_LAYOUT.size()
                );
                Err(TreeError::CapacityExceeded)
            }
        }
    }

    fn create_node(&self, key: K, value: V) -> Result<RawNode<K, V>, TreeError> {
        let ptr = Self::allocate_node(&self.alloc)?;
        // new nodes are always red, `attach` recolors the root
        unsafe { ptr.as_ptr().write(Node::leaf(key, value, Color::Red, self.nil)) };
        Ok(RawNode::from_ptr(ptr))
    }

    /// Returns the storage of `node` to the allocator.
    ///
    /// # SAFETY
    ///
    /// * `node` was allocated by `self.alloc` and is no longer linked into the tree
    /// * its key and value were already moved out or dropped (or it is the sentinel)
    unsafe fn deallocate_node(&self, node: RawNode<K, V>) {
        unsafe {
            self.alloc
                .deallocate(node.as_non_null().cast(), Self::NODE_LAYOUT)
        }
    }

    unsafe fn destroy_node(&self, mut node: RawNode<K, V>) {
        unsafe {
            node.drop_key_value();
            self.deallocate_node(node);
        }
    }

    /// Post-order destruction of every real node below and including `node`.
    unsafe fn destroy_subtree(&self, node: RawNode<K, V>) {
        if node == self.nil {
            return;
        }

        unsafe {
            self.destroy_subtree(node.left());
            self.destroy_subtree(node.right());
            self.destroy_node(node);
        }
    }

    /// Removes every entry. The tree stays usable.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }

        debug!("clearing tree with {} entries", self.len);
        let root = mem::replace(&mut self.root, self.nil);
        self.len = 0;
        unsafe { self.destroy_subtree(root) };
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root, self.nil, self.len)
    }

    /// Cursor on the smallest entry, or on the end position if the tree is empty.
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        self.cursor_at(unsafe { self.root.min(self.nil) })
    }

    /// Cursor on the largest entry, or on the end position if the tree is empty.
    pub fn cursor_back(&self) -> Cursor<'_, K, V> {
        self.cursor_at(unsafe { self.root.max(self.nil) })
    }

    fn cursor_at(&self, node: RawNode<K, V>) -> Cursor<'_, K, V> {
        Cursor::new(node, self.root, self.nil)
    }

    pub fn inorder_for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        let mut f = |mut node: RawNode<K, V>| {
            let (key, value) = unsafe { node.as_muts() };
            f(key, value)
        };
        unsafe { inorder_for_each_core(self.root, self.nil, &mut f) }
    }

    /// Renders the tree for debugging, see [`Pretty`].
    pub fn pretty(&self) -> Pretty<'_, K, V> {
        Pretty {
            root: self.root,
            nil: self.nil,
            marker: PhantomData,
        }
    }

    /// Returns the node holding `key` or `self.nil`.
    fn search<Q>(&self, key: &Q) -> RawNode<K, V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut x = self.root;
        while x != self.nil {
            match self.cmp.compare(key, unsafe { x.key() }.borrow()) {
                Ordering::Less => x = unsafe { x.left() },
                Ordering::Equal => return x,
                Ordering::Greater => x = unsafe { x.right() },
            }
        }

        x
    }

    /// Cursor on the entry with `key`, or on the end position if there is none.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.cursor_at(self.search(key))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        (node != self.nil).then(|| unsafe { node.as_refs() })
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut node = self.search(key);
        (node != self.nil).then(|| unsafe { node.as_muts() })
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.search(key) != self.nil
    }

    pub fn min(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }
        unsafe { Some(self.root.min(self.nil).as_refs()) }
    }

    pub fn max(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }
        unsafe { Some(self.root.max(self.nil).as_refs()) }
    }

    /// The entry right after `key` in key order, if `key` is in the tree.
    pub fn successor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        if node == self.nil {
            return None;
        }
        let next = unsafe { node.next(self.nil) };
        (next != self.nil).then(|| unsafe { next.as_refs() })
    }

    /// The entry right before `key` in key order, if `key` is in the tree.
    pub fn predecessor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.search(key);
        if node == self.nil {
            return None;
        }
        let prev = unsafe { node.prev(self.nil) };
        (prev != self.nil).then(|| unsafe { prev.as_refs() })
    }

    fn slot(&self, key: &K) -> Slot<K, V>
    where
        C: Comparator<K>,
    {
        // Move left/right down the tree until we find an empty slot
        let mut parent = self.nil;
        let mut side = Ordering::Equal;
        let mut x = self.root;
        while x != self.nil {
            parent = x;
            side = self.cmp.compare(key, unsafe { x.key() });
            match side {
                Ordering::Less => x = unsafe { x.left() },
                Ordering::Equal => return Slot::Occupied(x),
                Ordering::Greater => x = unsafe { x.right() },
            }
        }

        Slot::Vacant { parent, side }
    }

    /// Inserts `key` with `value` unless an equal key is already present.
    ///
    /// Returns a cursor on the entry holding the key and whether a new entry
    /// was created. On a duplicate key the tree is not modified and `key` and
    /// `value` are dropped.
    pub fn insert(&mut self, key: K, value: V) -> Result<(Cursor<'_, K, V>, bool), TreeError>
    where
        C: Comparator<K>,
    {
        let (node, inserted) = match self.slot(&key) {
            Slot::Occupied(node) => {
                debug!("insert of an existing key, tree left unchanged");
                (node, false)
            }
            Slot::Vacant { parent, side } => (self.attach(key, value, parent, side)?, true),
        };

        Ok((self.cursor_at(node), inserted))
    }

    /// Like [`insert`](Self::insert) but reports a duplicate key as
    /// [`TreeError::DuplicateKey`].
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Cursor<'_, K, V>, TreeError>
    where
        C: Comparator<K>,
    {
        match self.slot(&key) {
            Slot::Occupied(_) => Err(TreeError::DuplicateKey),
            Slot::Vacant { parent, side } => {
                let node = self.attach(key, value, parent, side)?;
                Ok(self.cursor_at(node))
            }
        }
    }

    /// Inserts `key` with `value`, replacing and returning the value of an
    /// existing equal key. The key already in the tree is kept.
    pub fn insert_or_replace(&mut self, key: K, value: V) -> Result<Option<V>, TreeError>
    where
        C: Comparator<K>,
    {
        match self.slot(&key) {
            Slot::Occupied(mut node) => {
                let (_, old) = unsafe { node.as_muts() };
                Ok(Some(mem::replace(old, value)))
            }
            Slot::Vacant { parent, side } => {
                self.attach(key, value, parent, side)?;
                Ok(None)
            }
        }
    }

    /// Links a new node below `parent` on `side` and rebalances.
    ///
    /// Allocation is the only step that can fail and it happens before the
    /// tree is touched.
    fn attach(
        &mut self,
        key: K,
        value: V,
        mut parent: RawNode<K, V>,
        side: Ordering,
    ) -> Result<RawNode<K, V>, TreeError> {
        let mut node = self.create_node(key, value)?;

        unsafe {
            node.set_parent(parent);
            if parent == self.nil {
                self.root = node;
            } else if side == Ordering::Less {
                parent.set_left(node);
            } else {
                parent.set_right(node);
            }
            self.len += 1;

            if parent == self.nil {
                // the first node, it only needs to be black
                node.set_color(Color::Black);
            } else if parent.parent() != self.nil {
                // a red child under the black root cannot violate anything,
                // deeper than that the parent may be red
                self.insert_fixup(node);
            }
        }

        Ok(node)
    }

    fn insert_fixup(&mut self, new_node: RawNode<K, V>) {
        let mut node = new_node;
        unsafe {
            // The root's parent is the black sentinel, so this stops at the latest at the root.
            while node.parent().color().is_red() {
                debug_assert!(node.color().is_red());
                // red-black properties are violated because red parent has a red child
                //
                // Note that there is only one violation at this point.
                // At first iteration it's the new_node and it's parent.
                // If we take the "red uncle" branch then at next iteration it will be
                // the grand_parent and it's parent that violate the red-black properties.
                // If we take the other branch, there will be no more iterations as that
                // will result in a black parent.
                let mut parent = node.parent();
                // parent is red and thus not the root, the grand parent is a real node
                let mut grand_parent = parent.parent();
                debug_assert!(grand_parent != self.nil);
                debug_assert!(grand_parent.color().is_black());

                if parent == grand_parent.left() {
                    let mut uncle = grand_parent.right();
                    if uncle.color().is_red() {
                        //     +--- gp:b ---+               +--- gp:r ---+
                        //     |            |               |            |
                        //  + p:r +      + u:r +   -->   + p:b +      + u:b +
                        //  |     |      |     |         |     |      |     |
                        // n:r   a:b    b:b   c:b       n:r   a:b    b:b   c:b
                        // (a, b, c can be any subtrees)
                        //
                        // Coloring `n` black would add a black node to one path only.
                        // Moving the black down from the grand parent keeps the black
                        // height, but the grand parent may now have a red parent, so
                        // repeat with the grand parent as the new node.
                        parent.set_color(Color::Black);
                        uncle.set_color(Color::Black);
                        grand_parent.set_color(Color::Red);
                        node = grand_parent;
                    } else {
                        if node == parent.right() {
                            //       +-- gp:b --+                 +-- gp:b --+
                            //       |          |                 |          |
                            //  +-- p:r --+    u:b  -->       +- n:r --+    u:b
                            //  |         |                   |        |
                            // a:b    +- n:r -+           +- p:r -+   c:b
                            //        |       |           |       |
                            //       b:b     c:b         a:b     b:b
                            //
                            // left rotate parent and swap node and parent so we match the case below
                            self.rotate_left(parent);
                            mem::swap(&mut parent, &mut node);
                        }

                        //           +-- gp:b --+            +----- p:b -----+
                        //           |          |            |               |
                        //      +-- p:r --+    u:b  -->   +- n:r -+     +- gp:r -+
                        //      |         |               |       |     |        |
                        //  +- n:r -+    c:b             a:b     b:b   c:b      u:b
                        //  |       |
                        // a:b     b:b
                        //
                        // This fixes the one violation we had, the loop ends since
                        // `node` now has a black parent.
                        parent.set_color(Color::Black);
                        grand_parent.set_color(Color::Red);
                        self.rotate_right(grand_parent);
                    }
                } else {
                    // same as above but left/right are switched
                    let mut uncle = grand_parent.left();
                    if uncle.color().is_red() {
                        parent.set_color(Color::Black);
                        uncle.set_color(Color::Black);
                        grand_parent.set_color(Color::Red);
                        node = grand_parent;
                    } else {
                        if node == parent.left() {
                            self.rotate_right(parent);
                            mem::swap(&mut parent, &mut node);
                        }

                        parent.set_color(Color::Black);
                        grand_parent.set_color(Color::Red);
                        self.rotate_left(grand_parent);
                    }
                }
            }

            self.root.set_color(Color::Black);
        }
    }

    fn rotate_left(&mut self, mut node: RawNode<K, V>) {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        // where a, b, c can be any subtrees
        unsafe {
            let mut right = node.right();
            if right == self.nil {
                return;
            }

            // attach b to node
            let mut b = right.left();
            node.set_right(b);
            if b != self.nil {
                b.set_parent(node);
            }

            // attach right to parent
            let mut parent = node.parent();
            right.set_parent(parent);
            match node.pos(self.nil) {
                NodePos::Root => {
                    trace!("rotate_left replaced the root");
                    self.root = right;
                }
                NodePos::Left => parent.set_left(right),
                NodePos::Right => parent.set_right(right),
            }

            // attach node to right
            right.set_left(node);
            node.set_parent(right);
        }
    }

    fn rotate_right(&mut self, mut node: RawNode<K, V>) {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        // where a, b, c can be any subtrees
        unsafe {
            let mut left = node.left();
            if left == self.nil {
                return;
            }

            // attach b to node
            let mut b = left.right();
            node.set_left(b);
            if b != self.nil {
                b.set_parent(node);
            }

            // attach left to parent
            let mut parent = node.parent();
            left.set_parent(parent);
            match node.pos(self.nil) {
                NodePos::Root => {
                    trace!("rotate_right replaced the root");
                    self.root = left;
                }
                NodePos::Left => parent.set_left(left),
                NodePos::Right => parent.set_right(left),
            }

            // attach node to left
            left.set_right(node);
            node.set_parent(left);
        }
    }

    /// Finds the node to delete by walking all the way down to the sentinel,
    /// stepping right on `<=` and remembering the last equal node.
    fn locate<Q>(&self, key: &Q) -> RawNode<K, V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut found = self.nil;
        let mut x = self.root;
        while x != self.nil {
            match self.cmp.compare(unsafe { x.key() }.borrow(), key) {
                Ordering::Equal => {
                    found = x;
                    x = unsafe { x.right() };
                }
                Ordering::Less => x = unsafe { x.right() },
                Ordering::Greater => x = unsafe { x.left() },
            }
        }

        found
    }

    /// Removes `key` and returns the entry that held it.
    ///
    /// Returns [`TreeError::KeyNotFound`] without touching the tree if there
    /// is no such key.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<(K, V), TreeError>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.locate(key);
        if node == self.nil {
            debug!("delete of a missing key, tree left unchanged");
            return Err(TreeError::KeyNotFound);
        }

        Ok(unsafe { self.delete_core(node) })
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        let min = unsafe { self.root.min(self.nil) };
        Some(unsafe { self.delete_core(min) })
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }
        let max = unsafe { self.root.max(self.nil) };
        Some(unsafe { self.delete_core(max) })
    }

    /// # SAFETY
    ///
    /// * `node` must be a real node of this tree
    unsafe fn delete_core(&mut self, mut node: RawNode<K, V>) -> (K, V) {
        //       ┌────────── 34 ─────────┐
        //       │                       │
        // ┌──── 2 ────┐                 58 ────┐
        // │           │                        │
        // 1      ┌─── 9 ────┐              ┌── 77 ──┐
        //        │          │              │        │
        //     ┌─ 6       ┌─ 20 ─┐      ┌─ 71 ─┐     82
        //     │          │      │      │      │
        //     5         12 ─┐   24    67      75
        //                   │
        //                   13

        unsafe {
            // color that actually disappears from its position in the tree
            let mut removed_color = node.color();
            // node that moves into the position we took a node from, may be `self.nil`
            let mut replacement: RawNode<K, V>;

            if node.left() == self.nil {
                // No left child, replace `node` with its right subtree (possibly nil).
                // For example remove 1, 5, 12, 58 from tree above
                replacement = node.right();
                self.transplant(node, replacement);
            } else if node.right() == self.nil {
                // For example remove 6 from tree above
                replacement = node.left();
                self.transplant(node, replacement);
            } else {
                // We want to replace `node` with its successor, the minimum
                // of its right subtree. The successor has no left child.
                let mut min = node.right().min(self.nil);
                removed_color = min.color();
                replacement = min.right();

                if min.parent() == node {
                    //  a) `min` is the right child of `node`, it keeps its right subtree.
                    //     For example remove 20, 71, 77 from tree above
                    //     `replacement` may be the sentinel, which must know where it sits
                    //     for the fixup.
                    replacement.set_parent(min);
                } else {
                    //  b) `min` is deeper, first replace it by its own right child
                    //     and give it `node`'s right subtree.
                    //     For example remove 9 from tree above, min will be 12
                    self.transplant(min, replacement);
                    min.set_right(node.right());
                    min.right().set_parent(min);
                }

                self.transplant(node, min);
                min.set_left(node.left());
                min.left().set_parent(min);
                min.set_color(node.color());
            }

            if removed_color.is_black() {
                self.delete_fixup(replacement);
            }
            self.nil.set_parent(self.nil);
            self.nil.set_color(Color::Black);

            self.len -= 1;
            let entry = node.take_key_value();
            self.deallocate_node(node);
            entry
        }
    }

    fn delete_fixup(&mut self, mut x: RawNode<K, V>) {
        // x sits where a black node was removed and x itself can be red or black.
        //
        // If x is red we simply color it black and the lost black node is back.
        // If x is the root its extra black can be dropped.
        // Otherwise x is "doubly black" and we enter the loop, x may be the sentinel.
        unsafe {
            while x != self.root && x.color().is_black() {
                let mut x_parent = x.parent();
                debug_assert!(x_parent != self.nil);

                if x == x_parent.left() {
                    // The sibling cannot be the sentinel, otherwise the black height
                    // through it could not match the one through x.
                    let mut x_sibling = x_parent.right();
                    debug_assert!(x_sibling != self.nil, "sibling should not be the sentinel");

                    if x_sibling.color().is_red() {
                        // case 1
                        //
                        //     ┌─── p:b ───┐                ┌─── p:r ───┐                    ┌─── s:b ───┐
                        //     │           │                │           │                    │           │
                        // ┌─ x:b ─┐   ┌─ s:r ─┐   ──►  ┌─ x:b ─┐   ┌─ s:b ─┐   ──►      ┌─ p:r ─┐      d:b
                        // │       │   │       │        │       │   │       │            │       │
                        // a       b  c:b     d:b       a       b  c:b     d:b       ┌─ x:b ─┐  c:b
                        //                                                           │       │
                        //                                                           a       b
                        // Turns into case 2, 3 or 4 with a red parent.
                        debug_assert!(x_parent.color().is_black());
                        x_sibling.set_color(Color::Black);
                        x_parent.set_color(Color::Red);
                        self.rotate_left(x_parent);
                        x_sibling = x_parent.right();
                    }

                    debug_assert!(x_sibling.color().is_black());

                    if x_sibling.left().color().is_black() && x_sibling.right().color().is_black() {
                        // case 2
                        //
                        //     ┌─── p:c ───┐                ┌─── p:c ───┐
                        //     │           │                │           │
                        // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ s:r ─┐
                        // │       │   │       │        │       │   │       │
                        // a       b  c:b     d:b       a       b  c:b     d:b
                        //
                        // Take the extra black off x and s and move it up to p.
                        // If p is red (always the case after case 1) the loop ends.
                        x_sibling.set_color(Color::Red);
                        x = x_parent;
                    } else {
                        if x_sibling.right().color().is_black() {
                            // case 3
                            //
                            //    ┌───── p:c ─────┐                ┌─── p:c ───┐
                            //    │               │                │           │
                            // ┌─ x:b ─┐      ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ c:b ─┐
                            // │       │      │       │        │       │   │       │
                            // a       b  ┌─ c:r ─┐  d:b       a       b   e   ┌─ s:r ─┐
                            //            │       │                            │       │
                            //            e       f                            f      d:b
                            //
                            // Turns into case 4.
                            x_sibling.left().set_color(Color::Black);
                            x_sibling.set_color(Color::Red);
                            self.rotate_right(x_sibling);
                            x_sibling = x_parent.right();
                        }

                        // case 4
                        //
                        //     ┌─── p:c ───┐                ┌─── p:b ───┐                     ┌── s:c ──┐
                        //     │           │                │           │                     │         │
                        // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ s:c ─┐   ──►       ┌─ p:b ─┐    d:b
                        // │       │   │       │        │       │   │       │             │       │
                        // a       b  c:b     d:r       a       b  c:b     d:b       ┌─ x:b ─┐   c:b
                        //                                                           │       │
                        //                                                           a       b
                        //
                        // Paths through x gain the missing black node, paths through d
                        // keep theirs by recoloring d. This ends the loop.
                        x_sibling.set_color(x_parent.color());
                        x_parent.set_color(Color::Black);
                        x_sibling.right().set_color(Color::Black);
                        self.rotate_left(x_parent);
                        x = self.root;
                    }
                } else {
                    // same as above but left/right are switched
                    let mut x_sibling = x_parent.left();
                    debug_assert!(x_sibling != self.nil, "sibling should not be the sentinel");

                    if x_sibling.color().is_red() {
                        x_sibling.set_color(Color::Black);
                        x_parent.set_color(Color::Red);
                        self.rotate_right(x_parent);
                        x_sibling = x_parent.left();
                    }

                    if x_sibling.left().color().is_black() && x_sibling.right().color().is_black() {
                        x_sibling.set_color(Color::Red);
                        x = x_parent;
                    } else {
                        if x_sibling.left().color().is_black() {
                            x_sibling.right().set_color(Color::Black);
                            x_sibling.set_color(Color::Red);
                            self.rotate_left(x_sibling);
                            x_sibling = x_parent.left();
                        }

                        x_sibling.set_color(x_parent.color());
                        x_parent.set_color(Color::Black);
                        x_sibling.left().set_color(Color::Black);
                        self.rotate_right(x_parent);
                        x = self.root;
                    }
                }
            }

            x.set_color(Color::Black);
        }
    }

    /// Replaces subtree `old` with subtree `new`.
    ///
    /// `new` takes over the parent of `old` even if `new` is the sentinel,
    /// `old`'s own children are not touched.
    unsafe fn transplant(&mut self, old: RawNode<K, V>, mut new: RawNode<K, V>) {
        unsafe {
            let mut parent = old.parent();
            match old.pos(self.nil) {
                NodePos::Root => self.root = new,
                NodePos::Left => parent.set_left(new),
                NodePos::Right => parent.set_right(new),
            }
            new.set_parent(parent);
        }
    }
}

unsafe fn inorder_for_each_core<K, V, F>(node: RawNode<K, V>, nil: RawNode<K, V>, f: &mut F)
where
    F: FnMut(RawNode<K, V>),
{
    if node == nil {
        return;
    }

    unsafe {
        inorder_for_each_core(node.left(), nil, f);
        f(node);
        inorder_for_each_core(node.right(), nil, f);
    }
}

/// Pre-order rendering of a tree, one node per line:
///
/// ```text
/// R----20(BLACK)
///      L----10(RED)
///      R----30(RED)
/// ```
///
/// Meant for debugging, the format may change.
pub struct Pretty<'a, K, V> {
    root: RawNode<K, V>,
    nil: RawNode<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<K, V> fmt::Display for Pretty<'_, K, V>
where
    K: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn inner<K: fmt::Display, V>(
            f: &mut fmt::Formatter<'_>,
            node: RawNode<K, V>,
            nil: RawNode<K, V>,
            indent: &mut String,
            last: bool,
        ) -> fmt::Result {
            if node == nil {
                return Ok(());
            }

            let key = unsafe { node.key() };
            let color = unsafe { node.color() };
            let branch = if last { "R----" } else { "L----" };
            writeln!(f, "{indent}{branch}{key}({})", color.name())?;

            let indent_len = indent.len();
            indent.push_str(if last { "     " } else { "|    " });
            unsafe {
                inner(f, node.left(), nil, indent, false)?;
                inner(f, node.right(), nil, indent, true)?;
            }
            indent.truncate(indent_len);

            Ok(())
        }

        inner(f, self.root, self.nil, &mut String::new(), true)
    }
}

#[cfg(test)]
impl<K, V, C, A> RedBlackTree<K, V, C, A>
where
    A: Allocator,
{
    /// Plain binary search tree insert, no colors and no rebalancing.
    fn insert_bst(&mut self, key: K, value: V)
    where
        C: Comparator<K>,
    {
        if let Slot::Vacant { mut parent, side } = self.slot(&key) {
            let Ok(mut node) = self.create_node(key, value) else {
                panic!("allocation failed")
            };
            unsafe {
                node.set_color(Color::Black);
                node.set_parent(parent);
                if parent == self.nil {
                    self.root = node;
                } else if side == Ordering::Less {
                    parent.set_left(node);
                } else {
                    parent.set_right(node);
                }
            }
            self.len += 1;
        }
    }

    /// Calls `f` with the depth of every node, the root has depth 0.
    pub(crate) fn for_each_depth<F>(&self, mut f: F)
    where
        F: FnMut(usize),
    {
        fn inner<K, V, F: FnMut(usize)>(
            node: RawNode<K, V>,
            nil: RawNode<K, V>,
            depth: usize,
            f: &mut F,
        ) {
            if node == nil {
                return;
            }
            f(depth);
            unsafe {
                inner(node.left(), nil, depth + 1, f);
                inner(node.right(), nil, depth + 1, f);
            }
        }

        inner(self.root, self.nil, 0, &mut f)
    }
}

use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

impl Color {
    /// Returns `true` if the color is [`Red`].
    ///
    /// [`Red`]: Color::Red
    #[must_use]
    pub(crate) fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    /// Returns `true` if the color is [`Black`].
    ///
    /// [`Black`]: Color::Black
    #[must_use]
    pub(crate) fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Black => "BLACK",
        }
    }
}

pub(crate) struct Node<K, V> {
    // key and value are uninit only for the sentinel node, otherwise they must
    // always be valid values
    pub(crate) key: MaybeUninit<K>,
    pub(crate) value: MaybeUninit<V>,
    pub(crate) color: Color,
    pub(crate) parent: RawNode<K, V>,
    pub(crate) left: RawNode<K, V>,
    pub(crate) right: RawNode<K, V>,
}

impl<K, V> Node<K, V> {
    /// A fresh leaf: both children and, until it is linked in, the parent
    /// point at the sentinel `nil`.
    pub(crate) fn leaf(key: K, value: V, color: Color, nil: RawNode<K, V>) -> Self {
        Self {
            key: MaybeUninit::new(key),
            value: MaybeUninit::new(value),
            color,
            parent: nil,
            left: nil,
            right: nil,
        }
    }

    /// The sentinel links to itself, so walking off it in any direction
    /// lands on it again.
    pub(crate) fn sentinel(this: RawNode<K, V>) -> Self {
        Self {
            key: MaybeUninit::uninit(),
            value: MaybeUninit::uninit(),
            color: Color::Black,
            parent: this,
            left: this,
            right: this,
        }
    }
}

/// Wrapper around `NonNull<Node<K, V>>` to provide convenient methods in order
/// to make the algorithms of RedBlackTree much more readable.
///
/// Equality is pointer identity.
#[repr(transparent)]
pub(crate) struct RawNode<K, V> {
    ptr: NonNull<Node<K, V>>,
}

impl<K, V> Clone for RawNode<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for RawNode<K, V> {}

impl<K, V> PartialEq for RawNode<K, V> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.as_ptr(), other.as_ptr())
    }
}

impl<K, V> Eq for RawNode<K, V> {}

impl<K, V> fmt::Debug for RawNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawNode").field(&self.ptr).finish()
    }
}

impl<K, V> RawNode<K, V> {
    #[inline]
    pub(crate) fn from_ptr(ptr: NonNull<Node<K, V>>) -> Self {
        Self { ptr }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut Node<K, V> {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn as_non_null(&self) -> NonNull<Node<K, V>> {
        self.ptr
    }

    #[inline]
    pub(crate) unsafe fn key<'a>(&self) -> &'a K {
        unsafe { (*self.as_ptr()).key.assume_init_ref() }
    }

    #[inline]
    pub(crate) unsafe fn as_refs<'a>(&self) -> (&'a K, &'a V) {
        let ptr = self.as_ptr();
        unsafe { ((*ptr).key.assume_init_ref(), (*ptr).value.assume_init_ref()) }
    }

    #[inline]
    pub(crate) unsafe fn as_muts<'a>(&mut self) -> (&'a K, &'a mut V) {
        let ptr = self.as_ptr();
        unsafe { ((*ptr).key.assume_init_ref(), (*ptr).value.assume_init_mut()) }
    }

    /// Moves key and value out of the node. The node must not be read as a
    /// real node afterwards.
    #[inline]
    pub(crate) unsafe fn take_key_value(&mut self) -> (K, V) {
        let ptr = self.as_ptr();
        unsafe { ((*ptr).key.assume_init_read(), (*ptr).value.assume_init_read()) }
    }

    /// Drops key and value in place.
    #[inline]
    pub(crate) unsafe fn drop_key_value(&mut self) {
        let ptr = self.as_ptr();
        unsafe {
            (*ptr).key.assume_init_drop();
            (*ptr).value.assume_init_drop();
        }
    }

    #[inline]
    pub(crate) unsafe fn parent(&self) -> RawNode<K, V> {
        unsafe { (*self.as_ptr()).parent }
    }

    #[inline]
    pub(crate) unsafe fn set_parent(&mut self, new_parent: RawNode<K, V>) {
        unsafe {
            (*self.as_ptr()).parent = new_parent;
        }
    }

    #[inline]
    pub(crate) unsafe fn right(&self) -> RawNode<K, V> {
        unsafe { (*self.as_ptr()).right }
    }

    #[inline]
    pub(crate) unsafe fn set_right(&mut self, new_right: RawNode<K, V>) {
        unsafe {
            (*self.as_ptr()).right = new_right;
        }
    }

    #[inline]
    pub(crate) unsafe fn left(&self) -> RawNode<K, V> {
        unsafe { (*self.as_ptr()).left }
    }

    #[inline]
    pub(crate) unsafe fn set_left(&mut self, new_left: RawNode<K, V>) {
        unsafe {
            (*self.as_ptr()).left = new_left;
        }
    }

    #[inline]
    pub(crate) unsafe fn color(&self) -> Color {
        unsafe { (*self.as_ptr()).color }
    }

    #[inline]
    pub(crate) unsafe fn set_color(&mut self, new_color: Color) {
        unsafe { (*self.as_ptr()).color = new_color }
    }

    /// Position of a real node relative to its parent.
    #[inline]
    pub(crate) unsafe fn pos(&self, nil: RawNode<K, V>) -> NodePos {
        let parent = unsafe { self.parent() };
        if parent == nil {
            NodePos::Root
        } else if unsafe { parent.left() } == *self {
            NodePos::Left
        } else {
            debug_assert!(unsafe { parent.right() } == *self);
            NodePos::Right
        }
    }

    /// Leftmost node of the subtree rooted at `self`, `nil` if `self` is `nil`.
    pub(crate) unsafe fn min(self, nil: RawNode<K, V>) -> RawNode<K, V> {
        let mut x = self;
        while unsafe { x.left() } != nil {
            x = unsafe { x.left() };
        }

        x
    }

    /// Rightmost node of the subtree rooted at `self`, `nil` if `self` is `nil`.
    pub(crate) unsafe fn max(self, nil: RawNode<K, V>) -> RawNode<K, V> {
        let mut x = self;
        while unsafe { x.right() } != nil {
            x = unsafe { x.right() };
        }

        x
    }

    /// In-order successor, `nil` if `self` is the largest node.
    pub(crate) unsafe fn next(self, nil: RawNode<K, V>) -> RawNode<K, V> {
        //       +---------- 34 ---------+
        //       |                       |
        // +---- 2 ----+                 58 ----+
        // |           |                        |
        // 1      +--- 9 ----+              +-- 77 --+
        //        |          |              |        |
        //     +- 6       +- 20 -+      +- 71 -+     82
        //     |          |      |      |      |
        //     5         12 -+   24    67      75
        //                   |
        //                   13

        let right = unsafe { self.right() };
        if right != nil {
            // 9 -> 12, 2 -> 5, 58 -> 67 ...
            // Everything in the right subtree is larger than `self` but smaller
            // than any larger ancestor, so the successor is its minimum.
            return unsafe { right.min(nil) };
        }

        // 6 -> 9, 1 -> 2, 13 -> 20, 24 -> 34 ...
        // Move up the parents and find the first node which is the left child
        // of its parent. The parent of that node is the successor.
        let mut node = self;
        let mut parent = unsafe { node.parent() };
        while parent != nil && node == unsafe { parent.right() } {
            node = parent;
            parent = unsafe { node.parent() };
        }

        parent
    }

    /// In-order predecessor, `nil` if `self` is the smallest node.
    pub(crate) unsafe fn prev(self, nil: RawNode<K, V>) -> RawNode<K, V> {
        let left = unsafe { self.left() };
        if left != nil {
            // 2 -> 1, 9 -> 6, 20 -> 13, 77 -> 75
            return unsafe { left.max(nil) };
        }

        // 12 -> 9, 58 -> 34, 67 -> 58
        // Move up the parents and find the first node which is the right child
        // of its parent. The parent of that node is the predecessor.
        let mut node = self;
        let mut parent = unsafe { node.parent() };
        while parent != nil && node == unsafe { parent.left() } {
            node = parent;
            parent = unsafe { node.parent() };
        }

        parent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePos {
    Root,
    Left,
    Right,
}

/// Debug view of a single real node. Links that point at the sentinel are
/// shown as `None`.
pub(crate) struct DebugNode<'a, K, V> {
    pub(crate) node: RawNode<K, V>,
    pub(crate) nil: RawNode<K, V>,
    pub(crate) marker: PhantomData<&'a Node<K, V>>,
}

impl<K, V> fmt::Debug for DebugNode<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, value) = unsafe { self.node.as_refs() };
        let mut f = f.debug_struct("Node");
        f.field("key", key)
            .field("value", value)
            .field("color", &unsafe { self.node.color() });

        let nil = self.nil;
        let mut dbg_link = |name: &str, node: RawNode<K, V>| {
            if node == nil {
                f.field(name, &None::<K>);
            } else {
                let (key, value) = unsafe { node.as_refs() };
                f.field(name, &(key, value, unsafe { node.color() }));
            }
        };
        unsafe {
            dbg_link("parent", self.node.parent());
            dbg_link("left", self.node.left());
            dbg_link("right", self.node.right());
        }

        f.finish()
    }
}

//! Bidirectional B-tree iteration with a bounded-stack path.
//!
//! An iterator carries at most [`MAX_HEIGHT`](super::MAX_HEIGHT)
//! `{node, index}` frames on its own stack — no allocation — and borrows
//! the tree, so the borrow checker enforces what the original contract
//! stated in prose: an iterator does not survive mutation.

use core::cmp::Ordering;
use core::marker::PhantomData;
use core::ptr;

use super::{node_child, node_item, node_num_items, BTree, NodeDesc, NodePtr, MAX_HEIGHT};

/// How [`BTree::iter_start_at`] positions the iterator relative to the
/// probe key.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IterStartMode {
    /// Exactly the key, or nowhere.
    FindKey,
    /// The smallest item ≥ the key.
    LowerBoundInclusive,
    /// The smallest item > the key.
    LowerBoundExclusive,
    /// The largest item ≤ the key.
    UpperBoundInclusive,
    /// The largest item < the key.
    UpperBoundExclusive,
}

/// Cursor over a [`BTree`]; see [`BTree::iter_start_leftmost`].
pub struct BTreeIter<'a, T> {
    root: NodePtr,
    height: usize,
    desc: NodeDesc,
    depth: usize,
    path: [(NodePtr, usize); MAX_HEIGHT],
    _tree: PhantomData<&'a BTree<T>>,
}

impl<'a, T> BTreeIter<'a, T> {
    fn empty(tree: &'a BTree<T>) -> Self {
        let (root, height, desc) = tree.raw_parts();
        Self {
            root,
            height: height as usize,
            desc: *desc,
            depth: 0,
            path: [(ptr::null_mut(), 0); MAX_HEIGHT],
            _tree: PhantomData,
        }
    }

    /// The item the cursor is positioned at.
    pub fn item(&self) -> Option<&'a T> {
        if self.depth == 0 {
            return None;
        }
        let (node, idx) = self.path[self.depth - 1];
        unsafe { Some(&*node_item(node, idx, &self.desc)) }
    }

    /// Advance to the next item in ascending order and return it.
    pub fn next(&mut self) -> Option<&'a T> {
        if self.depth == 0 {
            return None;
        }
        unsafe {
            let mut pos = &mut self.path[self.depth - 1];
            pos.1 += 1;
            // descend into the leftmost chain of the right subtree
            while self.depth < self.height {
                let child = node_child(pos.0, pos.1, &self.desc);
                pos = &mut self.path[self.depth];
                self.depth += 1;
                *pos = (child, 0);
            }
            // unwind through exhausted frames
            while self.path[self.depth - 1].1 >= node_num_items(self.path[self.depth - 1].0) {
                self.depth -= 1;
                if self.depth == 0 {
                    return None;
                }
            }
            let (node, idx) = self.path[self.depth - 1];
            Some(&*node_item(node, idx, &self.desc))
        }
    }

    /// Step to the previous item in ascending order and return it.
    pub fn prev(&mut self) -> Option<&'a T> {
        if self.depth == 0 {
            return None;
        }
        unsafe {
            let mut pos = &mut self.path[self.depth - 1];
            // descend into the rightmost chain of the left subtree
            while self.depth < self.height {
                let child = node_child(pos.0, pos.1, &self.desc);
                let idx = node_num_items(child);
                pos = &mut self.path[self.depth];
                self.depth += 1;
                *pos = (child, idx);
            }
            while self.path[self.depth - 1].1 == 0 {
                self.depth -= 1;
                if self.depth == 0 {
                    return None;
                }
            }
            let frame = &mut self.path[self.depth - 1];
            frame.1 -= 1;
            Some(&*node_item(frame.0, frame.1, &self.desc))
        }
    }
}

impl<T> BTree<T> {
    fn iter_start(&self, rightmost: bool) -> BTreeIter<'_, T> {
        let mut iter = BTreeIter::empty(self);
        if iter.height == 0 {
            return iter;
        }
        unsafe {
            let mut node = iter.root;
            let idx = if rightmost { node_num_items(node) } else { 0 };
            iter.path[0] = (node, idx);
            iter.depth = 1;
            while iter.depth < iter.height {
                node = node_child(node, iter.path[iter.depth - 1].1, &iter.desc);
                let idx = if rightmost { node_num_items(node) } else { 0 };
                iter.path[iter.depth] = (node, idx);
                iter.depth += 1;
            }
            if rightmost {
                iter.path[iter.depth - 1].1 -= 1;
            }
        }
        iter
    }

    /// Cursor positioned at the smallest item (nowhere if empty).
    pub fn iter_start_leftmost(&self) -> BTreeIter<'_, T> {
        self.iter_start(false)
    }

    /// Cursor positioned at the largest item (nowhere if empty).
    pub fn iter_start_rightmost(&self) -> BTreeIter<'_, T> {
        self.iter_start(true)
    }

    /// Cursor positioned relative to `key` according to `mode`.
    pub fn iter_start_at(&self, key: &T, mode: IterStartMode) -> BTreeIter<'_, T> {
        let cmp = self.cmp;
        self.iter_start_at_with(mode, |item| cmp(key, item))
    }

    /// Like [`iter_start_at`](BTree::iter_start_at) with an arbitrary
    /// probe ordering.
    pub fn iter_start_at_with<F: Fn(&T) -> Ordering>(
        &self,
        mode: IterStartMode,
        probe: F,
    ) -> BTreeIter<'_, T> {
        let mut iter = BTreeIter::empty(self);
        if iter.height == 0 {
            return iter;
        }
        unsafe {
            let mut node = iter.root;
            loop {
                let (found, idx) = self.search_node(node, &probe);
                iter.path[iter.depth] = (node, idx);
                iter.depth += 1;
                if found {
                    match mode {
                        IterStartMode::LowerBoundExclusive => {
                            iter.next();
                        }
                        IterStartMode::UpperBoundExclusive => {
                            iter.prev();
                        }
                        _ => {}
                    }
                    return iter;
                }
                if iter.depth == iter.height {
                    // missed: the frame points at the first greater slot
                    match mode {
                        IterStartMode::FindKey => iter.depth = 0,
                        IterStartMode::LowerBoundInclusive | IterStartMode::LowerBoundExclusive => {
                            let (n, idx) = iter.path[iter.depth - 1];
                            if idx == node_num_items(n) {
                                iter.next();
                            }
                        }
                        IterStartMode::UpperBoundInclusive | IterStartMode::UpperBoundExclusive => {
                            iter.prev();
                        }
                    }
                    return iter;
                }
                node = node_child(node, idx, &iter.desc);
            }
        }
    }
}

//! Ordered map/set over a B-tree with configurable node fan-out.
//!
//! Nodes are single raw allocations: a 2-byte item count, padding to the
//! item alignment, `max_items` item slots, and (for internal nodes only)
//! `max_items + 1` child pointers. Leaves carry no child array, which is
//! where a B-tree's memory advantage over binary trees comes from.
//!
//! Invariants: every non-root node holds between `min_items`
//! (= `max_items / 2`) and `max_items` items, all leaves are at the same
//! depth, items within a node are ascending, and an internal node's
//! subtrees hold strictly smaller/greater keys than the adjacent item.
//!
//! Insertion rebalances differently depending on the parity of
//! `max_items`: even fan-outs split from the leaf upward (the median
//! bubbles toward the root), odd fan-outs pre-split full nodes on the way
//! down from the deepest non-full ancestor, which keeps the tree balanced
//! with fewer split passes.
//!
//! Node search switches from binary search to a two-ended linear sweep
//! below a per-tree threshold; the threshold is a tuning hint, not a
//! correctness parameter (32 works well for small integer keys, 8 for
//! pointer-sized keys, 0 disables the sweep).

mod iter;

pub use iter::{BTreeIter, IterStartMode};

use core::cmp::Ordering;
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};

use crate::fortify_check;
use crate::utils::round_up;

/// Linear-search threshold suited to small integer keys.
pub const LINEAR_SEARCH_INTEGERS: u16 = 32;
/// Linear-search threshold suited to pointer-sized keys.
pub const LINEAR_SEARCH_POINTERS: u16 = 8;

/// Deepest possible iterator/rebalance path. With `max_items >= 2` every
/// node holds at least one item, so 32 frames cover any tree that fits
/// in memory.
pub(crate) const MAX_HEIGHT: usize = 32;

/// Raw node handle. The pointee layout is described by [`NodeDesc`].
pub(crate) type NodePtr = *mut u8;

/// Per-tree node layout and tuning, fixed at construction.
#[derive(Clone, Copy)]
pub(crate) struct NodeDesc {
    pub(crate) max_items: u16,
    pub(crate) min_items: u16,
    pub(crate) linear_search_threshold: u16,
    /// Byte offset of the first item slot (header plus alignment padding).
    item_offset: usize,
    /// Byte offset of the child-pointer array (internal nodes only).
    children_offset: usize,
    align: usize,
}

impl NodeDesc {
    fn new<T>(max_items: u16, linear_search_threshold: u16) -> Self {
        fortify_check!(max_items >= 2);
        let header = mem::size_of::<u16>();
        let item_align = mem::align_of::<T>().max(mem::align_of::<u16>());
        let item_offset = round_up(header, mem::align_of::<T>().max(1));
        let items_end = item_offset + max_items as usize * mem::size_of::<T>();
        let children_offset = round_up(items_end, mem::align_of::<NodePtr>());
        Self {
            max_items,
            min_items: max_items / 2,
            linear_search_threshold,
            item_offset,
            children_offset,
            align: item_align.max(mem::align_of::<NodePtr>()),
        }
    }

    fn layout(&self, leaf: bool) -> Layout {
        let size = if leaf {
            self.children_offset
        } else {
            self.children_offset + (self.max_items as usize + 1) * mem::size_of::<NodePtr>()
        };
        Layout::from_size_align(size, self.align).unwrap()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw node operations
// ─────────────────────────────────────────────────────────────────────────────

#[inline(always)]
pub(crate) unsafe fn node_num_items(node: NodePtr) -> usize {
    (node as *const u16).read() as usize
}

#[inline(always)]
unsafe fn node_set_num_items(node: NodePtr, n: usize) {
    (node as *mut u16).write(n as u16);
}

#[inline(always)]
pub(crate) unsafe fn node_item<T>(node: NodePtr, idx: usize, desc: &NodeDesc) -> *mut T {
    (node.add(desc.item_offset) as *mut T).add(idx)
}

#[inline(always)]
unsafe fn node_children(node: NodePtr, desc: &NodeDesc) -> *mut NodePtr {
    node.add(desc.children_offset) as *mut NodePtr
}

#[inline(always)]
pub(crate) unsafe fn node_child(node: NodePtr, idx: usize, desc: &NodeDesc) -> NodePtr {
    node_children(node, desc).add(idx).read()
}

#[inline(always)]
unsafe fn node_set_child(node: NodePtr, idx: usize, child: NodePtr, desc: &NodeDesc) {
    node_children(node, desc).add(idx).write(child);
}

unsafe fn node_new<T>(leaf: bool, desc: &NodeDesc) -> NodePtr {
    let layout = desc.layout(leaf);
    let node = alloc(layout);
    if node.is_null() {
        handle_alloc_error(layout);
    }
    node_set_num_items(node, 0);
    node
}

unsafe fn node_free(node: NodePtr, leaf: bool, desc: &NodeDesc) {
    dealloc(node, desc.layout(leaf));
}

/// Open a hole at `idx` by shifting items `idx..num_items` right by one.
unsafe fn node_shift_items_right<T>(node: NodePtr, idx: usize, desc: &NodeDesc) {
    let n = node_num_items(node);
    ptr::copy(
        node_item::<T>(node, idx, desc),
        node_item::<T>(node, idx + 1, desc),
        n - idx,
    );
}

unsafe fn node_shift_children_right(node: NodePtr, idx: usize, desc: &NodeDesc) {
    let n = node_num_items(node);
    ptr::copy(
        node_children(node, desc).add(idx),
        node_children(node, desc).add(idx + 1),
        n + 1 - idx,
    );
}

/// Close the hole at `idx` by shifting items `idx+1..num_items` left.
unsafe fn node_shift_items_left<T>(node: NodePtr, idx: usize, desc: &NodeDesc) {
    let n = node_num_items(node);
    ptr::copy(
        node_item::<T>(node, idx + 1, desc),
        node_item::<T>(node, idx, desc),
        n - idx - 1,
    );
}

unsafe fn node_shift_children_left(node: NodePtr, idx: usize, desc: &NodeDesc) {
    let n = node_num_items(node);
    ptr::copy(
        node_children(node, desc).add(idx + 1),
        node_children(node, desc).add(idx),
        n - idx,
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// The tree
// ─────────────────────────────────────────────────────────────────────────────

fn ord_cmp<T: Ord>(a: &T, b: &T) -> Ordering {
    a.cmp(b)
}

enum DeleteMode {
    Min,
    Max,
    Key,
}

/// Ordered set of `T` with configurable fan-out.
pub struct BTree<T> {
    root: NodePtr,
    height: u8,
    desc: NodeDesc,
    cmp: fn(&T, &T) -> Ordering,
    _marker: PhantomData<T>,
}

// SAFETY: the tree owns its nodes exclusively.
unsafe impl<T: Send> Send for BTree<T> {}
unsafe impl<T: Sync> Sync for BTree<T> {}

impl<T: Ord> BTree<T> {
    /// An empty tree holding up to `max_items` (≥ 2) items per node,
    /// ordered by `T::cmp`.
    pub fn new(max_items: u16) -> Self {
        Self::with_cmp(max_items, ord_cmp::<T>)
    }
}

impl<T> BTree<T> {
    /// An empty tree ordered by a caller comparator.
    pub fn with_cmp(max_items: u16, cmp: fn(&T, &T) -> Ordering) -> Self {
        Self {
            root: ptr::null_mut(),
            height: 0,
            desc: NodeDesc::new::<T>(max_items, 0),
            cmp,
            _marker: PhantomData,
        }
    }

    /// Tune the binary-to-linear search cutover (see the module docs).
    pub fn with_linear_search_threshold(mut self, threshold: u16) -> Self {
        self.desc.linear_search_threshold = threshold;
        self
    }

    /// Maximum items per node.
    pub fn max_items(&self) -> u16 {
        self.desc.max_items
    }

    /// Minimum items per non-root node.
    pub fn min_items(&self) -> u16 {
        self.desc.min_items
    }

    /// Is the tree empty?
    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub(crate) fn raw_parts(&self) -> (NodePtr, u8, &NodeDesc) {
        (self.root, self.height, &self.desc)
    }

    /// Search one node: binary search down to `linear_search_threshold`
    /// remaining candidates, then a two-ended linear sweep.
    unsafe fn search_node<F: Fn(&T) -> Ordering>(
        &self,
        node: NodePtr,
        probe: &F,
    ) -> (bool, usize) {
        let mut start = 0usize;
        let mut end = node_num_items(node);
        let threshold = self.desc.linear_search_threshold as usize;
        while start + threshold < end {
            let mid = (start + end) / 2;
            match probe(&*node_item(node, mid, &self.desc)) {
                Ordering::Equal => return (true, mid),
                Ordering::Greater => start = mid + 1,
                Ordering::Less => end = mid,
            }
        }

        if threshold == 0 {
            return (false, start);
        }

        while start < end {
            match probe(&*node_item(node, start, &self.desc)) {
                Ordering::Equal => return (true, start),
                Ordering::Less => return (false, start),
                Ordering::Greater => {}
            }
            start += 1;
            end -= 1;
            match probe(&*node_item(node, end, &self.desc)) {
                Ordering::Equal => return (true, end),
                Ordering::Greater => return (false, end + 1),
                Ordering::Less => {}
            }
        }
        (false, start)
    }

    /// Find an item by an arbitrary probe ordering (probe(item) is the
    /// ordering of the wanted key relative to `item`).
    pub(crate) fn find_with<F: Fn(&T) -> Ordering>(&self, probe: F) -> Option<&T> {
        if self.height == 0 {
            return None;
        }
        let mut node = self.root;
        let mut depth = 1;
        unsafe {
            loop {
                let (found, idx) = self.search_node(node, &probe);
                if found {
                    return Some(&*node_item(node, idx, &self.desc));
                }
                if depth == self.height {
                    break;
                }
                depth += 1;
                node = node_child(node, idx, &self.desc);
            }
        }
        None
    }

    /// Find an item equal to `key`.
    pub fn find(&self, key: &T) -> Option<&T> {
        self.find_with(|item| (self.cmp)(key, item))
    }

    fn leftmost_rightmost(&self, leftmost: bool) -> Option<&T> {
        if self.height == 0 {
            return None;
        }
        let mut node = self.root;
        let mut depth = 0;
        unsafe {
            loop {
                depth += 1;
                if depth == self.height {
                    break;
                }
                let idx = if leftmost { 0 } else { node_num_items(node) };
                node = node_child(node, idx, &self.desc);
            }
            let idx = if leftmost { 0 } else { node_num_items(node) - 1 };
            Some(&*node_item(node, idx, &self.desc))
        }
    }

    /// The smallest item.
    pub fn get_leftmost(&self) -> Option<&T> {
        self.leftmost_rightmost(true)
    }

    /// The largest item.
    pub fn get_rightmost(&self) -> Option<&T> {
        self.leftmost_rightmost(false)
    }

    // ── insertion ───────────────────────────────────────────────────────

    /// Split a full `node` around an insertion at `idx` (even-fan-out
    /// strategy): the upper half moves to a fresh right sibling, `item`
    /// lands at its position, and `item` is replaced by the median to
    /// bubble up. Returns the new sibling.
    unsafe fn node_split_and_insert(
        &mut self,
        node: NodePtr,
        mut idx: usize,
        item: *mut T,
        right: NodePtr,
        ) -> NodePtr {
        let desc = self.desc;
        let min = desc.min_items as usize;
        let new_node = node_new::<T>(right.is_null(), &desc);
        node_set_num_items(node, min);
        if idx < min {
            ptr::copy_nonoverlapping(
                node_item::<T>(node, min, &desc),
                node_item::<T>(new_node, 0, &desc),
                min,
            );
            node_shift_items_right::<T>(node, idx, &desc);
            node_item::<T>(node, idx, &desc).write(item.read());

            // the median got shifted right by one
            item.write(node_item::<T>(node, min, &desc).read());

            if !right.is_null() {
                ptr::copy_nonoverlapping(
                    node_children(node, &desc).add(min),
                    node_children(new_node, &desc),
                    min + 1,
                );
                node_shift_children_right(node, idx + 1, &desc);
                node_set_child(node, idx + 1, right, &desc);
            }
        } else if idx == min {
            // the inserted item is the median
            ptr::copy_nonoverlapping(
                node_item::<T>(node, min, &desc),
                node_item::<T>(new_node, 0, &desc),
                min,
            );
            if !right.is_null() {
                ptr::copy_nonoverlapping(
                    node_children(node, &desc).add(min + 1),
                    node_children(new_node, &desc).add(1),
                    min,
                );
                node_set_child(new_node, 0, right, &desc);
            }
        } else {
            idx -= min + 1;
            node_set_num_items(new_node, min - 1);
            ptr::copy_nonoverlapping(
                node_item::<T>(node, min + 1, &desc),
                node_item::<T>(new_node, 0, &desc),
                min - 1,
            );
            node_shift_items_right::<T>(new_node, idx, &desc);
            node_item::<T>(new_node, idx, &desc).write(item.read());

            item.write(node_item::<T>(node, min, &desc).read());

            if !right.is_null() {
                ptr::copy_nonoverlapping(
                    node_children(node, &desc).add(min + 1),
                    node_children(new_node, &desc),
                    min,
                );
                node_shift_children_right(new_node, idx + 1, &desc);
                node_set_child(new_node, idx + 1, right, &desc);
            }
        }
        node_set_num_items(new_node, min);
        new_node
    }

    /// Even fan-out: insert at the leaf and split upward while nodes
    /// overflow, growing the tree at the root if the split reaches it.
    unsafe fn insert_and_rebalance_even(
        &mut self,
        item: *mut T,
        mut idx: usize,
        mut node: NodePtr,
        path: &[(NodePtr, usize); MAX_HEIGHT],
        mut depth: usize,
    ) {
        let desc = self.desc;
        let mut right: NodePtr = ptr::null_mut();
        loop {
            let n = node_num_items(node);
            if n < desc.max_items as usize {
                node_shift_items_right::<T>(node, idx, &desc);
                node_item::<T>(node, idx, &desc).write(item.read());
                if !right.is_null() {
                    node_shift_children_right(node, idx + 1, &desc);
                    node_set_child(node, idx + 1, right, &desc);
                }
                node_set_num_items(node, n + 1);
                return;
            }

            right = self.node_split_and_insert(node, idx, item, right);

            depth -= 1;
            if depth == 0 {
                break;
            }
            node = path[depth - 1].0;
            idx = path[depth - 1].1;
        }
        let new_root = node_new::<T>(false, &desc);
        node_item::<T>(new_root, 0, &desc).write(item.read());
        node_set_num_items(new_root, 1);
        node_set_child(new_root, 0, node, &desc);
        node_set_child(new_root, 1, right, &desc);
        self.root = new_root;
        self.height += 1;
    }

    /// Split a full node in half, writing the median to `median`.
    unsafe fn node_split(&mut self, node: NodePtr, median: *mut T, leaf: bool) -> NodePtr {
        let desc = self.desc;
        let min = desc.min_items as usize;
        let new_node = node_new::<T>(leaf, &desc);
        node_set_num_items(node, min);
        median.write(node_item::<T>(node, min, &desc).read());
        ptr::copy_nonoverlapping(
            node_item::<T>(node, min + 1, &desc),
            node_item::<T>(new_node, 0, &desc),
            min,
        );
        if !leaf {
            ptr::copy_nonoverlapping(
                node_children(node, &desc).add(min + 1),
                node_children(new_node, &desc),
                min + 1,
            );
        }
        node_set_num_items(new_node, min);
        new_node
    }

    /// Odd fan-out: when the target leaf is full, walk down from the
    /// deepest non-full ancestor splitting each full child, then insert.
    unsafe fn insert_and_rebalance_odd(
        &mut self,
        item: *mut T,
        mut idx: usize,
        mut node: NodePtr,
        path: &[(NodePtr, usize); MAX_HEIGHT],
        depth: usize,
        last_nonfull_depth: usize,
    ) {
        let desc = self.desc;
        if last_nonfull_depth != depth {
            let mut d = last_nonfull_depth;
            if d == 0 {
                let new_root = node_new::<T>(false, &desc);
                node_set_child(new_root, 0, self.root, &desc);
                self.root = new_root;
                self.height += 1;
                idx = 0;
                node = new_root;
            } else {
                node = path[d - 1].0;
                idx = path[d - 1].1;
            }

            loop {
                d += 1;
                let mut median = MaybeUninit::<T>::uninit();
                let right =
                    self.node_split(node_child(node, idx, &desc), median.as_mut_ptr(), d == depth);
                node_shift_items_right::<T>(node, idx, &desc);
                node_item::<T>(node, idx, &desc).write(median.as_ptr().read());
                node_shift_children_right(node, idx + 1, &desc);
                node_set_child(node, idx + 1, right, &desc);
                node_set_num_items(node, node_num_items(node) + 1);
                if (self.cmp)(&*item, &*node_item(node, idx, &desc)) == Ordering::Less {
                    node = node_child(node, idx, &desc);
                    idx = path[d - 1].1;
                } else {
                    node = node_child(node, idx + 1, &desc);
                    idx = path[d - 1].1 - desc.min_items as usize - 1;
                }
                if d == depth {
                    break;
                }
            }
        }

        node_shift_items_right::<T>(node, idx, &desc);
        node_item::<T>(node, idx, &desc).write(item.read());
        node_set_num_items(node, node_num_items(node) + 1);
    }

    unsafe fn insert_and_rebalance(
        &mut self,
        item: *mut T,
        idx: usize,
        node: NodePtr,
        path: &[(NodePtr, usize); MAX_HEIGHT],
        depth: usize,
        last_nonfull_depth: usize,
    ) {
        if self.desc.max_items & 1 != 0 {
            self.insert_and_rebalance_odd(item, idx, node, path, depth, last_nonfull_depth);
        } else {
            self.insert_and_rebalance_even(item, idx, node, path, depth);
        }
    }

    fn insert_impl(&mut self, item: T, update: bool) -> bool {
        unsafe {
            if self.height == 0 {
                self.root = node_new::<T>(true, &self.desc);
                self.height = 1;
            }
            let mut item = MaybeUninit::new(item);
            let probe_item = &*item.as_ptr();
            let mut node = self.root;
            let mut path = [(ptr::null_mut(), 0usize); MAX_HEIGHT];
            let mut depth = 1usize;
            let mut last_nonfull_depth = 0usize;
            let (idx, depth) = loop {
                let (found, idx) = self.search_node(node, &|other| (self.cmp)(probe_item, other));
                if found {
                    let slot = node_item::<T>(node, idx, &self.desc);
                    if update {
                        // destroy the resident item, then move the new one in
                        ptr::drop_in_place(slot);
                        slot.write(item.assume_init());
                    } else {
                        drop(item.assume_init());
                    }
                    return false;
                }
                if node_num_items(node) < self.desc.max_items as usize {
                    last_nonfull_depth = depth;
                }
                path[depth - 1] = (node, idx);
                if depth == self.height as usize {
                    break (idx, depth);
                }
                depth += 1;
                node = node_child(node, idx, &self.desc);
            };
            self.insert_and_rebalance(
                item.as_mut_ptr(),
                idx,
                node,
                &path,
                depth,
                last_nonfull_depth,
            );
            true
        }
    }

    /// Insert an item; duplicates are rejected (the new item is dropped)
    /// and `false` is returned.
    pub fn insert(&mut self, item: T) -> bool {
        self.insert_impl(item, false)
    }

    /// Insert an item, replacing (and dropping) any equal resident item.
    /// Returns whether the item was new.
    pub fn set(&mut self, item: T) -> bool {
        self.insert_impl(item, true)
    }

    /// Fast path for ascending insertion: compare against the rightmost
    /// item of the rightmost chain and append without a full search when
    /// the item is the new maximum; otherwise fall back to [`insert`].
    ///
    /// [`insert`]: BTree::insert
    pub fn insert_sequential(&mut self, item: T) -> bool {
        unsafe {
            if self.height == 0 {
                return self.insert(item);
            }
            let mut item = MaybeUninit::new(item);
            let mut node = self.root;
            let mut path = [(ptr::null_mut(), 0usize); MAX_HEIGHT];
            let mut depth = 1usize;
            let mut last_nonfull_depth = 0usize;
            let (idx, depth) = loop {
                let idx = node_num_items(node);
                let rightmost = &*node_item::<T>(node, idx - 1, &self.desc);
                if (self.cmp)(&*item.as_ptr(), rightmost) != Ordering::Greater {
                    return self.insert(item.assume_init());
                }
                if idx < self.desc.max_items as usize {
                    last_nonfull_depth = depth;
                }
                path[depth - 1] = (node, idx);
                if depth == self.height as usize {
                    break (idx, depth);
                }
                depth += 1;
                node = node_child(node, idx, &self.desc);
            };
            self.insert_and_rebalance(
                item.as_mut_ptr(),
                idx,
                node,
                &path,
                depth,
                last_nonfull_depth,
            );
            true
        }
    }

    // ── deletion ────────────────────────────────────────────────────────

    fn delete_impl<F: Fn(&T) -> Ordering>(&mut self, mode: DeleteMode, probe: Option<F>) -> Option<T> {
        if self.height == 0 {
            return None;
        }
        unsafe {
            let desc = self.desc;
            let mut mode = mode;
            let mut node = self.root;
            let mut depth = 1usize;
            let mut path = [(ptr::null_mut(), 0usize); MAX_HEIGHT];
            let mut out = MaybeUninit::<T>::uninit();
            // where the removed leaf item will be written: either the
            // returned value, or the internal slot whose item we are
            // replacing with its predecessor
            let mut ret_ptr: *mut T = out.as_mut_ptr();
            let mut idx;
            let mut leaf;
            loop {
                leaf = depth == self.height as usize;
                let mut found = false;
                match mode {
                    DeleteMode::Key => {
                        let probe = probe.as_ref().unwrap();
                        let (f, i) = self.search_node(node, probe);
                        idx = i;
                        if f {
                            found = true;
                        } else if leaf {
                            return None;
                        }
                    }
                    DeleteMode::Min => idx = 0,
                    DeleteMode::Max => {
                        idx = if leaf {
                            node_num_items(node) - 1
                        } else {
                            node_num_items(node)
                        };
                    }
                }
                if leaf {
                    break;
                }
                if found {
                    // found in an internal node: extract the item now,
                    // then overwrite the slot with the predecessor (the
                    // maximum of the left subtree)
                    out.as_mut_ptr().write(node_item::<T>(node, idx, &desc).read());
                    ret_ptr = node_item::<T>(node, idx, &desc);
                    mode = DeleteMode::Max;
                }
                path[depth - 1] = (node, idx);
                depth += 1;
                node = node_child(node, idx, &desc);
            }

            // at the leaf: pull the item out and close the hole
            ret_ptr.write(node_item::<T>(node, idx, &desc).read());
            node_shift_items_left::<T>(node, idx, &desc);
            node_set_num_items(node, node_num_items(node) - 1);

            while depth > 1 {
                depth -= 1;
                if node_num_items(node) >= desc.min_items as usize {
                    return Some(out.assume_init());
                }

                node = path[depth - 1].0;
                let mut idx = path[depth - 1].1;

                // prefer merging with the left sibling when both fit
                if idx == node_num_items(node)
                    || (idx != 0
                        && node_num_items(node_child(node, idx - 1, &desc))
                            + node_num_items(node_child(node, idx, &desc))
                            < desc.max_items as usize)
                {
                    idx -= 1;
                }
                let left = node_child(node, idx, &desc);
                let right = node_child(node, idx + 1, &desc);
                let ln = node_num_items(left);
                let rn = node_num_items(right);

                if ln + rn < desc.max_items as usize {
                    // merge: parent separator and all of `right` move into `left`
                    node_item::<T>(left, ln, &desc).write(node_item::<T>(node, idx, &desc).read());
                    node_shift_items_left::<T>(node, idx, &desc);
                    node_shift_children_left(node, idx + 1, &desc);
                    node_set_num_items(node, node_num_items(node) - 1);
                    let ln = ln + 1;
                    ptr::copy_nonoverlapping(
                        node_item::<T>(right, 0, &desc),
                        node_item::<T>(left, ln, &desc),
                        rn,
                    );
                    if !leaf {
                        ptr::copy_nonoverlapping(
                            node_children(right, &desc),
                            node_children(left, &desc).add(ln),
                            rn + 1,
                        );
                    }
                    node_set_num_items(left, ln + rn);
                    node_free(right, leaf, &desc);
                } else if ln > rn {
                    // rotate one item right through the parent
                    node_shift_items_right::<T>(right, 0, &desc);
                    node_item::<T>(right, 0, &desc).write(node_item::<T>(node, idx, &desc).read());
                    node_item::<T>(node, idx, &desc)
                        .write(node_item::<T>(left, ln - 1, &desc).read());
                    if !leaf {
                        node_shift_children_right(right, 0, &desc);
                        node_set_child(right, 0, node_child(left, ln, &desc), &desc);
                    }
                    node_set_num_items(left, ln - 1);
                    node_set_num_items(right, rn + 1);
                } else {
                    // rotate one item left through the parent
                    node_item::<T>(left, ln, &desc).write(node_item::<T>(node, idx, &desc).read());
                    node_item::<T>(node, idx, &desc).write(node_item::<T>(right, 0, &desc).read());
                    node_shift_items_left::<T>(right, 0, &desc);
                    if !leaf {
                        node_set_child(left, ln + 1, node_child(right, 0, &desc), &desc);
                        node_shift_children_left(right, 0, &desc);
                    }
                    node_set_num_items(right, rn - 1);
                    node_set_num_items(left, ln + 1);
                }

                leaf = false;
            }

            // the root may drop one level once it is down to one child
            if node_num_items(node) == 0 {
                let was_leaf = self.height == 1;
                self.root = ptr::null_mut();
                if self.height > 1 {
                    self.root = node_child(node, 0, &desc);
                }
                self.height -= 1;
                node_free(node, was_leaf, &desc);
            }

            Some(out.assume_init())
        }
    }

    /// Remove and return the item equal to `key`.
    pub fn delete(&mut self, key: &T) -> Option<T> {
        let cmp = self.cmp;
        self.delete_impl(DeleteMode::Key, Some(move |item: &T| cmp(key, item)))
    }

    pub(crate) fn delete_with<F: Fn(&T) -> Ordering>(&mut self, probe: F) -> Option<T> {
        self.delete_impl(DeleteMode::Key, Some(probe))
    }

    /// Remove and return the smallest item.
    pub fn delete_min(&mut self) -> Option<T> {
        self.delete_impl::<fn(&T) -> Ordering>(DeleteMode::Min, None)
    }

    /// Remove and return the largest item.
    pub fn delete_max(&mut self) -> Option<T> {
        self.delete_impl::<fn(&T) -> Ordering>(DeleteMode::Max, None)
    }

    // ── teardown ────────────────────────────────────────────────────────

    /// Drop every item and free every node, iteratively with a bounded
    /// path.
    pub fn clear(&mut self) {
        if self.height == 0 {
            return;
        }
        unsafe {
            let desc = self.desc;
            let height = self.height as usize;
            let mut path = [(ptr::null_mut() as NodePtr, 0usize); MAX_HEIGHT];
            let mut node = self.root;
            path[0] = (node, 0);
            let mut depth = 1usize;
            while depth < height {
                node = node_child(node, 0, &desc);
                path[depth] = (node, 0);
                depth += 1;
            }

            loop {
                // free the current (leaf) node, then unwind through
                // exhausted ancestors
                loop {
                    let (n, _) = path[depth - 1];
                    if mem::needs_drop::<T>() {
                        for i in 0..node_num_items(n) {
                            ptr::drop_in_place(node_item::<T>(n, i, &desc));
                        }
                    }
                    node_free(n, depth == height, &desc);
                    depth -= 1;
                    if depth == 0 {
                        self.root = ptr::null_mut();
                        self.height = 0;
                        return;
                    }
                    let (pn, pidx) = path[depth - 1];
                    if pidx < node_num_items(pn) {
                        break;
                    }
                }
                // descend into the leftmost chain of the next child
                path[depth - 1].1 += 1;
                loop {
                    let (pn, pidx) = path[depth - 1];
                    let child = node_child(pn, pidx, &desc);
                    path[depth] = (child, 0);
                    depth += 1;
                    if depth >= height {
                        break;
                    }
                }
            }
        }
    }

    // ── debug introspection (used by the invariant tests) ───────────────

    /// Visit every node: `visit(depth, is_leaf, items)`. Depth 1 is the
    /// root.
    #[doc(hidden)]
    pub fn debug_visit_nodes(&self, visit: &mut dyn FnMut(u32, bool, &[T])) {
        unsafe fn walk<T>(
            node: NodePtr,
            depth: u32,
            height: u32,
            desc: &NodeDesc,
            visit: &mut dyn FnMut(u32, bool, &[T]),
        ) {
            let n = node_num_items(node);
            let leaf = depth == height;
            let items = core::slice::from_raw_parts(node_item::<T>(node, 0, desc), n);
            visit(depth, leaf, items);
            if !leaf {
                for i in 0..=n {
                    walk::<T>(node_child(node, i, desc), depth + 1, height, desc, visit);
                }
            }
        }
        if self.height != 0 {
            unsafe {
                walk::<T>(
                    self.root,
                    1,
                    self.height as u32,
                    &self.desc,
                    visit,
                );
            }
        }
    }
}

impl<T> Drop for BTree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Map wrapper
// ─────────────────────────────────────────────────────────────────────────────

/// A key-value record stored inline in a [`BTreeMap`] node.
pub struct MapItem<K, V> {
    pub key: K,
    pub value: V,
}

fn map_cmp<K: Ord, V>(a: &MapItem<K, V>, b: &MapItem<K, V>) -> Ordering {
    a.key.cmp(&b.key)
}

/// Ordered map over a B-tree of inline `{key, value}` items.
pub struct BTreeMap<K: Ord, V> {
    inner: BTree<MapItem<K, V>>,
}

impl<K: Ord, V> BTreeMap<K, V> {
    /// An empty map holding up to `max_items` (≥ 2) items per node.
    pub fn new(max_items: u16) -> Self {
        Self {
            inner: BTree::with_cmp(max_items, map_cmp::<K, V>),
        }
    }

    /// Tune the binary-to-linear search cutover.
    pub fn with_linear_search_threshold(mut self, threshold: u16) -> Self {
        self.inner = self.inner.with_linear_search_threshold(threshold);
        self
    }

    /// Is the map empty?
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Value stored under `key`.
    pub fn find(&self, key: &K) -> Option<&V> {
        self.inner
            .find_with(|item| key.cmp(&item.key))
            .map(|item| &item.value)
    }

    /// Insert; an existing key rejects the new pair and returns `false`.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.inner.insert(MapItem { key, value })
    }

    /// Insert or replace (dropping the resident pair). Returns whether
    /// the key was new.
    pub fn set(&mut self, key: K, value: V) -> bool {
        self.inner.set(MapItem { key, value })
    }

    /// Ascending-insert fast path; see [`BTree::insert_sequential`].
    pub fn insert_sequential(&mut self, key: K, value: V) -> bool {
        self.inner.insert_sequential(MapItem { key, value })
    }

    /// Remove the pair stored under `key`.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        self.inner
            .delete_with(|item| key.cmp(&item.key))
            .map(|item| (item.key, item.value))
    }

    /// Remove the pair with the smallest key.
    pub fn delete_min(&mut self) -> Option<(K, V)> {
        self.inner.delete_min().map(|item| (item.key, item.value))
    }

    /// Remove the pair with the largest key.
    pub fn delete_max(&mut self) -> Option<(K, V)> {
        self.inner.delete_max().map(|item| (item.key, item.value))
    }

    /// The pair with the smallest key.
    pub fn get_leftmost(&self) -> Option<(&K, &V)> {
        self.inner.get_leftmost().map(|item| (&item.key, &item.value))
    }

    /// The pair with the largest key.
    pub fn get_rightmost(&self) -> Option<(&K, &V)> {
        self.inner
            .get_rightmost()
            .map(|item| (&item.key, &item.value))
    }

    /// Drop every pair.
    pub fn clear(&mut self) {
        self.inner.clear()
    }

    /// Iterator positioned at the smallest pair.
    pub fn iter_start_leftmost(&self) -> BTreeIter<'_, MapItem<K, V>> {
        self.inner.iter_start_leftmost()
    }

    /// Iterator positioned at the largest pair.
    pub fn iter_start_rightmost(&self) -> BTreeIter<'_, MapItem<K, V>> {
        self.inner.iter_start_rightmost()
    }
}

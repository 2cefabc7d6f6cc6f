//! Intrusive red-black tree.
//!
//! User structs embed an [`RbNode`]; the tree stores no keys and performs
//! no comparisons. The caller locates the insertion point (parent node and
//! child slot) and hands both to [`RbTree::insert_node`]; the tree only
//! maintains the balancing invariants:
//!
//! 1. every node is red or black,
//! 2. the root is black,
//! 3. null leaves count as black,
//! 4. a red node has only black children,
//! 5. every root-to-null path crosses the same number of black nodes.
//!
//! The parent pointer and the node color share one word (low bit: 0 = red,
//! 1 = black), so nodes must be at least 2-aligned — any ordinary
//! allocation is. The symmetric cases of the fix-ups are collapsed by
//! indexing the child array with a direction.
//!
//! # Safety
//!
//! All mutating operations take raw node pointers: the caller guarantees
//! nodes are valid for the lifetime of their tree membership, pinned in
//! memory, and each node is a member of at most one tree.

use core::ptr;

const RB_RED: usize = 0;
const RB_BLACK: usize = 1;

/// Child slot selector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(usize)]
pub enum RbDirection {
    Left = 0,
    Right = 1,
}

/// Embedded tree linkage: two child pointers and a packed parent-color
/// word.
#[repr(C)]
#[derive(Debug)]
pub struct RbNode {
    parent_color: usize,
    children: [*mut RbNode; 2],
}

impl RbNode {
    /// A detached node. The linkage is initialized by
    /// [`RbTree::insert_node`].
    pub const fn new() -> Self {
        Self {
            parent_color: 0,
            children: [ptr::null_mut(), ptr::null_mut()],
        }
    }

    /// Parent of this node, null for the root.
    #[inline]
    pub fn parent(&self) -> *mut RbNode {
        unpack_parent(self.parent_color)
    }

    /// Child in the given direction.
    #[inline]
    pub fn child(&self, dir: RbDirection) -> *mut RbNode {
        self.children[dir as usize]
    }

    #[inline]
    fn color(&self) -> usize {
        self.parent_color & 1
    }

    /// Is this node red? (Exposed so external invariant checks can walk
    /// the tree.)
    #[inline]
    pub fn is_red(&self) -> bool {
        self.color() == RB_RED
    }

    /// Is this node black?
    #[inline]
    pub fn is_black(&self) -> bool {
        self.color() == RB_BLACK
    }

    #[inline]
    fn set_parent(&mut self, parent: *const RbNode) {
        self.parent_color = self.color() | parent as usize;
    }

    #[inline]
    fn set_color(&mut self, color: usize) {
        self.parent_color = (self.parent_color & !1) | color;
    }

    /// Parent of a node known to be red (the color bit is zero, so the
    /// word is the pointer).
    #[inline]
    fn red_parent(&self) -> *mut RbNode {
        self.parent_color as *mut RbNode
    }
}

impl Default for RbNode {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn unpack_parent(parent_color: usize) -> *mut RbNode {
    (parent_color & !1) as *mut RbNode
}

#[inline]
unsafe fn is_null_or_black(node: *const RbNode) -> bool {
    // null nodes are leaves and therefore black
    node.is_null() || (*node).is_black()
}

/// An intrusive red-black tree: just a root pointer.
#[derive(Debug)]
pub struct RbTree {
    root: *mut RbNode,
}

impl RbTree {
    /// An empty tree.
    pub const fn new() -> Self {
        Self {
            root: ptr::null_mut(),
        }
    }

    /// The root node, null when the tree is empty.
    #[inline]
    pub fn root(&self) -> *mut RbNode {
        self.root
    }

    /// Replace `old_child` of `parent` (or the root when `parent` is
    /// null) with `new_child`.
    ///
    /// # Safety
    /// `parent` must be null or valid; `old_child` must currently occupy
    /// the slot being replaced.
    unsafe fn change_child(
        &mut self,
        old_child: *const RbNode,
        new_child: *mut RbNode,
        parent: *mut RbNode,
    ) {
        if !parent.is_null() {
            if old_child == (*parent).children[0] {
                (*parent).children[0] = new_child;
            } else {
                (*parent).children[1] = new_child;
            }
        } else {
            self.root = new_child;
        }
    }

    /// Leftmost (minimum-position) node, null for an empty tree.
    pub fn first(&self) -> *mut RbNode {
        let mut node = ptr::null_mut();
        let mut cur = self.root;
        while !cur.is_null() {
            node = cur;
            cur = unsafe { (*cur).children[0] };
        }
        node
    }

    /// Link `node` as the `dir` child of `parent` (or as the root when
    /// `parent` is null) and repair the invariants.
    ///
    /// # Safety
    /// The caller must have located `parent` by an ordered search and the
    /// `dir` slot of `parent` must be empty. `node` must be detached,
    /// valid and 2-aligned.
    pub unsafe fn insert_node(&mut self, node: *mut RbNode, parent: *mut RbNode, dir: RbDirection) {
        debug_assert!(node as usize & 1 == 0);
        (*node).children = [ptr::null_mut(), ptr::null_mut()];
        (*node).parent_color = 0;
        (*node).set_parent(parent);
        if parent.is_null() {
            (*node).set_color(RB_BLACK);
            self.root = node;
            return;
        }
        (*node).set_color(RB_RED);
        (*parent).children[dir as usize] = node;

        let mut node = node;
        let mut parent = parent;
        loop {
            if (*parent).is_black() {
                break;
            }

            let grandparent = (*parent).red_parent();
            let mut dir = 1usize;
            let mut uncle = (*grandparent).children[0];
            if parent == uncle {
                dir = 0;
                uncle = (*grandparent).children[1];
            }

            if is_null_or_black(uncle) {
                let left_dir = dir;
                let right_dir = 1 - dir;
                if node == (*parent).children[right_dir] {
                    // rotate at parent so node and parent line up
                    (*parent).children[right_dir] = (*node).children[left_dir];
                    if !(*parent).children[right_dir].is_null() {
                        (*(*parent).children[right_dir]).set_parent(parent);
                    }
                    (*node).children[left_dir] = parent;
                    (*grandparent).children[left_dir] = node;
                    (*parent).set_parent(node);
                    parent = node;
                }

                // rotate at grandparent
                (*grandparent).children[left_dir] = (*parent).children[right_dir];
                if !(*grandparent).children[left_dir].is_null() {
                    (*(*grandparent).children[left_dir]).set_parent(grandparent);
                }
                (*parent).children[right_dir] = grandparent;

                let greatgrandparent = (*grandparent).parent();
                self.change_child(grandparent, parent, greatgrandparent);

                (*parent).set_parent(greatgrandparent);
                (*parent).set_color(RB_BLACK);

                (*grandparent).set_parent(parent);
                (*grandparent).set_color(RB_RED);

                break;
            }

            (*parent).set_color(RB_BLACK);
            (*uncle).set_color(RB_BLACK);
            (*grandparent).set_color(RB_RED);
            node = grandparent;
            parent = (*node).red_parent();

            if parent.is_null() {
                (*node).set_color(RB_BLACK);
                break;
            }
        }
    }

    /// Unlink `node` from the tree and repair the invariants.
    ///
    /// # Safety
    /// `node` must be a current member of this tree.
    pub unsafe fn remove_node(&mut self, node: *mut RbNode) {
        let child = (*node).children[1];
        let mut tmp = (*node).children[0];
        let rebalance: *mut RbNode;

        if tmp.is_null() {
            // at most one (right) child: splice it in
            let pc = (*node).parent_color;
            let parent = unpack_parent(pc);
            self.change_child(node, child, parent);
            if !child.is_null() {
                (*child).parent_color = pc;
                rebalance = ptr::null_mut();
            } else {
                rebalance = if pc & 1 == RB_BLACK {
                    parent
                } else {
                    ptr::null_mut()
                };
            }
        } else if child.is_null() {
            // only a left child
            let pc = (*node).parent_color;
            (*tmp).parent_color = pc;
            let parent = unpack_parent(pc);
            self.change_child(node, tmp, parent);
            rebalance = ptr::null_mut();
        } else {
            // two children: splice in the successor
            let mut successor = child;
            let child2;
            let mut parent;

            tmp = (*child).children[0];
            if tmp.is_null() {
                parent = successor;
                child2 = (*successor).children[1];
            } else {
                loop {
                    parent = successor;
                    successor = tmp;
                    tmp = (*tmp).children[0];
                    if tmp.is_null() {
                        break;
                    }
                }
                child2 = (*successor).children[1];
                (*parent).children[0] = child2;
                (*successor).children[1] = child;
                (*child).set_parent(successor);
            }

            tmp = (*node).children[0];
            (*successor).children[0] = tmp;
            (*tmp).set_parent(successor);

            let pc = (*node).parent_color;
            tmp = unpack_parent(pc);
            self.change_child(node, successor, tmp);

            if !child2.is_null() {
                (*child2).set_color(RB_BLACK);
                (*child2).set_parent(parent);
                rebalance = ptr::null_mut();
            } else {
                rebalance = if (*successor).is_black() {
                    parent
                } else {
                    ptr::null_mut()
                };
            }
            (*successor).parent_color = pc;
        }

        if !rebalance.is_null() {
            self.remove_repair(rebalance);
        }
    }

    /// Repair a black-height deficit below `parent` (the removed node was
    /// a black leaf).
    unsafe fn remove_repair(&mut self, mut parent: *mut RbNode) {
        // `node` is only consulted to find which side the deficit is on;
        // on the first iteration the removed child was null
        let mut node: *mut RbNode = ptr::null_mut();
        loop {
            let mut dir = 0usize;
            let mut sibling = (*parent).children[1];
            if node == sibling {
                dir = 1;
                sibling = (*parent).children[0];
            }

            let left_dir = dir;
            let right_dir = 1 - dir;

            if (*sibling).is_red() {
                // rotate at parent to get a black sibling
                let tmp = (*sibling).children[left_dir];
                (*parent).children[right_dir] = tmp;
                (*(*parent).children[right_dir]).set_parent(parent);
                (*sibling).children[left_dir] = parent;
                let grandparent = (*parent).parent();
                self.change_child(parent, sibling, grandparent);
                (*sibling).parent_color = (*parent).parent_color;
                (*parent).set_parent(sibling);
                (*parent).set_color(RB_RED);
                sibling = tmp;
            }

            if is_null_or_black((*sibling).children[1]) && is_null_or_black((*sibling).children[0])
            {
                (*sibling).set_color(RB_RED);
                if (*parent).is_red() {
                    (*parent).set_color(RB_BLACK);
                } else {
                    // deficit propagates one level up
                    node = parent;
                    parent = (*node).parent();
                    if !parent.is_null() {
                        continue;
                    }
                }
                break;
            }

            if is_null_or_black((*sibling).children[right_dir]) {
                // rotate at sibling to expose a red outer nephew
                let tmp = (*sibling).children[left_dir];
                (*sibling).children[left_dir] = (*tmp).children[right_dir];
                if !(*sibling).children[left_dir].is_null() {
                    (*(*sibling).children[left_dir]).set_parent(sibling);
                }
                (*tmp).children[right_dir] = sibling;
                (*parent).children[right_dir] = tmp;
                (*sibling).set_parent(tmp);
                sibling = tmp;
            }

            // final rotation at parent
            (*parent).children[right_dir] = (*sibling).children[left_dir];
            if !(*parent).children[right_dir].is_null() {
                (*(*parent).children[right_dir]).set_parent(parent);
            }
            (*sibling).children[left_dir] = parent;
            let grandparent = (*parent).parent();
            self.change_child(parent, sibling, grandparent);
            (*sibling).parent_color = (*parent).parent_color;
            (*parent).set_parent(sibling);
            (*(*sibling).children[right_dir]).set_color(RB_BLACK);
            (*parent).set_color(RB_BLACK);

            break;
        }
    }
}

impl Default for RbTree {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order successor of `node`, null when `node` is the maximum.
///
/// # Safety
/// `node` must be a valid member of a tree.
pub unsafe fn rb_next(node: *const RbNode) -> *mut RbNode {
    if !(*node).children[1].is_null() {
        let mut node = (*node).children[1];
        while !(*node).children[0].is_null() {
            node = (*node).children[0];
        }
        return node;
    }

    let mut node = node;
    let mut parent = (*node).parent();
    while !parent.is_null() && node == (*parent).children[1] as *const _ {
        node = parent;
        parent = (*node).parent();
    }
    parent
}

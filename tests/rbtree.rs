// Intrusive red-black tree: insertion/removal fix-ups, the four color
// invariants, in-order traversal, and the large randomized removal
// stress scenario.

use plinth::rbtree::{rb_next, RbDirection, RbNode, RbTree};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Test payload: the linkage must come first so a node pointer converts
/// back to the payload pointer.
#[repr(C)]
struct KeyNode {
    link: RbNode,
    key: u32,
}

impl KeyNode {
    fn boxed(key: u32) -> Box<KeyNode> {
        Box::new(KeyNode {
            link: RbNode::new(),
            key,
        })
    }
}

unsafe fn key_of(node: *const RbNode) -> u32 {
    (*(node as *const KeyNode)).key
}

/// Ordered insertion: locate the parent and child slot, then link.
/// Duplicate keys go right.
fn insert(tree: &mut RbTree, node: &mut KeyNode) {
    unsafe {
        let mut parent = std::ptr::null_mut::<RbNode>();
        let mut cur = tree.root();
        let mut dir = RbDirection::Left;
        while !cur.is_null() {
            parent = cur;
            dir = if node.key < key_of(cur) {
                RbDirection::Left
            } else {
                RbDirection::Right
            };
            cur = (*cur).child(dir);
        }
        tree.insert_node(&mut node.link, parent, dir);
    }
}

fn collect_keys(tree: &RbTree) -> Vec<u32> {
    let mut keys = Vec::new();
    let mut cur = tree.first();
    while !cur.is_null() {
        unsafe {
            keys.push(key_of(cur));
            cur = rb_next(cur);
        }
    }
    keys
}

/// Walk the whole tree checking the red-black invariants; returns the
/// black height.
unsafe fn check_node(node: *const RbNode, parent: *const RbNode) -> u32 {
    if node.is_null() {
        return 1; // null leaves are black
    }
    assert_eq!(
        (*node).parent() as *const RbNode,
        parent,
        "parent pointer corrupted at key {}",
        key_of(node)
    );
    if (*node).is_red() {
        for dir in [RbDirection::Left, RbDirection::Right] {
            let child = (*node).child(dir);
            assert!(
                child.is_null() || (*child).is_black(),
                "red node {} has a red child",
                key_of(node)
            );
        }
    }
    let left = check_node((*node).child(RbDirection::Left), node);
    let right = check_node((*node).child(RbDirection::Right), node);
    assert_eq!(left, right, "unequal black heights under key {}", key_of(node));
    left + (*node).is_black() as u32
}

fn check_invariants(tree: &RbTree) {
    unsafe {
        let root = tree.root();
        if !root.is_null() {
            assert!((*root).is_black(), "root must be black");
        }
        check_node(root, std::ptr::null());
    }
}

#[test]
fn empty_tree() {
    let tree = RbTree::new();
    assert!(tree.root().is_null());
    assert!(tree.first().is_null());
    check_invariants(&tree);
}

#[test]
fn single_node_is_black_root() {
    let mut tree = RbTree::new();
    let mut node = KeyNode::boxed(7);
    insert(&mut tree, &mut node);
    check_invariants(&tree);
    assert_eq!(collect_keys(&tree), vec![7]);
    unsafe {
        tree.remove_node(&mut node.link);
    }
    assert!(tree.root().is_null());
}

#[test]
fn ascending_insertion_stays_balanced() {
    let mut tree = RbTree::new();
    let mut nodes: Vec<Box<KeyNode>> = (0..1000).map(KeyNode::boxed).collect();
    for node in &mut nodes {
        insert(&mut tree, node);
        check_invariants(&tree);
    }
    assert_eq!(collect_keys(&tree), (0..1000).collect::<Vec<_>>());
}

#[test]
fn traversal_is_key_ordered() {
    let mut tree = RbTree::new();
    let keys = [50u32, 20, 80, 10, 30, 70, 90, 25, 35];
    let mut nodes: Vec<Box<KeyNode>> = keys.iter().map(|&k| KeyNode::boxed(k)).collect();
    for node in &mut nodes {
        insert(&mut tree, node);
    }
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    assert_eq!(collect_keys(&tree), sorted);
}

#[test]
fn duplicate_keys_are_kept() {
    let mut tree = RbTree::new();
    let keys = [5u32, 5, 5, 1, 9];
    let mut nodes: Vec<Box<KeyNode>> = keys.iter().map(|&k| KeyNode::boxed(k)).collect();
    for node in &mut nodes {
        insert(&mut tree, node);
        check_invariants(&tree);
    }
    assert_eq!(collect_keys(&tree), vec![1, 5, 5, 5, 9]);
}

#[test]
fn removal_in_every_order_keeps_invariants() {
    // all 24 removal orders of a 4-node tree
    let perms: Vec<Vec<usize>> = {
        fn perms_of(v: Vec<usize>) -> Vec<Vec<usize>> {
            if v.len() <= 1 {
                return vec![v];
            }
            let mut out = Vec::new();
            for i in 0..v.len() {
                let mut rest = v.clone();
                let head = rest.remove(i);
                for mut tail in perms_of(rest) {
                    tail.insert(0, head);
                    out.push(tail);
                }
            }
            out
        }
        perms_of(vec![0, 1, 2, 3])
    };

    for order in perms {
        let mut tree = RbTree::new();
        let mut nodes: Vec<Box<KeyNode>> = [4u32, 2, 6, 1].iter().map(|&k| KeyNode::boxed(k)).collect();
        for node in &mut nodes {
            insert(&mut tree, node);
        }
        let mut remaining: Vec<u32> = vec![4, 2, 6, 1];
        for &i in &order {
            unsafe {
                tree.remove_node(&mut nodes[i].link);
            }
            remaining.retain(|&k| k != nodes[i].key);
            check_invariants(&tree);
            let mut sorted = remaining.clone();
            sorted.sort_unstable();
            assert_eq!(collect_keys(&tree), sorted);
        }
        assert!(tree.root().is_null());
    }
}

/// Scenario: 200 000 random keys with a fixed seed, invariants verified
/// every 1024 operations, removal in an independently shuffled order.
#[test]
fn randomized_removal_stress() {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let mut tree = RbTree::new();
    let mut nodes: Vec<Box<KeyNode>> = (0..200_000)
        .map(|_| KeyNode::boxed(rng.gen::<u32>()))
        .collect();

    for (ops, node) in nodes.iter_mut().enumerate() {
        insert(&mut tree, node);
        if ops % 1024 == 0 {
            check_invariants(&tree);
        }
    }
    check_invariants(&tree);

    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.shuffle(&mut rng);
    for (ops, &i) in order.iter().enumerate() {
        unsafe {
            tree.remove_node(&mut nodes[i].link);
        }
        if ops % 1024 == 0 {
            check_invariants(&tree);
        }
    }
    assert!(tree.root().is_null());
}

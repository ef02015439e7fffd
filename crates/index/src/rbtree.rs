use slab::Slab;
use std::cmp::Ordering;

/// Node color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Arena handle of a red-black node
pub type NodeId = usize;

struct RbNode<K, V> {
    key: K,
    value: V,
    color: Color,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// Read-only view of a node returned by lookups
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a, K, V> {
    id: NodeId,
    key: &'a K,
    value: &'a V,
    color: Color,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &'a K {
        self.key
    }

    pub fn value(&self) -> &'a V {
        self.value
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

/// Red-black tree with nodes in a slab arena
///
/// Parent links are plain arena handles, so there is no shared ownership
/// between nodes. Missing children count as black leaves.
pub struct RedBlackTree<K, V> {
    nodes: Slab<RbNode<K, V>>,
    root: Option<NodeId>,
}

impl<K: Ord, V> RedBlackTree<K, V> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
        }
    }

    /// Insert `key` with `value` as a red node and repair the coloring
    ///
    /// Returns `false` without touching the tree when `key` already exists.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let mut parent = None;
        let mut current = self.root;
        let mut as_left = false;

        while let Some(id) = current {
            let node = &self.nodes[id];
            parent = Some(id);
            match key.cmp(&node.key) {
                Ordering::Less => {
                    as_left = true;
                    current = node.left;
                }
                Ordering::Greater => {
                    as_left = false;
                    current = node.right;
                }
                Ordering::Equal => return false,
            }
        }

        let id = self.nodes.insert(RbNode {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        });

        match parent {
            None => self.root = Some(id),
            Some(p) if as_left => self.nodes[p].left = Some(id),
            Some(p) => self.nodes[p].right = Some(id),
        }

        self.insert_fixup(id);
        true
    }

    /// Remove `key`, returning whether it was present
    ///
    /// A node with two children takes over its in-order predecessor's entry
    /// and the predecessor's node is unlinked instead.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(found) = self.find_id(key) else {
            return false;
        };

        let target = match (self.nodes[found].left, self.nodes[found].right) {
            (Some(left), Some(_)) => self.max_id(left),
            _ => found,
        };

        let child = self.nodes[target].left.or(self.nodes[target].right);
        let parent = self.nodes[target].parent;
        self.replace_child(parent, target, child);
        if let Some(c) = child {
            self.nodes[c].parent = parent;
        }

        let removed = self.nodes.remove(target);
        let removed_color = removed.color;
        if target != found {
            let node = &mut self.nodes[found];
            node.key = removed.key;
            node.value = removed.value;
        }

        if removed_color == Color::Black {
            self.remove_fixup(child, parent);
        }
        true
    }

    /// Exact-match lookup
    pub fn find(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.find_id(key).map(|id| self.node_ref(id))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find_id(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find_id(key).map(|id| &self.nodes[id].value)
    }

    /// Node with the smallest key `>= key`
    pub fn lower_bound(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.bound(key, false, true).map(|id| self.node_ref(id))
    }

    /// Node with the smallest key `> key`
    pub fn upper_bound(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.bound(key, true, true).map(|id| self.node_ref(id))
    }

    /// First node met on the descent whose key is `>= key`
    ///
    /// Diagnostic counterpart of [`lower_bound`](Self::lower_bound): the
    /// descent stops at the first hit instead of tightening to the left.
    pub fn first_at_least(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.bound(key, false, false).map(|id| self.node_ref(id))
    }

    /// First node met on the descent whose key is `> key`
    pub fn first_greater_than(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.bound(key, true, false).map(|id| self.node_ref(id))
    }

    /// Entries with `low <= key <= high` in ascending order
    ///
    /// Subtrees whose key span lies entirely outside the interval are not
    /// visited.
    pub fn range(&self, low: &K, high: &K) -> Vec<(&K, &V)> {
        let mut out = Vec::new();
        if low <= high {
            self.collect_range(self.root, low, high, &mut out);
        }
        out
    }

    fn collect_range<'a>(
        &'a self,
        link: Option<NodeId>,
        low: &K,
        high: &K,
        out: &mut Vec<(&'a K, &'a V)>,
    ) {
        let Some(id) = link else {
            return;
        };
        let node = &self.nodes[id];
        if &node.key > low {
            self.collect_range(node.left, low, high, out);
        }
        if &node.key >= low && &node.key <= high {
            out.push((&node.key, &node.value));
        }
        if &node.key < high {
            self.collect_range(node.right, low, high, out);
        }
    }

    fn bound(&self, key: &K, strict: bool, tightest: bool) -> Option<NodeId> {
        let mut current = self.root;
        let mut best = None;
        while let Some(id) = current {
            let node = &self.nodes[id];
            let hit = if strict { &node.key > key } else { &node.key >= key };
            if hit {
                best = Some(id);
                if !tightest {
                    break;
                }
                current = node.left;
            } else {
                current = node.right;
            }
        }
        best
    }

    fn find_id(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id];
            current = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }
}

impl<K, V> RedBlackTree<K, V> {
    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.root.map(|id| self.node_ref(id))
    }

    /// Ascending `(key, value)` iterator
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// `(key, color)` pairs in breadth-first order
    pub fn level_order(&self) -> Vec<(&K, Color)> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.extend(self.root);
        while let Some(id) = queue.pop_front() {
            let node = &self.nodes[id];
            out.push((&node.key, node.color));
            queue.extend(node.left);
            queue.extend(node.right);
        }
        out
    }

    /// Black height of the tree, or `None` when a red-black invariant or a
    /// parent link is broken
    pub fn black_height(&self) -> Option<usize> {
        if self.color_of(self.root) == Color::Red {
            return None;
        }
        self.check_subtree(self.root, None)
    }

    fn check_subtree(&self, link: Option<NodeId>, parent: Option<NodeId>) -> Option<usize> {
        let Some(id) = link else {
            return Some(1);
        };
        let node = &self.nodes[id];
        if node.parent != parent {
            return None;
        }
        if node.color == Color::Red
            && (self.color_of(node.left) == Color::Red || self.color_of(node.right) == Color::Red)
        {
            return None;
        }
        let left = self.check_subtree(node.left, Some(id))?;
        let right = self.check_subtree(node.right, Some(id))?;
        if left != right {
            return None;
        }
        Some(left + usize::from(node.color == Color::Black))
    }

    fn node_ref(&self, id: NodeId) -> NodeRef<'_, K, V> {
        let node = &self.nodes[id];
        NodeRef {
            id,
            key: &node.key,
            value: &node.value,
            color: node.color,
        }
    }

    fn color_of(&self, link: Option<NodeId>) -> Color {
        link.map_or(Color::Black, |id| self.nodes[id].color)
    }

    fn set_color(&mut self, link: Option<NodeId>, color: Color) {
        if let Some(id) = link {
            self.nodes[id].color = color;
        }
    }

    fn max_id(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        id
    }

    /// Point `parent`'s link to `old` at `new` instead (or the root link)
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].right else {
            return;
        };
        let inner = self.nodes[y].left;
        self.nodes[x].right = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].left else {
            return;
        };
        let inner = self.nodes[y].right;
        self.nodes[x].left = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(p) = self.nodes[z].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red parent always has a parent of its own
            let Some(g) = self.nodes[p].parent else {
                break;
            };

            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right;
                if self.color_of(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    let (node, parent) = if self.nodes[p].right == Some(z) {
                        self.rotate_left(p);
                        (p, z)
                    } else {
                        (z, p)
                    };
                    self.nodes[parent].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                    z = node;
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.color_of(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    let (node, parent) = if self.nodes[p].left == Some(z) {
                        self.rotate_right(p);
                        (p, z)
                    } else {
                        (z, p)
                    };
                    self.nodes[parent].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                    z = node;
                }
            }
        }
        self.set_color(self.root, Color::Black);
    }

    /// Resolve a double-black at `x` (possibly an empty slot under `parent`)
    fn remove_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            if self.nodes[p].left == x {
                let Some(mut w) = self.nodes[p].right else {
                    break;
                };
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    match self.nodes[p].right {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }

                let near = self.nodes[w].left;
                let far = self.nodes[w].right;
                if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color_of(far) == Color::Black {
                        self.set_color(near, Color::Black);
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        match self.nodes[p].right {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].right;
                    self.set_color(far, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.nodes[p].left else {
                    break;
                };
                if self.nodes[w].color == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    match self.nodes[p].left {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }

                let near = self.nodes[w].right;
                let far = self.nodes[w].left;
                if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                    self.nodes[w].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color_of(far) == Color::Black {
                        self.set_color(near, Color::Black);
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        match self.nodes[p].left {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let far = self.nodes[w].left;
                    self.set_color(far, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }
}

impl<K: Ord, V> Default for RedBlackTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over a [`RedBlackTree`]
pub struct Iter<'a, K, V> {
    tree: &'a RedBlackTree<K, V>,
    stack: Vec<NodeId>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut link: Option<NodeId>) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.tree.nodes[id].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        let node = &tree.nodes[id];
        self.push_left(node.right);
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::Color::{Black, Red};

    fn tree_of(items: &[i32]) -> RedBlackTree<i32, i32> {
        let mut tree = RedBlackTree::new();
        for &k in items {
            tree.insert(k, k);
        }
        tree
    }

    fn shape(tree: &RedBlackTree<i32, i32>) -> Vec<(i32, Color)> {
        tree.level_order().into_iter().map(|(k, c)| (*k, c)).collect()
    }

    fn keys(tree: &RedBlackTree<i32, i32>) -> Vec<i32> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_insert_shape() {
        let tree = tree_of(&[10, 20, 30, 15, 25, 5, 1]);
        assert_eq!(
            shape(&tree),
            vec![(20, Black), (10, Red), (30, Black), (5, Black), (15, Black), (25, Red), (1, Red)]
        );
        assert_eq!(tree.black_height(), Some(3));
    }

    #[test]
    fn test_tight_and_first_met_bounds() {
        let tree = tree_of(&[10, 20, 30, 15, 25, 5, 1]);

        assert_eq!(tree.first_at_least(&12).map(|n| *n.key()), Some(20));
        assert_eq!(tree.lower_bound(&12).map(|n| *n.key()), Some(15));

        assert_eq!(tree.first_greater_than(&22).map(|n| *n.key()), Some(30));
        assert_eq!(tree.upper_bound(&22).map(|n| *n.key()), Some(25));

        assert_eq!(tree.first_at_least(&15).map(|n| *n.key()), Some(20));
        assert_eq!(tree.lower_bound(&15).map(|n| *n.key()), Some(15));
        assert_eq!(tree.upper_bound(&15).map(|n| *n.key()), Some(20));

        assert!(tree.lower_bound(&31).is_none());
        assert!(tree.upper_bound(&30).is_none());
        assert_eq!(tree.lower_bound(&0).map(|n| *n.key()), Some(1));
    }

    #[test]
    fn test_remove_sequence_uses_predecessor() {
        let mut tree = tree_of(&(1..=10).collect::<Vec<_>>());
        assert_eq!(
            shape(&tree),
            vec![
                (4, Black), (2, Black), (6, Black), (1, Black), (3, Black),
                (5, Black), (8, Red), (7, Black), (9, Black), (10, Red),
            ]
        );
        assert_eq!(tree.len(), 10);

        assert!(tree.remove(&1));
        assert!(!tree.contains(&1));
        assert_eq!(
            shape(&tree),
            vec![
                (6, Black), (4, Black), (8, Black), (2, Black), (5, Black),
                (7, Black), (9, Black), (3, Red), (10, Red),
            ]
        );

        // 4 has two children; its predecessor 3 takes its place
        assert!(tree.remove(&4));
        assert!(!tree.contains(&4));
        assert_eq!(
            shape(&tree),
            vec![
                (6, Black), (3, Black), (8, Black), (2, Black), (5, Black),
                (7, Black), (9, Black), (10, Red),
            ]
        );

        assert!(tree.remove(&5));
        assert_eq!(
            shape(&tree),
            vec![(6, Black), (3, Black), (8, Red), (2, Red), (7, Black), (9, Black), (10, Red)]
        );
        assert_eq!(tree.len(), 7);
        assert!(tree.black_height().is_some());
    }

    #[test]
    fn test_find_and_absent_remove() {
        let mut tree = tree_of(&[3, 1, 2]);
        let node = tree.find(&2).unwrap();
        assert_eq!(*node.value(), 2);
        assert_eq!(node.color(), Black);
        assert!(tree.find(&7).is_none());

        assert!(!tree.remove(&7));
        assert_eq!(tree.len(), 3);

        assert!(!tree.insert(1, 100));
        assert_eq!(tree.get(&1), Some(&1));
    }

    #[test]
    fn test_range_collects_in_order() {
        let tree = tree_of(&(1..=20).collect::<Vec<_>>());
        let hits: Vec<i32> = tree.range(&5, &9).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(hits, vec![5, 6, 7, 8, 9]);
        assert!(tree.range(&9, &5).is_empty());
        assert!(tree.range(&21, &30).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut tree = tree_of(&[1, 2, 3]);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.root().is_none());
        assert!(tree.insert(5, 5));
        assert_eq!(tree.root().map(|n| n.color()), Some(Black));
    }

    proptest! {
        #[test]
        fn prop_invariants_after_mixed_operations(
            ops in prop::collection::vec((any::<bool>(), 0i32..64), 1..300)
        ) {
            let mut tree = RedBlackTree::new();
            let mut model = std::collections::BTreeSet::new();
            for (insert, key) in ops {
                if insert {
                    prop_assert_eq!(tree.insert(key, key), model.insert(key));
                } else {
                    prop_assert_eq!(tree.remove(&key), model.remove(&key));
                }
                prop_assert!(tree.black_height().is_some());
                prop_assert_eq!(tree.len(), model.len());
            }
            prop_assert_eq!(keys(&tree), model.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_bounds_match_model(
            items in prop::collection::btree_set(0i32..100, 0..50),
            probe in -5i32..105
        ) {
            let tree = tree_of(&items.iter().copied().collect::<Vec<_>>());
            let lower = items.range(probe..).next().copied();
            let upper = items.range(probe + 1..).next().copied();
            prop_assert_eq!(tree.lower_bound(&probe).map(|n| *n.key()), lower);
            prop_assert_eq!(tree.upper_bound(&probe).map(|n| *n.key()), upper);
            if let Some(first) = tree.first_at_least(&probe) {
                prop_assert!(*first.key() >= probe);
            }
        }
    }
}

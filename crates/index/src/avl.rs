use std::cmp::Ordering;
use std::fmt;

/// Balance tag of an AVL node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// Left subtree is one level taller
    LeftHigh,

    /// Both subtrees have the same height
    Even,

    /// Right subtree is one level taller
    RightHigh,
}

type Link<K, V> = Option<Box<AvlNode<K, V>>>;

/// AVL tree node
pub struct AvlNode<K, V> {
    key: K,
    value: V,
    balance: Balance,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> AvlNode<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            balance: Balance::Even,
            left: None,
            right: None,
        })
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn left(&self) -> Option<&AvlNode<K, V>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&AvlNode<K, V>> {
        self.right.as_deref()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for AvlNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvlNode")
            .field("key", &self.key)
            .field("balance", &self.balance)
            .finish()
    }
}

/// Height-balanced binary search tree
///
/// Heights are never stored: each node carries only a three-valued
/// [`Balance`] tag that insert and remove keep exact while the "taller" /
/// "shorter" signal travels back up the recursion.
pub struct AvlTree<K, V> {
    root: Link<K, V>,
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Insert `key` with `value`
    ///
    /// Returns `false` and leaves the tree untouched when `key` is already
    /// present; the stored value is not replaced.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let (root, outcome) = Self::insert_node(self.root.take(), key, value);
        self.root = Some(root);
        outcome.is_some()
    }

    /// Remove `key`, returning whether it was present
    pub fn remove(&mut self, key: &K) -> bool {
        match self.root.take() {
            Some(root) => {
                let (root, outcome) = Self::remove_node(root, key);
                self.root = root;
                outcome.is_some()
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match key.cmp(&node.key) {
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    // Returns the new subtree root and `None` for a duplicate key,
    // otherwise `Some(taller)`.
    fn insert_node(link: Link<K, V>, key: K, value: V) -> (Box<AvlNode<K, V>>, Option<bool>) {
        let mut node = match link {
            Some(node) => node,
            None => return (AvlNode::leaf(key, value), Some(true)),
        };

        match key.cmp(&node.key) {
            Ordering::Equal => (node, None),
            Ordering::Less => {
                let (left, outcome) = Self::insert_node(node.left.take(), key, value);
                node.left = Some(left);
                match outcome {
                    Some(true) => {
                        let (node, taller) = Self::left_grew(node);
                        (node, Some(taller))
                    }
                    other => (node, other),
                }
            }
            Ordering::Greater => {
                let (right, outcome) = Self::insert_node(node.right.take(), key, value);
                node.right = Some(right);
                match outcome {
                    Some(true) => {
                        let (node, taller) = Self::right_grew(node);
                        (node, Some(taller))
                    }
                    other => (node, other),
                }
            }
        }
    }

    fn left_grew(mut node: Box<AvlNode<K, V>>) -> (Box<AvlNode<K, V>>, bool) {
        match node.balance {
            Balance::RightHigh => {
                node.balance = Balance::Even;
                (node, false)
            }
            Balance::Even => {
                node.balance = Balance::LeftHigh;
                (node, true)
            }
            Balance::LeftHigh => {
                let left_balance = node.left.as_ref().map(|l| l.balance);
                let node = if left_balance == Some(Balance::LeftHigh) {
                    let mut pivot = rotate_right(node);
                    pivot.balance = Balance::Even;
                    if let Some(right) = pivot.right.as_mut() {
                        right.balance = Balance::Even;
                    }
                    pivot
                } else {
                    rotate_left_right(node)
                };
                (node, false)
            }
        }
    }

    fn right_grew(mut node: Box<AvlNode<K, V>>) -> (Box<AvlNode<K, V>>, bool) {
        match node.balance {
            Balance::LeftHigh => {
                node.balance = Balance::Even;
                (node, false)
            }
            Balance::Even => {
                node.balance = Balance::RightHigh;
                (node, true)
            }
            Balance::RightHigh => {
                let right_balance = node.right.as_ref().map(|r| r.balance);
                let node = if right_balance == Some(Balance::RightHigh) {
                    let mut pivot = rotate_left(node);
                    pivot.balance = Balance::Even;
                    if let Some(left) = pivot.left.as_mut() {
                        left.balance = Balance::Even;
                    }
                    pivot
                } else {
                    rotate_right_left(node)
                };
                (node, false)
            }
        }
    }

    // Returns the new subtree root and `None` when the key is absent,
    // otherwise `Some(shorter)`.
    fn remove_node(mut node: Box<AvlNode<K, V>>, key: &K) -> (Link<K, V>, Option<bool>) {
        match key.cmp(&node.key) {
            Ordering::Less => {
                let Some(left) = node.left.take() else {
                    return (Some(node), None);
                };
                let (left, outcome) = Self::remove_node(left, key);
                node.left = left;
                match outcome {
                    Some(true) => {
                        let (node, shorter) = Self::left_shrank(node);
                        (Some(node), Some(shorter))
                    }
                    other => (Some(node), other),
                }
            }
            Ordering::Greater => {
                let Some(right) = node.right.take() else {
                    return (Some(node), None);
                };
                let (right, outcome) = Self::remove_node(right, key);
                node.right = right;
                match outcome {
                    Some(true) => {
                        let (node, shorter) = Self::right_shrank(node);
                        (Some(node), Some(shorter))
                    }
                    other => (Some(node), other),
                }
            }
            Ordering::Equal => match (node.left.take(), node.right.take()) {
                (None, None) => (None, Some(true)),
                (Some(child), None) | (None, Some(child)) => (Some(child), Some(true)),
                (Some(left), Some(right)) => {
                    // Successor (minimum of the right subtree) takes this slot
                    node.left = Some(left);
                    let (right, successor_key, successor_value, shorter) = Self::remove_min(right);
                    node.key = successor_key;
                    node.value = successor_value;
                    node.right = right;
                    if shorter {
                        let (node, shorter) = Self::right_shrank(node);
                        (Some(node), Some(shorter))
                    } else {
                        (Some(node), Some(false))
                    }
                }
            },
        }
    }

    /// Detach the minimum node, returning the rest of the subtree, its
    /// key/value and whether the subtree got shorter
    fn remove_min(mut node: Box<AvlNode<K, V>>) -> (Link<K, V>, K, V, bool) {
        match node.left.take() {
            None => {
                let AvlNode { key, value, right, .. } = *node;
                (right, key, value, true)
            }
            Some(left) => {
                let (left, key, value, shorter) = Self::remove_min(left);
                node.left = left;
                if shorter {
                    let (node, shorter) = Self::left_shrank(node);
                    (Some(node), key, value, shorter)
                } else {
                    (Some(node), key, value, false)
                }
            }
        }
    }

    fn left_shrank(mut node: Box<AvlNode<K, V>>) -> (Box<AvlNode<K, V>>, bool) {
        match node.balance {
            Balance::LeftHigh => {
                node.balance = Balance::Even;
                (node, true)
            }
            Balance::Even => {
                node.balance = Balance::RightHigh;
                (node, false)
            }
            Balance::RightHigh => {
                let right_balance = node.right.as_ref().map(|r| r.balance);
                match right_balance {
                    Some(Balance::Even) => {
                        // Rotation absorbs the height loss
                        let mut pivot = rotate_left(node);
                        pivot.balance = Balance::LeftHigh;
                        if let Some(left) = pivot.left.as_mut() {
                            left.balance = Balance::RightHigh;
                        }
                        (pivot, false)
                    }
                    Some(Balance::RightHigh) => {
                        let mut pivot = rotate_left(node);
                        pivot.balance = Balance::Even;
                        if let Some(left) = pivot.left.as_mut() {
                            left.balance = Balance::Even;
                        }
                        (pivot, true)
                    }
                    _ => (rotate_right_left(node), true),
                }
            }
        }
    }

    fn right_shrank(mut node: Box<AvlNode<K, V>>) -> (Box<AvlNode<K, V>>, bool) {
        match node.balance {
            Balance::RightHigh => {
                node.balance = Balance::Even;
                (node, true)
            }
            Balance::Even => {
                node.balance = Balance::LeftHigh;
                (node, false)
            }
            Balance::LeftHigh => {
                let left_balance = node.left.as_ref().map(|l| l.balance);
                match left_balance {
                    Some(Balance::Even) => {
                        let mut pivot = rotate_right(node);
                        pivot.balance = Balance::RightHigh;
                        if let Some(right) = pivot.right.as_mut() {
                            right.balance = Balance::LeftHigh;
                        }
                        (pivot, false)
                    }
                    Some(Balance::LeftHigh) => {
                        let mut pivot = rotate_right(node);
                        pivot.balance = Balance::Even;
                        if let Some(right) = pivot.right.as_mut() {
                            right.balance = Balance::Even;
                        }
                        (pivot, true)
                    }
                    _ => (rotate_left_right(node), true),
                }
            }
        }
    }
}

impl<K, V> AvlTree<K, V> {
    /// Number of nodes (full traversal)
    pub fn len(&self) -> usize {
        fn count<K, V>(link: Option<&AvlNode<K, V>>) -> usize {
            link.map_or(0, |n| 1 + count(n.left()) + count(n.right()))
        }
        count(self.root.as_deref())
    }

    /// Height in nodes, 0 for an empty tree (full traversal)
    pub fn height(&self) -> usize {
        fn height<K, V>(link: Option<&AvlNode<K, V>>) -> usize {
            link.map_or(0, |n| 1 + height(n.left()).max(height(n.right())))
        }
        height(self.root.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.root = None;
    }

    pub fn root(&self) -> Option<&AvlNode<K, V>> {
        self.root.as_deref()
    }

    /// Visit every value in ascending key order
    pub fn inorder_traversal<F: FnMut(&V)>(&self, mut visit: F) {
        for (_, value) in self.iter() {
            visit(value);
        }
    }

    /// Ascending `(key, value)` iterator
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Keys in breadth-first order
    pub fn level_order(&self) -> Vec<&K> {
        let mut keys = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.extend(self.root.as_deref());
        while let Some(node) = queue.pop_front() {
            keys.push(&node.key);
            queue.extend(node.left());
            queue.extend(node.right());
        }
        keys
    }

    /// Recompute subtree heights and check that every node satisfies the
    /// height bound and carries the matching balance tag
    pub fn is_balanced(&self) -> bool {
        fn check<K, V>(link: Option<&AvlNode<K, V>>) -> Option<usize> {
            let Some(node) = link else {
                return Some(0);
            };
            let left = check(node.left())?;
            let right = check(node.right())?;
            let expected = match left as isize - right as isize {
                1 => Balance::LeftHigh,
                0 => Balance::Even,
                -1 => Balance::RightHigh,
                _ => return None,
            };
            (node.balance == expected).then_some(1 + left.max(right))
        }
        check(self.root.as_deref()).is_some()
    }
}

impl<K: Ord, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over an [`AvlTree`]
pub struct Iter<'a, K, V> {
    stack: Vec<&'a AvlNode<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut link: Option<&'a AvlNode<K, V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

fn rotate_right<K, V>(mut node: Box<AvlNode<K, V>>) -> Box<AvlNode<K, V>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    pivot.right = Some(node);
    pivot
}

fn rotate_left<K, V>(mut node: Box<AvlNode<K, V>>) -> Box<AvlNode<K, V>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    pivot.left = Some(node);
    pivot
}

/// Double rotation for a left-heavy node whose left child leans right;
/// tags are derived from the grandchild's tag before it moves up
fn rotate_left_right<K, V>(mut node: Box<AvlNode<K, V>>) -> Box<AvlNode<K, V>> {
    let Some(left) = node.left.take() else {
        return node;
    };
    let grandchild = left.right.as_ref().map_or(Balance::Even, |g| g.balance);
    node.left = Some(rotate_left(left));
    let mut pivot = rotate_right(node);

    let (left_tag, right_tag) = match grandchild {
        Balance::LeftHigh => (Balance::Even, Balance::RightHigh),
        Balance::Even => (Balance::Even, Balance::Even),
        Balance::RightHigh => (Balance::LeftHigh, Balance::Even),
    };
    if let Some(left) = pivot.left.as_mut() {
        left.balance = left_tag;
    }
    if let Some(right) = pivot.right.as_mut() {
        right.balance = right_tag;
    }
    pivot.balance = Balance::Even;
    pivot
}

/// Mirror of [`rotate_left_right`]
fn rotate_right_left<K, V>(mut node: Box<AvlNode<K, V>>) -> Box<AvlNode<K, V>> {
    let Some(right) = node.right.take() else {
        return node;
    };
    let grandchild = right.left.as_ref().map_or(Balance::Even, |g| g.balance);
    node.right = Some(rotate_right(right));
    let mut pivot = rotate_left(node);

    let (left_tag, right_tag) = match grandchild {
        Balance::LeftHigh => (Balance::Even, Balance::RightHigh),
        Balance::Even => (Balance::Even, Balance::Even),
        Balance::RightHigh => (Balance::LeftHigh, Balance::Even),
    };
    if let Some(left) = pivot.left.as_mut() {
        left.balance = left_tag;
    }
    if let Some(right) = pivot.right.as_mut() {
        right.balance = right_tag;
    }
    pivot.balance = Balance::Even;
    pivot
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys(tree: &AvlTree<i32, i32>) -> Vec<i32> {
        tree.level_order().into_iter().copied().collect()
    }

    fn sorted(tree: &AvlTree<i32, i32>) -> Vec<i32> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    fn tree_of(items: &[i32]) -> AvlTree<i32, i32> {
        let mut tree = AvlTree::new();
        for &k in items {
            tree.insert(k, k);
        }
        tree
    }

    #[test]
    fn test_single_left_rotation() {
        let tree = tree_of(&[10, 20, 30]);
        assert_eq!(keys(&tree), vec![20, 10, 30]);
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_single_right_rotation() {
        let tree = tree_of(&[10, 20, 30, 5, 4]);
        assert_eq!(keys(&tree), vec![20, 5, 30, 4, 10]);
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_double_rotations() {
        let tree = tree_of(&[30, 10, 20]);
        assert_eq!(keys(&tree), vec![20, 10, 30]);

        let tree = tree_of(&[10, 30, 20]);
        assert_eq!(keys(&tree), vec![20, 10, 30]);

        // 20(5(4,10),30) + 7 -> left-right at the root
        let tree = tree_of(&[10, 20, 30, 5, 4, 7]);
        assert_eq!(keys(&tree), vec![10, 5, 20, 4, 7, 30]);
        assert!(tree.is_balanced());
        assert_eq!(sorted(&tree), vec![4, 5, 7, 10, 20, 30]);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut tree = tree_of(&[2, 1, 3]);
        assert!(!tree.insert(2, 99));
        assert_eq!(tree.get(&2), Some(&2));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_remove_cases() {
        let mut tree = tree_of(&[50, 30, 70, 20, 40, 60, 80]);

        assert!(tree.contains(&20));
        assert!(tree.remove(&20));
        assert!(!tree.contains(&20));

        // 30 now has a single child
        assert!(tree.remove(&30));
        assert_eq!(keys(&tree), vec![50, 40, 70, 60, 80]);

        // Root with two children is replaced by its successor
        assert!(tree.remove(&50));
        assert_eq!(keys(&tree), vec![60, 40, 70, 80]);

        assert!(tree.remove(&40));
        assert_eq!(keys(&tree), vec![70, 60, 80]);
        assert!(tree.is_balanced());

        assert!(!tree.remove(&99));
        assert_eq!(tree.len(), 3);

        assert!(!tree.is_empty());
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
    }

    #[test]
    fn test_remove_propagates_to_root() {
        // Removing 1 shortens the left side of the root
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7, 8]);
        assert!(tree.remove(&1));
        assert!(tree.remove(&3));
        assert!(tree.is_balanced());
        assert_eq!(sorted(&tree), vec![2, 4, 5, 6, 7, 8]);
        assert_eq!(keys(&tree)[0], 6);
    }

    #[test]
    fn test_inorder_traversal() {
        let tree = tree_of(&[3, 1, 2]);
        let mut seen = Vec::new();
        tree.inorder_traversal(|v| seen.push(*v));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_root_view() {
        let tree = tree_of(&[1, 2]);
        let root = tree.root().unwrap();
        assert_eq!(*root.key(), 1);
        assert_eq!(root.balance(), Balance::RightHigh);
        assert_eq!(root.right().map(|n| *n.value()), Some(2));
        assert!(root.left().is_none());
    }

    proptest! {
        #[test]
        fn prop_balanced_after_mixed_operations(
            ops in prop::collection::vec((any::<bool>(), 0i32..64), 1..300)
        ) {
            let mut tree = AvlTree::new();
            let mut model = std::collections::BTreeSet::new();
            for (insert, key) in ops {
                if insert {
                    prop_assert_eq!(tree.insert(key, key), model.insert(key));
                } else {
                    prop_assert_eq!(tree.remove(&key), model.remove(&key));
                }
                prop_assert!(tree.is_balanced());
            }
            prop_assert_eq!(sorted(&tree), model.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_duplicate_insert_idempotent(items in prop::collection::vec(0i32..32, 1..64)) {
            let mut tree = tree_of(&items);
            let before = sorted(&tree);
            let len = tree.len();
            for &k in &items {
                prop_assert!(!tree.insert(k, -1));
            }
            prop_assert_eq!(tree.len(), len);
            prop_assert_eq!(sorted(&tree), before);
        }
    }
}

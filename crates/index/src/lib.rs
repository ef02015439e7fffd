//! Balanced binary search trees used as ordered indices
//!
//! - [`AvlTree`]: height-balanced tree with three-valued balance tags
//! - [`RedBlackTree`]: arena-backed red-black tree with bound queries

mod avl;
mod rbtree;

pub use avl::{AvlNode, AvlTree, Balance, Iter as AvlIter};
pub use rbtree::{Color, Iter as RbIter, NodeId, NodeRef, RedBlackTree};

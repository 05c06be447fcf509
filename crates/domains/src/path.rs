//! # Materialized paths
//!
//! Every post stores its ancestor chain (`parents`) and the id of its
//! top-level ancestor (`root`). Tree orderings compare `parents ++ [id]`
//! lexicographically, so these values must be exact: a child's `parents` is its
//! parent's `parents` with the parent id appended, and `root` is shared by a
//! whole subtree.

use crate::errors::{DomainError, DomainResult};

/// The stored `(parents, root)` pair of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPath {
    pub parents: Vec<i64>,
    pub root: i64,
}

impl PostPath {
    /// The path of a root post, which is its own root.
    pub fn of_root(id: i64) -> Self {
        Self {
            parents: Vec::new(),
            root: id,
        }
    }

    /// The path of a direct child of the post that owns `self`.
    pub fn child_of(&self, parent_id: i64) -> Self {
        let mut parents = Vec::with_capacity(self.parents.len() + 1);
        parents.extend_from_slice(&self.parents);
        parents.push(parent_id);
        Self {
            parents,
            root: self.root,
        }
    }
}

/// Where a not-yet-inserted post goes in its thread's forest.
///
/// A root post cannot know its `root` until storage assigns its id, so the
/// placement stays symbolic until [`Placement::path_for`] is called with that id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Root,
    Child { parent: i64, path: PostPath },
}

impl Placement {
    /// Encodes the placement of a post whose parent reference is `parent`.
    ///
    /// `parent_path` is the parent's own stored path, looked up in the same
    /// thread. A non-zero parent with no path in that thread is rejected.
    pub fn resolve(parent: i64, parent_path: Option<&PostPath>) -> DomainResult<Self> {
        if parent == 0 {
            return Ok(Placement::Root);
        }
        match parent_path {
            Some(path) => Ok(Placement::Child {
                parent,
                path: path.child_of(parent),
            }),
            None => Err(DomainError::ParentNotFound(parent)),
        }
    }

    pub fn parent(&self) -> i64 {
        match self {
            Placement::Root => 0,
            Placement::Child { parent, .. } => *parent,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Placement::Root)
    }

    /// The final path once the post has been assigned `id`.
    pub fn path_for(&self, id: i64) -> PostPath {
        match self {
            Placement::Root => PostPath::of_root(id),
            Placement::Child { path, .. } => path.clone(),
        }
    }
}

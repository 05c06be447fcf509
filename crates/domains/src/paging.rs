//! # Post pagination
//!
//! A [`PostListing`] is what a client asks for; a [`PagePlan`] is the same
//! request after the `since` cursor has been decoded into a value comparable
//! with the mode's ordering key. Storage adapters translate a plan into their
//! native query. [`PagePlan::select`] is the reference evaluation over an
//! in-memory post set and defines the exact ordering every adapter must match.
//!
//! | mode | unit counted by `limit` | order |
//! |---|---|---|
//! | `Id` (no sort) | post | `id` |
//! | `Flat` | post | `(id, created)` |
//! | `Tree` | post | `parents ++ [id]` lexicographic |
//! | `ParentTree` | root post | roots by `id`, then `(root, parents ++ [id])` |

use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter;

use crate::errors::{DomainError, DomainResult};
use crate::models::Post;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// No `sort` parameter: plain id order.
    #[default]
    Id,
    Flat,
    Tree,
    ParentTree,
}

impl SortMode {
    /// Parses the `sort` query parameter. Absent or unrecognised values fall
    /// back to id order.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("flat") => SortMode::Flat,
            Some("tree") => SortMode::Tree,
            Some("parent_tree") => SortMode::ParentTree,
            _ => SortMode::Id,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Id => "id",
            SortMode::Flat => "flat",
            SortMode::Tree => "tree",
            SortMode::ParentTree => "parent_tree",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn from_desc(desc: bool) -> Self {
        if desc {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    /// Orients an ascending comparison.
    pub fn orient(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }

    /// Whether a candidate that compares to the cursor as `ordering` lies
    /// strictly past it in this direction.
    pub fn is_past(self, ordering: Ordering) -> bool {
        match self {
            Direction::Asc => ordering == Ordering::Greater,
            Direction::Desc => ordering == Ordering::Less,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Strict comparison operator that selects rows past a cursor.
    pub fn past_operator(self) -> &'static str {
        match self {
            Direction::Asc => ">",
            Direction::Desc => "<",
        }
    }
}

/// A post listing request for one thread, as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListing {
    pub sort: SortMode,
    /// `None` (or `Some(0)`) means unbounded.
    pub limit: Option<u32>,
    /// Raw cursor: a post id in every mode.
    pub since: Option<String>,
    pub desc: bool,
}

impl PostListing {
    pub fn direction(&self) -> Direction {
        Direction::from_desc(self.desc)
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }

    /// The post id encoded in `since`, if any.
    pub fn since_id(&self) -> DomainResult<Option<i64>> {
        self.since
            .as_deref()
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    DomainError::Validation(format!("since must be a post id, got {raw:?}"))
                })
            })
            .transpose()
    }
}

/// A decoded `since` value, comparable with the ordering key of its mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// `Id` and `Flat` modes: strict bound on the post id.
    Id(i64),
    /// `Tree` mode: strict bound on `parents ++ [id]`.
    Path(Vec<i64>),
    /// `ParentTree` mode: strict bound on the root id of selected subtrees.
    Root(i64),
}

/// A fully decoded pagination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    mode: SortMode,
    direction: Direction,
    limit: Option<u32>,
    cursor: Option<Cursor>,
}

impl PagePlan {
    pub fn new(mode: SortMode, direction: Direction, limit: Option<u32>) -> Self {
        Self {
            mode,
            direction,
            limit: limit.filter(|limit| *limit > 0),
            cursor: None,
        }
    }

    /// Attaches a cursor; its kind must match the plan's mode.
    pub fn with_cursor(mut self, cursor: Cursor) -> DomainResult<Self> {
        let fits = matches!(
            (self.mode, &cursor),
            (SortMode::Id | SortMode::Flat, Cursor::Id(_))
                | (SortMode::Tree, Cursor::Path(_))
                | (SortMode::ParentTree, Cursor::Root(_))
        );
        if !fits {
            return Err(DomainError::Internal(format!(
                "cursor {cursor:?} does not fit sort mode {}",
                self.mode.as_str()
            )));
        }
        self.cursor = Some(cursor);
        Ok(self)
    }

    pub fn mode(&self) -> SortMode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    fn take(&self) -> usize {
        self.limit.map_or(usize::MAX, |limit| limit as usize)
    }

    fn id_bound(&self) -> Option<i64> {
        match self.cursor {
            Some(Cursor::Id(id)) | Some(Cursor::Root(id)) => Some(id),
            _ => None,
        }
    }

    /// Evaluates the plan over every post of one thread.
    pub fn select(&self, posts: &[Post]) -> Vec<Post> {
        let dir = self.direction;
        match self.mode {
            SortMode::Id | SortMode::Flat => {
                let bound = self.id_bound();
                let mut page: Vec<&Post> = posts
                    .iter()
                    .filter(|post| bound.map_or(true, |b| dir.is_past(post.id.cmp(&b))))
                    .collect();
                page.sort_by(|a, b| {
                    dir.orient(a.id.cmp(&b.id))
                        .then_with(|| a.created.cmp(&b.created))
                });
                page.into_iter().take(self.take()).cloned().collect()
            }
            SortMode::Tree => {
                let bound = match &self.cursor {
                    Some(Cursor::Path(path)) => Some(path.as_slice()),
                    _ => None,
                };
                let mut page: Vec<&Post> = posts
                    .iter()
                    .filter(|post| bound.map_or(true, |b| dir.is_past(cmp_path_with(post, b))))
                    .collect();
                page.sort_by(|a, b| dir.orient(cmp_paths(a, b)));
                page.into_iter().take(self.take()).cloned().collect()
            }
            SortMode::ParentTree => {
                let bound = self.id_bound();
                let mut roots: Vec<&Post> = posts
                    .iter()
                    .filter(|post| post.is_root())
                    .filter(|post| bound.map_or(true, |b| dir.is_past(post.root.cmp(&b))))
                    .collect();
                roots.sort_by(|a, b| dir.orient(a.id.cmp(&b.id)));
                let chosen: HashSet<i64> =
                    roots.iter().take(self.take()).map(|root| root.id).collect();

                let mut page: Vec<&Post> = posts
                    .iter()
                    .filter(|post| chosen.contains(&post.root))
                    .collect();
                // Subtrees follow root order; inside a subtree the path is always ascending.
                page.sort_by(|a, b| dir.orient(a.root.cmp(&b.root)).then_with(|| cmp_paths(a, b)));
                page.into_iter().cloned().collect()
            }
        }
    }
}

fn path_of(post: &Post) -> impl Iterator<Item = &i64> {
    post.parents.iter().chain(iter::once(&post.id))
}

/// Lexicographic comparison of `parents ++ [id]` without allocating.
pub fn cmp_paths(a: &Post, b: &Post) -> Ordering {
    path_of(a).cmp(path_of(b))
}

fn cmp_path_with(post: &Post, path: &[i64]) -> Ordering {
    path_of(post).cmp(path.iter())
}

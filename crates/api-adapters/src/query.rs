//! Query-string shapes of the listing endpoints and their domain forms.

use chrono::{DateTime, Utc};
use domains::{PostListing, Related, SortMode, ThreadListing, UserListing};
use serde::Deserialize;

/// `?limit=&since=&desc=` on `/forum/{slug}/threads`.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadsQuery {
    pub limit: Option<u32>,
    pub since: Option<DateTime<Utc>>,
    pub desc: Option<bool>,
}

impl From<ThreadsQuery> for ThreadListing {
    fn from(q: ThreadsQuery) -> Self {
        ThreadListing {
            limit: q.limit,
            since: q.since,
            desc: q.desc.unwrap_or(false),
        }
    }
}

/// `?limit=&since=&desc=` on `/forum/{slug}/users`; `since` is a nickname.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub limit: Option<u32>,
    pub since: Option<String>,
    pub desc: Option<bool>,
}

impl From<UsersQuery> for UserListing {
    fn from(q: UsersQuery) -> Self {
        UserListing {
            limit: q.limit,
            since: q.since.filter(|since| !since.is_empty()),
            desc: q.desc.unwrap_or(false),
        }
    }
}

/// `?limit=&since=&sort=&desc=` on `/thread/{slug_or_id}/posts`.
#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
    pub limit: Option<u32>,
    pub since: Option<String>,
    pub sort: Option<String>,
    pub desc: Option<bool>,
}

impl From<PostsQuery> for PostListing {
    fn from(q: PostsQuery) -> Self {
        PostListing {
            sort: SortMode::parse(q.sort.as_deref()),
            limit: q.limit,
            since: q.since.filter(|since| !since.is_empty()),
            desc: q.desc.unwrap_or(false),
        }
    }
}

/// `?related=user,forum,thread` on `/post/{id}/details`.
#[derive(Debug, Default, Deserialize)]
pub struct RelatedQuery {
    pub related: Option<String>,
}

impl RelatedQuery {
    pub fn relations(&self) -> Related {
        self.related
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Relation;

    #[test]
    fn posts_query_defaults_to_ascending_id_order() {
        let listing = PostListing::from(PostsQuery::default());
        assert_eq!(listing.sort, SortMode::Id);
        assert!(!listing.desc);
        assert_eq!(listing.since, None);
    }

    #[test]
    fn empty_since_is_no_cursor() {
        let listing = PostListing::from(PostsQuery {
            since: Some(String::new()),
            sort: Some("parent_tree".into()),
            ..Default::default()
        });
        assert_eq!(listing.since, None);
        assert_eq!(listing.sort, SortMode::ParentTree);
    }

    #[test]
    fn related_query_parses_relations() {
        let related = RelatedQuery {
            related: Some("user,forum".into()),
        }
        .relations();
        assert!(related.contains(Relation::User));
        assert!(related.contains(Relation::Forum));
        assert!(!related.contains(Relation::Thread));
        assert_eq!(RelatedQuery::default().relations(), Related::none());
    }
}

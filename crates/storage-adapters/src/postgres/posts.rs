//! Post reads and the SQL rendering of a [`PagePlan`].

use async_trait::async_trait;
use domains::{Cursor, DomainResult, PagePlan, Post, PostRepository, SortMode};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use super::rows::{PostRow, POST_COLUMNS};
use super::{db_err, PgStore};

/// Renders `plan` for the posts of `thread`.
///
/// `parent_tree` selects `limit` root ids in a subquery and returns every post
/// under them; the other modes filter and order the thread's posts directly.
pub(crate) fn page_query(thread: i64, plan: &PagePlan) -> QueryBuilder<'static, Postgres> {
    let dir = plan.direction();
    let mut builder = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE "));

    match plan.mode() {
        SortMode::Id | SortMode::Flat => {
            builder.push("thread_id = ").push_bind(thread);
            if let Some(Cursor::Id(since)) = plan.cursor() {
                builder
                    .push(format!(" AND id {} ", dir.past_operator()))
                    .push_bind(*since);
            }
            builder.push(format!(" ORDER BY id {}", dir.sql()));
            if plan.mode() == SortMode::Flat {
                builder.push(", created");
            }
            push_limit(&mut builder, plan.limit());
        }
        SortMode::Tree => {
            builder.push("thread_id = ").push_bind(thread);
            if let Some(Cursor::Path(path)) = plan.cursor() {
                builder
                    .push(format!(
                        " AND array_append(parents, id) {} ",
                        dir.past_operator()
                    ))
                    .push_bind(path.clone())
                    .push("::BIGINT[]");
            }
            builder.push(format!(" ORDER BY array_append(parents, id) {}", dir.sql()));
            push_limit(&mut builder, plan.limit());
        }
        SortMode::ParentTree => {
            builder
                .push("root IN (SELECT id FROM posts WHERE thread_id = ")
                .push_bind(thread)
                .push(" AND parent = 0");
            if let Some(Cursor::Root(since)) = plan.cursor() {
                builder
                    .push(format!(" AND id {} ", dir.past_operator()))
                    .push_bind(*since);
            }
            builder.push(format!(" ORDER BY id {}", dir.sql()));
            push_limit(&mut builder, plan.limit());
            builder.push(format!(
                ") ORDER BY root {}, array_append(parents, id) ASC",
                dir.sql()
            ));
        }
    }
    builder
}

fn push_limit(builder: &mut QueryBuilder<'static, Postgres>, limit: Option<u32>) {
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn find(&self, id: i64) -> DomainResult<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(Post::from))
    }

    async fn path_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<Vec<i64>>> {
        sqlx::query_scalar(
            "SELECT array_append(parents, id) FROM posts WHERE thread_id = $1 AND id = $2",
        )
        .bind(thread)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn root_in_thread(&self, thread: i64, id: i64) -> DomainResult<Option<i64>> {
        sqlx::query_scalar("SELECT root FROM posts WHERE thread_id = $1 AND id = $2")
            .bind(thread)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn page(&self, thread: i64, plan: &PagePlan) -> DomainResult<Vec<Post>> {
        let mut builder = page_query(thread, plan);
        debug!(sql = builder.sql(), "post page query");
        let rows: Vec<PostRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

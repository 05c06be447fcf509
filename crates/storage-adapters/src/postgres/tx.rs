//! The unit of work behind post batches, post edits and votes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DomainError, DomainResult, PlacedPost, Placement, Post, PostPath, StoreTx, Thread, ThreadKey,
    ThreadRef, User, Vote,
};
use sqlx::{Postgres, Transaction};

use super::catalog::THREAD_REF_MATCH;
use super::db_err;
use super::rows::{
    PathRow, PostRow, ThreadRow, UserRow, VoteRow, POST_COLUMNS, THREAD_COLUMNS, USER_COLUMNS,
};

/// Root posts allocate their id first so `root` can be set to it in the same
/// statement.
const INSERT_ROOT: &str = "WITH next AS (SELECT nextval(pg_get_serial_sequence('posts', 'id')) AS id) \
     INSERT INTO posts (id, thread_id, forum, author, message, created, parent, parents, root) \
     SELECT next.id, $1, $2, $3, $4, $5, 0, '{}', next.id FROM next \
     RETURNING id";

const INSERT_CHILD: &str = "INSERT INTO posts (thread_id, forum, author, message, created, parent, parents, root) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
     RETURNING id";

/// An open transaction. Dropping it without [`StoreTx::commit`] rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn thread_key(&mut self, thread: &ThreadRef) -> DomainResult<Option<ThreadKey>> {
        let row: Option<(i64, String)> = sqlx::query_as(&format!(
            "SELECT id, forum FROM threads WHERE {THREAD_REF_MATCH}"
        ))
        .bind(thread.as_id())
        .bind(thread.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(|(id, forum)| ThreadKey { id, forum }))
    }

    async fn users_by_nickname(&mut self, nicknames: &[String]) -> DomainResult<Vec<User>> {
        let lowered: Vec<String> = nicknames.iter().map(|n| n.to_lowercase()).collect();
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(nickname) = ANY($1)"
        ))
        .bind(lowered)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn post_paths(
        &mut self,
        thread: i64,
        ids: &[i64],
    ) -> DomainResult<HashMap<i64, PostPath>> {
        let rows: Vec<PathRow> = sqlx::query_as(
            "SELECT id, parents, root FROM posts WHERE thread_id = $1 AND id = ANY($2)",
        )
        .bind(thread)
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(<(i64, PostPath)>::from).collect())
    }

    async fn insert_posts(
        &mut self,
        thread: &ThreadKey,
        created: DateTime<Utc>,
        posts: &[PlacedPost],
    ) -> DomainResult<Vec<Post>> {
        let mut inserted = Vec::with_capacity(posts.len());
        for placed in posts {
            let id: i64 = match &placed.placement {
                Placement::Root => sqlx::query_scalar(INSERT_ROOT)
                    .bind(thread.id)
                    .bind(&thread.forum)
                    .bind(&placed.author)
                    .bind(&placed.message)
                    .bind(created)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(db_err)?,
                Placement::Child { parent, path } => sqlx::query_scalar(INSERT_CHILD)
                    .bind(thread.id)
                    .bind(&thread.forum)
                    .bind(&placed.author)
                    .bind(&placed.message)
                    .bind(created)
                    .bind(*parent)
                    .bind(&path.parents)
                    .bind(path.root)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(db_err)?,
            };

            let path = placed.placement.path_for(id);
            inserted.push(Post {
                id,
                message: placed.message.clone(),
                created,
                is_edited: false,
                author: placed.author.clone(),
                thread: thread.id,
                forum: thread.forum.clone(),
                parent: placed.placement.parent(),
                parents: path.parents,
                root: path.root,
            });
        }
        Ok(inserted)
    }

    async fn add_forum_posts(&mut self, forum: &str, count: i64) -> DomainResult<()> {
        sqlx::query("UPDATE forums SET posts = posts + $2 WHERE slug = $1")
            .bind(forum)
            .bind(count)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn add_forum_members(&mut self, forum: &str, nicknames: &[String]) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO forum_users (forum, nickname) \
             SELECT $1, UNNEST($2::TEXT[]) ON CONFLICT DO NOTHING",
        )
        .bind(forum)
        .bind(nicknames)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn post_for_update(&mut self, id: i64) -> DomainResult<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(Post::from))
    }

    async fn set_message(&mut self, id: i64, message: &str) -> DomainResult<()> {
        let result = sqlx::query("UPDATE posts SET message = $2, is_edited = TRUE WHERE id = $1")
            .bind(id)
            .bind(message)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::post_not_found(id));
        }
        Ok(())
    }

    /// Locks the thread row first so concurrent votes on one thread apply
    /// their deltas one after another.
    async fn find_vote(&mut self, nickname: &str, thread: i64) -> DomainResult<Option<Vote>> {
        sqlx::query("SELECT 1 FROM threads WHERE id = $1 FOR UPDATE")
            .bind(thread)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        let row: Option<VoteRow> = sqlx::query_as(
            "SELECT nickname, thread_id, up FROM votes WHERE nickname = $1 AND thread_id = $2",
        )
        .bind(nickname)
        .bind(thread)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(Vote::from))
    }

    async fn save_vote(&mut self, vote: &Vote) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO votes (nickname, thread_id, up) VALUES ($1, $2, $3) \
             ON CONFLICT (nickname, thread_id) DO UPDATE SET up = EXCLUDED.up",
        )
        .bind(&vote.nickname)
        .bind(vote.thread)
        .bind(vote.voice.is_up())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn add_thread_votes(&mut self, thread: i64, delta: i64) -> DomainResult<Thread> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!(
            "UPDATE threads SET votes = votes + $2 WHERE id = $1 RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(Thread::from)
            .ok_or_else(|| DomainError::thread_not_found(thread.to_string()))
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}

//! Users, forums and threads.

use async_trait::async_trait;
use domains::{
    DomainResult, Forum, ForumRepository, Insertion, NewForum, NewThread, Thread, ThreadListing,
    ThreadRef, ThreadRepository, ThreadUpdate, User, UserListing, UserRepository, UserUpdate,
};
use sqlx::{Postgres, QueryBuilder};

use super::rows::{ForumRow, ThreadRow, UserRow, FORUM_COLUMNS, THREAD_COLUMNS, USER_COLUMNS};
use super::{db_err, PgStore};

/// `WHERE` clause matching a thread reference by id or case-insensitive slug.
/// Binds `$1` to the numeric reading (possibly NULL) and `$2` to the text.
pub(crate) const THREAD_REF_MATCH: &str =
    "(id = $1 OR lower(slug) = lower($2)) ORDER BY (id IS NOT DISTINCT FROM $1) DESC LIMIT 1";

fn push_limit(builder: &mut QueryBuilder<'_, Postgres>, limit: Option<u32>) {
    if let Some(limit) = limit.filter(|l| *l > 0) {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }
}

/// Members of forum `slug`, ordered by nickname byte-wise after lowercasing.
pub(crate) fn members_query(slug: &str, listing: &UserListing) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT u.nickname, u.fullname, u.email, u.about \
         FROM forum_users fu JOIN users u ON u.nickname = fu.nickname \
         WHERE fu.forum = ",
    );
    builder.push_bind(slug.to_owned());
    if let Some(since) = &listing.since {
        builder
            .push(if listing.desc {
                " AND lower(u.nickname) COLLATE \"C\" < lower("
            } else {
                " AND lower(u.nickname) COLLATE \"C\" > lower("
            })
            .push_bind(since.clone())
            .push(") COLLATE \"C\"");
    }
    builder.push(if listing.desc {
        " ORDER BY lower(u.nickname) COLLATE \"C\" DESC"
    } else {
        " ORDER BY lower(u.nickname) COLLATE \"C\" ASC"
    });
    push_limit(&mut builder, listing.limit);
    builder
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: &User) -> DomainResult<Insertion<User, Vec<User>>> {
        let inserted: Option<UserRow> = sqlx::query_as(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4) \
             ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.nickname)
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.about)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = inserted {
            return Ok(Insertion::Created(row.into()));
        }

        let clashes: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(nickname) = lower($1) OR lower(email) = lower($2)"
        ))
        .bind(&user.nickname)
        .bind(&user.email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(Insertion::Existing(
            clashes.into_iter().map(User::from).collect(),
        ))
    }

    async fn find(&self, nickname: &str) -> DomainResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(nickname) = lower($1)"
        ))
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn update(&self, nickname: &str, update: &UserUpdate) -> DomainResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
               fullname = COALESCE($2, fullname), \
               email    = COALESCE($3, email), \
               about    = COALESCE($4, about) \
             WHERE lower(nickname) = lower($1) RETURNING {USER_COLUMNS}"
        ))
        .bind(nickname)
        .bind(update.fullname.as_deref())
        .bind(update.email.as_deref())
        .bind(update.about.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl ForumRepository for PgStore {
    async fn create(&self, forum: &NewForum) -> DomainResult<Insertion<Forum>> {
        let inserted: Option<ForumRow> = sqlx::query_as(&format!(
            "INSERT INTO forums (slug, title, owner) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING RETURNING {FORUM_COLUMNS}"
        ))
        .bind(&forum.slug)
        .bind(&forum.title)
        .bind(&forum.user)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match inserted {
            Some(row) => Ok(Insertion::Created(row.into())),
            None => {
                let existing = ForumRepository::find(self, &forum.slug).await?.ok_or_else(|| {
                    domains::DomainError::internal(format!(
                        "forum {} conflicted but cannot be read back",
                        forum.slug
                    ))
                })?;
                Ok(Insertion::Existing(existing))
            }
        }
    }

    async fn find(&self, slug: &str) -> DomainResult<Option<Forum>> {
        let row: Option<ForumRow> = sqlx::query_as(&format!(
            "SELECT {FORUM_COLUMNS} FROM forums WHERE lower(slug) = lower($1)"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Forum::from))
    }

    async fn members(&self, slug: &str, listing: &UserListing) -> DomainResult<Vec<User>> {
        let mut builder = members_query(slug, listing);
        let rows: Vec<UserRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    /// Inserts the thread, bumps the forum thread counter and records the
    /// author as a forum member in one transaction.
    async fn create(&self, thread: &NewThread) -> DomainResult<Insertion<Thread>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // 1. Insert unless the slug is taken
        let inserted: Option<ThreadRow> = sqlx::query_as(&format!(
            "INSERT INTO threads (slug, title, message, forum, author, created) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, now())) \
             ON CONFLICT DO NOTHING RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread.slug.as_deref())
        .bind(&thread.title)
        .bind(&thread.message)
        .bind(&thread.forum)
        .bind(&thread.author)
        .bind(thread.created)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = inserted else {
            let existing: ThreadRow = sqlx::query_as(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE lower(slug) = lower($1)"
            ))
            .bind(thread.slug.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            return Ok(Insertion::Existing(existing.into()));
        };

        // 2. Forum aggregates
        sqlx::query("UPDATE forums SET threads = threads + 1 WHERE slug = $1")
            .bind(&row.forum)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query(
            "INSERT INTO forum_users (forum, nickname) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(&row.forum)
        .bind(&row.author)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Insertion::Created(row.into()))
    }

    async fn find(&self, thread: &ThreadRef) -> DomainResult<Option<Thread>> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE {THREAD_REF_MATCH}"
        ))
        .bind(thread.as_id())
        .bind(thread.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Thread::from))
    }

    async fn update(
        &self,
        thread: &ThreadRef,
        update: &ThreadUpdate,
    ) -> DomainResult<Option<Thread>> {
        let row: Option<ThreadRow> = sqlx::query_as(&format!(
            "UPDATE threads SET \
               title   = COALESCE($3, title), \
               message = COALESCE($4, message) \
             WHERE id = (SELECT id FROM threads WHERE {THREAD_REF_MATCH}) \
             RETURNING {THREAD_COLUMNS}"
        ))
        .bind(thread.as_id())
        .bind(thread.as_str())
        .bind(update.title.as_deref())
        .bind(update.message.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Thread::from))
    }

    async fn list_by_forum(
        &self,
        forum: &str,
        listing: &ThreadListing,
    ) -> DomainResult<Vec<Thread>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {THREAD_COLUMNS} FROM threads WHERE forum = "));
        builder.push_bind(forum);
        if let Some(since) = listing.since {
            builder
                .push(if listing.desc {
                    " AND created <= "
                } else {
                    " AND created >= "
                })
                .push_bind(since);
        }
        builder.push(if listing.desc {
            " ORDER BY created DESC, id DESC"
        } else {
            " ORDER BY created ASC, id ASC"
        });
        push_limit(&mut builder, listing.limit);

        let rows: Vec<ThreadRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Thread::from).collect())
    }
}

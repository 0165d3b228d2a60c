use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Connection, Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use shared::{
    domain::{join_tags, parse_tags, validate_post_fields, Author, Post, PostId, UserId},
    error::{BlogError, BlogResult, StorageResultExt},
};

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.created_at, p.tags, p.user_id, u.username
     FROM posts p
     LEFT JOIN users u ON u.id = p.user_id";

/// Timestamp layout written by older builds of the app, read back as UTC.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Matches exactly what [`encode_timestamp`] writes.
const CURRENT_TIMESTAMP_GLOB: &str = "????-??-??T??:??:??.??????Z";

/// Persistence operations the view controller relies on.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(
        &self,
        title: &str,
        content: &str,
        tags: &[String],
        author: Option<UserId>,
    ) -> BlogResult<Post>;
    async fn list_posts(&self) -> BlogResult<Vec<Post>>;
    async fn list_posts_by_author(&self, author: UserId) -> BlogResult<Vec<Post>>;
    async fn get_post(&self, post_id: PostId) -> BlogResult<Post>;
    async fn update_post(&self, post_id: PostId, title: &str, content: &str) -> BlogResult<Post>;
    async fn delete_post(&self, post_id: PostId) -> BlogResult<()>;
}

/// SQLite-backed post store.
///
/// The pool holds at most one connection. Every operation checks it out for
/// its own duration and mutations run in a transaction that rolls back when
/// dropped without a commit.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    /// Opens (creating if needed) the database at `database_url` and brings
    /// its schema up to date. Safe to call repeatedly against the same file.
    pub async fn new(database_url: &str) -> BlogResult<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .storage_context("invalid sqlite database url")?
            .create_if_missing(true);
        // An in-memory database lives only as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(connect_options)
            .await
            .storage_context("failed to open sqlite database")?;

        let storage = Self { pool };
        storage.rebuild_legacy_tables().await?;
        sqlx::migrate!("./migrations")
            .run(&storage.pool)
            .await
            .storage_context("failed to apply schema migrations")?;
        storage.ensure_post_columns().await?;
        storage.normalize_legacy_timestamps().await?;
        tracing::debug!(database_url, "post store ready");
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> BlogResult<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .storage_context("sqlite ping failed")?;
        Ok(())
    }

    /// The account-aware releases kept a `password` column on `users` and
    /// required an author on every post. Both tables are rebuilt into the
    /// current shape before migrations run; the rest of the schema history is
    /// handled by [`Self::ensure_post_columns`].
    async fn rebuild_legacy_tables(&self) -> BlogResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .storage_context("failed to acquire connection")?;

        let users = table_columns(&mut conn, "users").await?;
        let posts = table_columns(&mut conn, "posts").await?;
        let users_have_passwords = users.iter().any(|column| column.name == "password");
        let posts_require_author = posts
            .iter()
            .any(|column| column.name == "user_id" && column.not_null);
        if !users_have_passwords && !posts_require_author {
            return Ok(());
        }
        let posts_exist = !posts.is_empty();
        let posts_have_tags = posts.iter().any(|column| column.name == "tags");

        tracing::info!(
            users_have_passwords,
            posts_require_author,
            "rebuilding legacy blog tables"
        );
        // Table swaps must not cascade or trip constraints mid-rebuild.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .storage_context("failed to disable foreign keys")?;
        let rebuilt = rebuild_tables(
            &mut conn,
            users_have_passwords,
            posts_require_author,
            posts_exist,
            posts_have_tags,
        )
        .await;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await
            .storage_context("failed to re-enable foreign keys")?;
        rebuilt
    }

    /// Databases written by the first releases have a bare `posts` table with
    /// no `tags` or `user_id` column.
    async fn ensure_post_columns(&self) -> BlogResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .storage_context("failed to acquire connection")?;

        let columns = table_columns(&mut conn, "posts").await?;
        let has_tags = columns.iter().any(|column| column.name == "tags");
        let has_user_id = columns.iter().any(|column| column.name == "user_id");

        if !has_tags {
            tracing::info!("adding tags column to legacy posts table");
            sqlx::query("ALTER TABLE posts ADD COLUMN tags TEXT")
                .execute(&mut *conn)
                .await
                .storage_context("failed adding tags column to posts")?;
        }

        if !has_user_id {
            tracing::info!("adding user_id column to legacy posts table");
            sqlx::query("ALTER TABLE posts ADD COLUMN user_id INTEGER REFERENCES users (id)")
                .execute(&mut *conn)
                .await
                .storage_context("failed adding user_id column to posts")?;
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts (user_id)")
            .execute(&mut *conn)
            .await
            .storage_context("failed to ensure posts author index")?;

        Ok(())
    }

    /// Rewrites `created_at` values in any older layout into the current one
    /// so that ordering by the column text stays chronological.
    async fn normalize_legacy_timestamps(&self) -> BlogResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .storage_context("failed to begin transaction")?;

        let rows = sqlx::query("SELECT id, created_at FROM posts WHERE created_at NOT GLOB ?")
            .bind(CURRENT_TIMESTAMP_GLOB)
            .fetch_all(&mut *tx)
            .await
            .storage_context("failed to scan post timestamps")?;
        if rows.is_empty() {
            return Ok(());
        }

        let mut rewritten = 0usize;
        for row in &rows {
            let post_id: i64 = row.try_get(0).storage_context("failed to read post id")?;
            let raw: String = row
                .try_get(1)
                .storage_context("failed to read post timestamp")?;
            let created_at = match decode_timestamp(&raw) {
                Ok(created_at) => created_at,
                Err(err) => {
                    tracing::warn!(post_id, raw = %raw, error = %err, "leaving unreadable post timestamp as is");
                    continue;
                }
            };
            sqlx::query("UPDATE posts SET created_at = ? WHERE id = ?")
                .bind(encode_timestamp(created_at))
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .storage_context("failed to rewrite post timestamp")?;
            rewritten += 1;
        }

        tx.commit()
            .await
            .storage_context("failed to commit timestamp rewrite")?;
        tracing::info!(rewritten, "normalized legacy post timestamps");
        Ok(())
    }

    pub async fn create_user(&self, username: &str) -> BlogResult<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (username) VALUES (?)
             ON CONFLICT(username) DO UPDATE SET username=excluded.username
             RETURNING id",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .storage_context("failed to upsert user")?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn username_for_user(&self, user_id: UserId) -> BlogResult<Option<String>> {
        let row = sqlx::query("SELECT username FROM users WHERE id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .storage_context("failed to load user")?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn find_user(&self, username: &str) -> BlogResult<Option<UserId>> {
        let row = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .storage_context("failed to look up user")?;
        Ok(row.map(|r| UserId(r.get::<i64, _>(0))))
    }

    pub async fn post_count(&self) -> BlogResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .storage_context("failed to count posts")
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        tags: &[String],
        author: Option<UserId>,
    ) -> BlogResult<Post> {
        let fields = validate_post_fields(title, content)?;
        let created_at = encode_timestamp(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .storage_context("failed to begin transaction")?;
        let post_id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (title, content, created_at, tags, user_id)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(&created_at)
        .bind(join_tags(tags))
        .bind(author.map(|id| id.0))
        .fetch_one(&mut *tx)
        .await
        .storage_context("failed to insert post")?;

        let post_id = PostId(post_id);
        let post = select_post(&mut *tx, post_id)
            .await?
            .ok_or(BlogError::NotFound(post_id))?;
        tx.commit()
            .await
            .storage_context("failed to commit new post")?;

        tracing::info!(post_id = post.id.0, "post created");
        Ok(post)
    }

    pub async fn list_posts(&self) -> BlogResult<Vec<Post>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .storage_context("failed to acquire connection")?;
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS}
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&mut *conn)
        .await
        .storage_context("failed to list posts")?;
        rows.iter().map(post_from_row).collect()
    }

    pub async fn list_posts_by_author(&self, author: UserId) -> BlogResult<Vec<Post>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .storage_context("failed to acquire connection")?;
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS}
             WHERE p.user_id = ?
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(author.0)
        .fetch_all(&mut *conn)
        .await
        .storage_context("failed to list posts for author")?;
        rows.iter().map(post_from_row).collect()
    }

    pub async fn get_post(&self, post_id: PostId) -> BlogResult<Post> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .storage_context("failed to acquire connection")?;
        select_post(&mut *conn, post_id)
            .await?
            .ok_or(BlogError::NotFound(post_id))
    }

    pub async fn update_post(
        &self,
        post_id: PostId,
        title: &str,
        content: &str,
    ) -> BlogResult<Post> {
        let fields = validate_post_fields(title, content)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .storage_context("failed to begin transaction")?;
        let result = sqlx::query("UPDATE posts SET title = ?, content = ? WHERE id = ?")
            .bind(&fields.title)
            .bind(&fields.content)
            .bind(post_id.0)
            .execute(&mut *tx)
            .await
            .storage_context("failed to update post")?;
        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound(post_id));
        }

        let post = select_post(&mut *tx, post_id)
            .await?
            .ok_or(BlogError::NotFound(post_id))?;
        tx.commit()
            .await
            .storage_context("failed to commit post update")?;

        tracing::info!(post_id = post_id.0, "post updated");
        Ok(post)
    }

    /// Removes a post. A missing id is reported as [`BlogError::NotFound`],
    /// the same as for reads and updates.
    pub async fn delete_post(&self, post_id: PostId) -> BlogResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .storage_context("failed to begin transaction")?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id.0)
            .execute(&mut *tx)
            .await
            .storage_context("failed to delete post")?;
        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound(post_id));
        }
        tx.commit()
            .await
            .storage_context("failed to commit post deletion")?;

        tracing::info!(post_id = post_id.0, "post deleted");
        Ok(())
    }
}

#[async_trait]
impl PostStore for Storage {
    async fn create_post(
        &self,
        title: &str,
        content: &str,
        tags: &[String],
        author: Option<UserId>,
    ) -> BlogResult<Post> {
        Storage::create_post(self, title, content, tags, author).await
    }

    async fn list_posts(&self) -> BlogResult<Vec<Post>> {
        Storage::list_posts(self).await
    }

    async fn list_posts_by_author(&self, author: UserId) -> BlogResult<Vec<Post>> {
        Storage::list_posts_by_author(self, author).await
    }

    async fn get_post(&self, post_id: PostId) -> BlogResult<Post> {
        Storage::get_post(self, post_id).await
    }

    async fn update_post(&self, post_id: PostId, title: &str, content: &str) -> BlogResult<Post> {
        Storage::update_post(self, post_id, title, content).await
    }

    async fn delete_post(&self, post_id: PostId) -> BlogResult<()> {
        Storage::delete_post(self, post_id).await
    }
}

struct TableColumn {
    name: String,
    not_null: bool,
}

/// Columns of `table`, empty when the table does not exist.
async fn table_columns(conn: &mut SqliteConnection, table: &str) -> BlogResult<Vec<TableColumn>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(&mut *conn)
        .await
        .storage_context("failed to inspect table schema")?;
    rows.iter()
        .map(|row| -> BlogResult<TableColumn> {
            Ok(TableColumn {
                name: row
                    .try_get("name")
                    .storage_context("failed to read table schema")?,
                not_null: row
                    .try_get::<i64, _>("notnull")
                    .storage_context("failed to read table schema")?
                    != 0,
            })
        })
        .collect()
}

async fn rebuild_tables(
    conn: &mut SqliteConnection,
    users_have_passwords: bool,
    posts_require_author: bool,
    posts_exist: bool,
    posts_have_tags: bool,
) -> BlogResult<()> {
    let mut tx = conn
        .begin()
        .await
        .storage_context("failed to begin transaction")?;

    if users_have_passwords {
        merge_duplicate_usernames(&mut tx, posts_exist).await?;
        let sequence = table_sequence(&mut tx, "users").await?;
        for statement in [
            "CREATE TABLE users_rebuilt (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL
            )",
            "INSERT INTO users_rebuilt (id, username) SELECT id, username FROM users",
            "DROP TABLE users",
            "ALTER TABLE users_rebuilt RENAME TO users",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .storage_context("failed to rebuild users table")?;
        }
        restore_table_sequence(&mut tx, "users", sequence).await?;
    }

    if posts_require_author {
        let sequence = table_sequence(&mut tx, "posts").await?;
        let tags = if posts_have_tags { "tags" } else { "NULL" };
        let copy_rows = format!(
            "INSERT INTO posts_rebuilt (id, title, content, created_at, tags, user_id)
             SELECT id, title, content, created_at, {tags}, user_id FROM posts"
        );
        for statement in [
            "CREATE TABLE posts_rebuilt (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL,
                tags       TEXT,
                user_id    INTEGER REFERENCES users (id)
            )",
            copy_rows.as_str(),
            "DROP TABLE posts",
            "ALTER TABLE posts_rebuilt RENAME TO posts",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .storage_context("failed to rebuild posts table")?;
        }
        restore_table_sequence(&mut tx, "posts", sequence).await?;
    }

    tx.commit()
        .await
        .storage_context("failed to commit legacy table rebuild")
}

/// Folds users sharing a username into the lowest id so the unique index on
/// `users.username` can be built. Their posts move along.
async fn merge_duplicate_usernames(conn: &mut SqliteConnection, posts_exist: bool) -> BlogResult<()> {
    if posts_exist {
        sqlx::query(
            "UPDATE posts
             SET user_id = (
                 SELECT MIN(keeper.id) FROM users keeper
                 JOIN users dup ON dup.username = keeper.username
                 WHERE dup.id = posts.user_id
             )
             WHERE user_id IN (
                 SELECT id FROM users WHERE id NOT IN (SELECT MIN(id) FROM users GROUP BY username)
             )",
        )
        .execute(&mut *conn)
        .await
        .storage_context("failed to reassign posts of duplicate users")?;
    }

    let removed = sqlx::query(
        "DELETE FROM users WHERE id NOT IN (SELECT MIN(id) FROM users GROUP BY username)",
    )
    .execute(&mut *conn)
    .await
    .storage_context("failed to remove duplicate users")?;

    if removed.rows_affected() > 0 {
        tracing::warn!(
            merged_users = removed.rows_affected(),
            "merged legacy users sharing a username"
        );
    }
    Ok(())
}

/// Highest id ever handed out for an AUTOINCREMENT table.
async fn table_sequence(conn: &mut SqliteConnection, table: &str) -> BlogResult<Option<i64>> {
    sqlx::query_scalar("SELECT seq FROM sqlite_sequence WHERE name = ?")
        .bind(table)
        .fetch_optional(&mut *conn)
        .await
        .storage_context("failed to read id sequence")
}

/// Keeps ids of deleted rows from being reissued after a table swap.
async fn restore_table_sequence(
    conn: &mut SqliteConnection,
    table: &str,
    sequence: Option<i64>,
) -> BlogResult<()> {
    let Some(sequence) = sequence else {
        return Ok(());
    };
    let updated = sqlx::query("UPDATE sqlite_sequence SET seq = MAX(seq, ?) WHERE name = ?")
        .bind(sequence)
        .bind(table)
        .execute(&mut *conn)
        .await
        .storage_context("failed to restore id sequence")?;
    if updated.rows_affected() == 0 {
        sqlx::query("INSERT INTO sqlite_sequence (name, seq) VALUES (?, ?)")
            .bind(table)
            .bind(sequence)
            .execute(&mut *conn)
            .await
            .storage_context("failed to restore id sequence")?;
    }
    Ok(())
}

async fn select_post(conn: &mut SqliteConnection, post_id: PostId) -> BlogResult<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} WHERE p.id = ?"))
        .bind(post_id.0)
        .fetch_optional(&mut *conn)
        .await
        .storage_context("failed to load post")?;
    row.as_ref().map(post_from_row).transpose()
}

fn post_from_row(row: &SqliteRow) -> BlogResult<Post> {
    let created_at: String = row
        .try_get(3)
        .storage_context("failed to read post timestamp")?;
    let tags: Option<String> = row.try_get(4).storage_context("failed to read post tags")?;
    let user_id: Option<i64> = row.try_get(5).storage_context("failed to read post author")?;
    let username: Option<String> = row
        .try_get(6)
        .storage_context("failed to read post author")?;

    Ok(Post {
        id: PostId(row.try_get(0).storage_context("failed to read post id")?),
        title: row.try_get(1).storage_context("failed to read post title")?,
        content: row
            .try_get(2)
            .storage_context("failed to read post content")?,
        created_at: decode_timestamp(&created_at)?,
        tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
        author: user_id.zip(username).map(|(id, username)| Author {
            id: UserId(id),
            username,
        }),
    })
}

/// Fixed-width RFC 3339 so that text ordering in SQL matches time ordering.
fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> BlogResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .storage_context("malformed post timestamp")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> BlogResult<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).storage_context("failed to create database directory")?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

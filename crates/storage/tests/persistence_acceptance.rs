use chrono::Utc;
use shared::error::ErrorCode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use storage::Storage;

fn database_url(dir: &tempfile::TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

#[tokio::test]
async fn creates_database_file_and_parent_dir_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("blog.db");
    let url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&url).await.expect("db");
    storage.pool().close().await;

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn reopening_existing_file_keeps_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir, "blog.db");

    let first = Storage::new(&url).await.expect("first open");
    let post = first
        .create_post("persisted", "across restarts", &[], None)
        .await
        .expect("create");
    first.pool().close().await;

    let second = Storage::new(&url).await.expect("second open");
    second.pool().close().await;
    let third = Storage::new(&url).await.expect("third open");

    let posts = third.list_posts().await.expect("list");
    assert_eq!(posts, vec![post]);
}

#[tokio::test]
async fn upgrades_legacy_posts_table_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir, "legacy.db");

    let legacy_options = SqliteConnectOptions::new()
        .filename(dir.path().join("legacy.db"))
        .create_if_missing(true);
    let legacy = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(legacy_options)
        .await
        .expect("legacy db");
    sqlx::query(
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&legacy)
    .await
    .expect("legacy schema");
    sqlx::query("INSERT INTO posts (title, content, created_at) VALUES (?, ?, ?)")
        .bind("Viejo")
        .bind("Contenido")
        .bind("2024-05-01 10:00:00")
        .execute(&legacy)
        .await
        .expect("legacy row");
    legacy.close().await;

    let storage = Storage::new(&url).await.expect("upgrade");
    let fresh = storage
        .create_post("Nuevo", "Contenido", &["tag".to_string()], None)
        .await
        .expect("create after upgrade");

    let posts = storage.list_posts().await.expect("list");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, fresh.id);
    assert_eq!(posts[1].title, "Viejo");
    assert_eq!(posts[1].created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    assert!(posts[1].tags.is_empty());
    assert_eq!(posts[0].tags, vec!["tag"]);
}

#[tokio::test]
async fn create_update_delete_round_trip_on_empty_store() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");

    let post = storage
        .create_post("Hola", "Mundo", &[], None)
        .await
        .expect("create");
    let listed = storage.list_posts().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Hola");

    storage
        .update_post(post.id, "Hola2", "Mundo")
        .await
        .expect("update");
    assert_eq!(storage.get_post(post.id).await.expect("get").title, "Hola2");

    storage.delete_post(post.id).await.expect("delete");
    assert!(storage.list_posts().await.expect("list").is_empty());
    assert_eq!(
        storage
            .get_post(post.id)
            .await
            .expect_err("deleted")
            .code(),
        ErrorCode::NotFound
    );
}

async fn legacy_pool(dir: &tempfile::TempDir, name: &str) -> sqlx::SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join(name))
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("legacy db")
}

#[tokio::test]
async fn legacy_timestamps_sort_chronologically_with_new_posts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir, "legacy.db");
    let end_of_today = format!("{} 23:59:59", Utc::now().format("%Y-%m-%d"));

    let legacy = legacy_pool(&dir, "legacy.db").await;
    sqlx::query(
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&legacy)
    .await
    .expect("legacy schema");
    sqlx::query("INSERT INTO posts (title, content, created_at) VALUES (?, ?, ?)")
        .bind("legacy-later")
        .bind("written late tonight")
        .bind(&end_of_today)
        .execute(&legacy)
        .await
        .expect("legacy row");
    legacy.close().await;

    let storage = Storage::new(&url).await.expect("upgrade");
    storage
        .create_post("new-now", "written just now", &[], None)
        .await
        .expect("create");

    let titles: Vec<String> = storage
        .list_posts()
        .await
        .expect("list")
        .into_iter()
        .map(|post| post.title)
        .collect();
    assert_eq!(titles, vec!["legacy-later", "new-now"]);

    let stored: String = sqlx::query_scalar("SELECT created_at FROM posts WHERE title = ?")
        .bind("legacy-later")
        .fetch_one(storage.pool())
        .await
        .expect("raw timestamp");
    assert_eq!(stored, format!("{}.000000Z", end_of_today.replace(' ', "T")));
}

#[tokio::test]
async fn upgrades_account_schema_with_required_authors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir, "accounts.db");

    let legacy = legacy_pool(&dir, "accounts.db").await;
    for statement in [
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            tags TEXT,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        "INSERT INTO users (username, password) VALUES ('alice', 'secret')",
        "INSERT INTO users (username, password) VALUES ('alice', 'again')",
        "INSERT INTO posts (title, content, user_id, created_at, tags)
         VALUES ('Primero', 'Hola', 2, '2024-05-01 10:00:00.500000', 'viejo')",
        "INSERT INTO posts (title, content, user_id, created_at)
         VALUES ('Borrado', 'Adios', 1, '2024-05-02 10:00:00')",
        "DELETE FROM posts WHERE title = 'Borrado'",
    ] {
        sqlx::query(statement)
            .execute(&legacy)
            .await
            .expect("legacy statement");
    }
    legacy.close().await;

    let storage = Storage::new(&url).await.expect("upgrade");

    let legacy_posts = storage.list_posts().await.expect("list");
    assert_eq!(legacy_posts.len(), 1);
    assert_eq!(legacy_posts[0].title, "Primero");
    assert_eq!(legacy_posts[0].tags, vec!["viejo"]);
    assert_eq!(legacy_posts[0].author_name(), Some("alice"));

    let anonymous = storage
        .create_post("Anonimo", "sin autor", &[], None)
        .await
        .expect("anonymous post after upgrade");
    assert_eq!(anonymous.author, None);
    assert!(anonymous.id.0 > 2, "deleted legacy ids must not be reused");

    let alice = storage.create_user("alice").await.expect("existing user");
    assert_eq!(alice.0, 1);
    let bob = storage.create_user("bob").await.expect("new user");
    assert_ne!(bob, alice);

    let by_alice = storage.list_posts_by_author(alice).await.expect("by alice");
    assert_eq!(by_alice.len(), 1);
    assert_eq!(by_alice[0].id, legacy_posts[0].id);

    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('users')")
        .fetch_all(storage.pool())
        .await
        .expect("users columns");
    assert_eq!(columns, vec!["id", "username"]);
    storage.pool().close().await;

    let reopened = Storage::new(&url).await.expect("reopen");
    assert_eq!(reopened.list_posts().await.expect("list").len(), 2);
}

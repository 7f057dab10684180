//! Metadata store
//!
//! Relational records for images, segments, users and roles, backed by
//! SQLite through sqlx. The schema is created at startup and roles are
//! seeded once; images are soft-deleted (marked inactive with a deletion
//! timestamp) rather than removed.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ImageRow {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub timestamp: DateTime<Utc>,
    pub active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ImageSegmentRow {
    pub id: i64,
    pub image_id: i64,
    pub processed_filename: Option<String>,
    pub num_segments: i64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub active: bool,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
}

/// Handle to the metadata store. Cheap to clone; wraps a connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and create, if missing) the database at the given URL.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database. A single connection keeps every
    /// query on the same memory store; used by tests.
    pub async fn connect_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Create all tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                filepath TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                deleted_at TEXT
            );
            CREATE TABLE IF NOT EXISTS image_segments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                image_id INTEGER NOT NULL REFERENCES images(id),
                processed_filename TEXT,
                num_segments INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id INTEGER NOT NULL REFERENCES users(id),
                role_id INTEGER NOT NULL REFERENCES roles(id),
                PRIMARY KEY (user_id, role_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Make sure the built-in roles exist.
    pub async fn seed_roles(&self) -> Result<(), sqlx::Error> {
        for name in [ROLE_ADMIN, ROLE_USER] {
            sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES ($1)")
                .bind(name)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub async fn insert_image(
        &self,
        filename: &str,
        filepath: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<ImageRow, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO images (filename, filepath, timestamp, active) VALUES ($1, $2, $3, 1)",
        )
        .bind(filename)
        .bind(filepath)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(ImageRow {
            id: result.last_insert_rowid(),
            filename: filename.to_string(),
            filepath: filepath.to_string(),
            timestamp,
            active: true,
            deleted_at: None,
        })
    }

    pub async fn get_image(&self, id: i64) -> Result<Option<ImageRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageRow>(
            "SELECT id, filename, filepath, timestamp, active, deleted_at FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_active_images(&self) -> Result<Vec<ImageRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageRow>(
            "SELECT id, filename, filepath, timestamp, active, deleted_at \
             FROM images WHERE active = 1 ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_active_images(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn oldest_active_image(&self) -> Result<Option<ImageRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageRow>(
            "SELECT id, filename, filepath, timestamp, active, deleted_at \
             FROM images WHERE active = 1 ORDER BY timestamp ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft delete: the row stays, `active` drops and `deleted_at` is set.
    pub async fn soft_delete_image(
        &self,
        id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE images SET active = 0, deleted_at = $1 WHERE id = $2")
            .bind(deleted_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Segments
    // ------------------------------------------------------------------

    pub async fn insert_segment(
        &self,
        image_id: i64,
        processed_filename: &str,
        num_segments: i64,
    ) -> Result<ImageSegmentRow, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO image_segments (image_id, processed_filename, num_segments) \
             VALUES ($1, $2, $3)",
        )
        .bind(image_id)
        .bind(processed_filename)
        .bind(num_segments)
        .execute(&self.pool)
        .await?;

        Ok(ImageSegmentRow {
            id: result.last_insert_rowid(),
            image_id,
            processed_filename: Some(processed_filename.to_string()),
            num_segments,
        })
    }

    pub async fn segment_for_image(
        &self,
        image_id: i64,
    ) -> Result<Option<ImageSegmentRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageSegmentRow>(
            "SELECT id, image_id, processed_filename, num_segments \
             FROM image_segments WHERE image_id = $1",
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_segments_for_image(&self, image_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM image_segments WHERE image_id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Users and roles
    // ------------------------------------------------------------------

    pub async fn find_role(&self, name: &str) -> Result<Option<RoleRow>, sqlx::Error> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a user and attach the given roles in one transaction.
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role_ids: &[i64],
    ) -> Result<UserRow, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO users (username, password, active) VALUES ($1, $2, 1)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        let user_id = result.last_insert_rowid();

        for role_id in role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(UserRow {
            id: user_id,
            username: username.to_string(),
            password: password_hash.to_string(),
            active: true,
        })
    }

    /// Names of all roles held by a user.
    pub async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT r.name FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

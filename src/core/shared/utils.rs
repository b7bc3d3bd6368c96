use anyhow::{Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};
use log::info;

use crate::core::config::DatabaseConfig;
use crate::core::shared::models::{forums, DbForum};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pg_connection(database_url: &str) -> Result<PgConnection> {
    PgConnection::establish(database_url)
        .with_context(|| format!("Failed to connect to database at {}", redact_database_url(database_url)))
}

pub fn create_conn(config: &DatabaseConfig) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(config.url.clone());
    Pool::builder().max_size(config.pool_size).build(manager)
}

/// Builds a pool without opening a connection up front.
pub fn create_lazy_conn(config: &DatabaseConfig) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(config.url.clone());
    Pool::builder()
        .max_size(config.pool_size)
        .min_idle(Some(0))
        .build_unchecked(manager)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    run_migrations_on(&mut conn)
}

pub fn run_migrations_on(
    conn: &mut PgConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(
        |e| -> Box<dyn std::error::Error + Send + Sync> {
            Box::new(std::io::Error::other(format!("Migration error: {}", e)))
        },
    )?;
    if !applied.is_empty() {
        info!("Applied {} database migrations", applied.len());
    }
    Ok(())
}

pub const DEFAULT_FORUMS: [(&str, &str, &str); 4] = [
    (
        "technology",
        "Technology",
        "Discuss the latest in tech and programming",
    ),
    ("gaming", "Gaming", "Gaming news and discussions"),
    ("science", "Science", "Scientific discoveries and debates"),
    ("movies", "Movies", "Film discussions and reviews"),
];

/// Inserts the default forums, leaving existing rows untouched.
pub fn seed_default_forums(conn: &mut PgConnection) -> QueryResult<usize> {
    let now = Utc::now();
    let rows: Vec<DbForum> = DEFAULT_FORUMS
        .iter()
        .map(|(id, name, description)| DbForum {
            id: (*id).to_string(),
            name: (*name).to_string(),
            description: Some((*description).to_string()),
            created_at: now,
            updated_at: now,
        })
        .collect();

    let inserted = diesel::insert_into(forums::table)
        .values(&rows)
        .on_conflict(forums::id)
        .do_nothing()
        .execute(conn)?;
    if inserted > 0 {
        info!("Seeded {inserted} default forums");
    }
    Ok(inserted)
}

/// Strips the password from a connection URL so it can be logged.
pub fn redact_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_database_url() {
        assert_eq!(
            redact_database_url("postgres://forum:s3cret@db:5432/forum"),
            "postgres://forum:***@db:5432/forum"
        );
        assert_eq!(
            redact_database_url("postgres://forum@db/forum"),
            "postgres://forum@db/forum"
        );
        assert_eq!(redact_database_url("not a url"), "not a url");
    }

    #[test]
    fn test_default_forums_have_unique_ids() {
        let mut ids: Vec<&str> = DEFAULT_FORUMS.iter().map(|(id, _, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DEFAULT_FORUMS.len());
    }
}

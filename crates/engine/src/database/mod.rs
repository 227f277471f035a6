mod connection;

pub use connection::Database;

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

/// Embedded at compile time so the daemon and CLI never need a separate
/// `diesel migration run` step against a deployed SQLite file.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

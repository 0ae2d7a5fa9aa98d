use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::types::LibraryError;

pub const TABLE_SCHEMA: &[&str] = &[
	r#"
CREATE TABLE IF NOT EXISTS books (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	title TEXT NOT NULL,
	author TEXT,
	genre TEXT,
	year INTEGER NOT NULL,
	total_copies INTEGER NOT NULL DEFAULT 1,
	available INTEGER NOT NULL DEFAULT 1,
	added_on TEXT NOT NULL,
	CHECK(available >= 0),
	CHECK(available <= total_copies)
);
	"#,
	r#"
CREATE TABLE IF NOT EXISTS transactions (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	book_id INTEGER NOT NULL,
	action TEXT NOT NULL,
	user TEXT NOT NULL,
	timestamp TEXT NOT NULL,
	FOREIGN KEY(book_id) REFERENCES books(id)
);
	"#,
];

// owns the connection pool; cloned into every handler, one
// acquisition per operation
#[derive(Debug, Clone)]
pub struct Store {
	pub(crate) pool: Pool<Sqlite>,
}

impl Store {
	pub async fn connect(url: &str) -> Result<Self, LibraryError> {
		let pool = SqlitePoolOptions::new()
			.max_connections(5)
			.acquire_timeout(std::time::Duration::from_secs(3))
			.connect(url)
			.await?;
		Ok(Store::from_pool(pool))
	}

	pub fn from_pool(pool: Pool<Sqlite>) -> Self {
		Store { pool }
	}

	pub async fn init_schema(&self) -> Result<(), LibraryError> {
		for stmt in TABLE_SCHEMA {
			sqlx::query(stmt).execute(&self.pool).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
pub async fn open_in_memory() -> Store {
	// a single connection, otherwise every pooled connection would
	// see its own empty in-memory database
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.expect("in-memory sqlite");
	let store = Store::from_pool(pool);
	store.init_schema().await.expect("schema");
	store
}

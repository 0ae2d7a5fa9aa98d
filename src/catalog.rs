use chrono::Utc;

use crate::sql::Store;
use crate::types::{Book, LibraryError, TxRecord};

fn blank_to_null(text: &str) -> Option<String> {
	let text = text.trim();
	if text.is_empty() {
		None
	} else {
		Some(text.to_string())
	}
}

impl Store {
	pub async fn add_book(
		&self,
		title: &str,
		author: &str,
		genre: &str,
		year: i64,
		copies: i64,
	) -> Result<Book, LibraryError> {
		let title = title.trim();
		if title.is_empty() {
			return Err(LibraryError::Validation("Title is required".to_string()));
		}
		if copies < 1 {
			return Err(LibraryError::Validation(
				"At least one copy is required".to_string(),
			));
		}
		let author = blank_to_null(author);
		let genre = blank_to_null(genre);
		let now = Utc::now();
		let done = sqlx::query(
			"INSERT INTO books (title, author, genre, year, total_copies, available, added_on) \
			 VALUES (?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(title)
		.bind(&author)
		.bind(&genre)
		.bind(year)
		.bind(copies)
		.bind(copies)
		.bind(now)
		.execute(&self.pool)
		.await?;
		Ok(Book {
			id: done.last_insert_rowid(),
			title: title.to_string(),
			author,
			genre,
			year,
			total_copies: copies,
			available: copies,
			added_on: now,
		})
	}

	pub async fn list_books(&self) -> Result<Vec<Book>, LibraryError> {
		let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
			.fetch_all(&self.pool)
			.await?;
		Ok(books)
	}

	pub async fn search_books(&self, query: &str) -> Result<Vec<Book>, LibraryError> {
		let like = format!("%{}%", query);
		let books = sqlx::query_as::<_, Book>(
			"SELECT * FROM books \
			 WHERE title LIKE ? OR author LIKE ? OR genre LIKE ? \
			 ORDER BY title",
		)
		.bind(&like)
		.bind(&like)
		.bind(&like)
		.fetch_all(&self.pool)
		.await?;
		Ok(books)
	}

	pub async fn get_transactions(&self, limit: i64) -> Result<Vec<TxRecord>, LibraryError> {
		let entries = sqlx::query_as::<_, TxRecord>(
			"SELECT t.id, t.book_id, b.title, t.action, t.user, t.timestamp \
			 FROM transactions t LEFT JOIN books b ON t.book_id = b.id \
			 ORDER BY t.timestamp DESC, t.id DESC LIMIT ?",
		)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;
		Ok(entries)
	}

	pub async fn load_sample_data(&self) -> Result<(), LibraryError> {
		let samples = [
			("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 3),
			("A Brief History of Time", "Stephen Hawking", "Science", 1988, 2),
			("The Pragmatic Programmer", "Andrew Hunt", "Technology", 1999, 1),
			("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 2),
			("Deep Work", "Cal Newport", "Productivity", 2016, 1),
		];
		for (title, author, genre, year, copies) in samples {
			self.add_book(title, author, genre, year, copies).await?;
		}
		Ok(())
	}
}

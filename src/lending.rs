use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::sql::Store;
use crate::types::{Bid, LibraryError, TxAction};

impl Store {
	// the guarded UPDATE is the whole availability check: a row is
	// hit only while copies remain, so concurrent borrows can never
	// drive `available` below zero
	pub async fn borrow(&self, book_id: Bid, user: &str) -> Result<&'static str, LibraryError> {
		let mut tx = self.pool.begin().await?;
		let hit = sqlx::query("UPDATE books SET available = available - 1 WHERE id = ? AND available > 0")
			.bind(book_id)
			.execute(&mut *tx)
			.await?;
		if hit.rows_affected() == 0 {
			return Err(classify_miss(&mut tx, book_id, LibraryError::Unavailable).await);
		}
		append_entry(&mut tx, book_id, TxAction::Borrow, user).await?;
		tx.commit().await?;
		Ok("Borrowed successfully")
	}

	pub async fn return_book(&self, book_id: Bid, user: &str) -> Result<&'static str, LibraryError> {
		let mut tx = self.pool.begin().await?;
		let hit = sqlx::query(
			"UPDATE books SET available = available + 1 WHERE id = ? AND available < total_copies",
		)
		.bind(book_id)
		.execute(&mut *tx)
		.await?;
		if hit.rows_affected() == 0 {
			return Err(classify_miss(&mut tx, book_id, LibraryError::AlreadyFull).await);
		}
		append_entry(&mut tx, book_id, TxAction::Return, user).await?;
		tx.commit().await?;
		Ok("Returned successfully")
	}
}

// the update hit nothing: either the book is missing or its counter
// is at the boundary; nothing was mutated either way
async fn classify_miss(
	tx: &mut Transaction<'_, Sqlite>,
	book_id: Bid,
	at_boundary: LibraryError,
) -> LibraryError {
	let known: Result<Option<i64>, sqlx::Error> = sqlx::query_scalar("SELECT id FROM books WHERE id = ?")
		.bind(book_id)
		.fetch_optional(&mut **tx)
		.await;
	match known {
		Ok(Some(_)) => at_boundary,
		Ok(None) => LibraryError::NotFound,
		Err(e) => LibraryError::Db(e),
	}
}

async fn append_entry(
	tx: &mut Transaction<'_, Sqlite>,
	book_id: Bid,
	action: TxAction,
	user: &str,
) -> Result<(), LibraryError> {
	sqlx::query("INSERT INTO transactions (book_id, action, user, timestamp) VALUES (?, ?, ?, ?)")
		.bind(book_id)
		.bind(action.as_str())
		.bind(user)
		.bind(Utc::now())
		.execute(&mut **tx)
		.await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use crate::sql::open_in_memory;
	use crate::types::{Availability, LibraryError};

	#[tokio::test]
	async fn borrow_decrements_and_logs_once() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 2).await.unwrap();

		let msg = store.borrow(book.id, "alice").await.unwrap();
		assert_eq!(msg, "Borrowed successfully");

		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 1);
		assert_eq!(books[0].total_copies, 2);

		let entries = store.get_transactions(10).await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].action, "borrow");
		assert_eq!(entries[0].user, "alice");
		assert_eq!(entries[0].book_id, book.id);
	}

	#[tokio::test]
	async fn borrow_unknown_book_is_not_found() {
		let store = open_in_memory().await;
		let err = store.borrow(99, "alice").await.unwrap_err();
		assert!(matches!(err, LibraryError::NotFound));
		assert!(store.get_transactions(10).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn borrow_exhausted_leaves_state_unchanged() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 1).await.unwrap();
		store.borrow(book.id, "alice").await.unwrap();

		let err = store.borrow(book.id, "bob").await.unwrap_err();
		assert!(matches!(err, LibraryError::Unavailable));

		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 0);
		assert_eq!(store.get_transactions(10).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn return_at_capacity_leaves_state_unchanged() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 2).await.unwrap();

		let err = store.return_book(book.id, "alice").await.unwrap_err();
		assert!(matches!(err, LibraryError::AlreadyFull));

		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 2);
		assert!(store.get_transactions(10).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn return_unknown_book_is_not_found() {
		let store = open_in_memory().await;
		let err = store.return_book(99, "alice").await.unwrap_err();
		assert!(matches!(err, LibraryError::NotFound));
	}

	#[tokio::test]
	async fn full_lending_cycle() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 2).await.unwrap();
		assert_eq!(book.availability(), Availability::Full);

		store.borrow(book.id, "alice").await.unwrap();
		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 1);
		assert_eq!(books[0].availability(), Availability::Partial);

		store.borrow(book.id, "bob").await.unwrap();
		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 0);
		assert_eq!(books[0].availability(), Availability::Exhausted);

		let err = store.borrow(book.id, "carol").await.unwrap_err();
		assert!(matches!(err, LibraryError::Unavailable));

		store.return_book(book.id, "alice").await.unwrap();
		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 1);

		let entries = store.get_transactions(10).await.unwrap();
		assert_eq!(entries.len(), 3);
		assert_eq!(entries[0].action, "return");
	}

	#[tokio::test]
	async fn copy_counts_stay_within_bounds() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 3).await.unwrap();

		for _ in 0..5 {
			let _ = store.borrow(book.id, "alice").await;
		}
		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 0);

		for _ in 0..5 {
			let _ = store.return_book(book.id, "alice").await;
		}
		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 3);
	}

	#[tokio::test]
	async fn concurrent_borrows_never_oversell() {
		let store = open_in_memory().await;
		let book = store.add_book("Dune", "F.H.", "Sci-Fi", 1965, 5).await.unwrap();

		let mut handles = Vec::new();
		for i in 0..10 {
			let store = store.clone();
			let id = book.id;
			handles.push(tokio::spawn(async move {
				let user = format!("user{}", i);
				store.borrow(id, &user).await
			}));
		}

		let mut borrowed = 0;
		let mut rejected = 0;
		for handle in handles {
			match handle.await.unwrap() {
				Ok(_) => borrowed += 1,
				Err(LibraryError::Unavailable) => rejected += 1,
				Err(e) => panic!("unexpected error: {e}"),
			}
		}
		assert_eq!(borrowed, 5);
		assert_eq!(rejected, 5);

		let books = store.list_books().await.unwrap();
		assert_eq!(books[0].available, 0);
		assert_eq!(store.get_transactions(20).await.unwrap().len(), 5);
	}
}

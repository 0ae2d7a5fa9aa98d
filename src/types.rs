use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub type Bid = i64;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Book {
	pub id: Bid,
	pub title: String,
	pub author: Option<String>,
	pub genre: Option<String>,
	pub year: i64,
	pub total_copies: i64,
	pub available: i64,
	pub added_on: DateTime<Utc>,
}

impl Book {
	pub fn availability(&self) -> Availability {
		Availability::from_counts(self.available, self.total_copies)
	}
}

// derived from the two counters, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
	Full,
	Partial,
	Exhausted,
}

impl Availability {
	pub fn from_counts(available: i64, total: i64) -> Self {
		if available <= 0 {
			Availability::Exhausted
		} else if available >= total {
			Availability::Full
		} else {
			Availability::Partial
		}
	}

	pub fn is_exhausted(self) -> bool {
		matches!(self, Availability::Exhausted)
	}

	pub fn label(self) -> &'static str {
		match self {
			Availability::Full => "fully available",
			Availability::Partial => "partially available",
			Availability::Exhausted => "exhausted",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
	Borrow,
	Return,
}

impl TxAction {
	pub fn as_str(self) -> &'static str {
		match self {
			TxAction::Borrow => "borrow",
			TxAction::Return => "return",
		}
	}
}

// ledger entry joined with the book title; title is NULL if the
// book id no longer resolves
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TxRecord {
	pub id: i64,
	pub book_id: Bid,
	pub title: Option<String>,
	pub action: String,
	pub user: String,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewBookForm {
	pub title: String,
	pub author: String,
	pub genre: String,
	pub year: i64,
	pub copies: i64,
}

#[derive(Debug, Deserialize)]
pub struct LendForm {
	pub bid: Bid,
	pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
	pub q: Option<String>,
}

#[derive(Debug, Error)]
pub enum LibraryError {
	#[error("{0}")]
	Validation(String),
	#[error("Book not found")]
	NotFound,
	#[error("No copies available")]
	Unavailable,
	#[error("All copies already in library")]
	AlreadyFull,
	#[error(transparent)]
	Db(#[from] sqlx::Error),
}

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use maud::{html, Markup};

use crate::sql::Store;
use crate::types::{Book, LendForm, LibraryError, NewBookForm, SearchParams, TxRecord};

// storage failures surface as a 500 page; everything expected is
// rendered as an on-page notice instead
pub struct ServerError(LibraryError);

impl From<LibraryError> for ServerError {
	fn from(err: LibraryError) -> Self {
		ServerError(err)
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		tracing::error!(error = %self.0, "request failed");
		let page = layout("Error", None, html! {
			p { "Something went wrong talking to the database." }
		});
		(StatusCode::INTERNAL_SERVER_ERROR, page).into_response()
	}
}

type Notice = Option<(bool, String)>;

fn layout(title: &str, notice: Notice, content: Markup) -> Markup {
	html! {
		(maud::DOCTYPE)
		html {
			head {
				meta charset="utf-8";
				title { (title) " · Library" }
				link rel="stylesheet" href="/static/style.css";
				script src="https://unpkg.com/htmx.org@1.9.10" {}
			}
			body {
				nav {
					span.brand { "Library" }
					a href="/" { "Dashboard" }
					a href="/books" { "Manage Books" }
					a href="/lend" { "Borrow / Return" }
					a href="/transactions" { "Transactions" }
				}
				main {
					@if let Some((ok, msg)) = &notice {
						p class=(if *ok { "notice ok" } else { "notice err" }) { (msg) }
					}
					(content)
				}
			}
		}
	}
}

fn book_table(books: &[Book]) -> Markup {
	html! {
		table {
			thead { tr {
				th { "ID" }
				th { "Title" }
				th { "Author" }
				th { "Genre" }
				th { "Year" }
				th { "Available" }
				th { "Status" }
			} }
			tbody {
				@for book in books {
					tr.out[book.availability().is_exhausted()] {
						td { (book.id) }
						td { (book.title) }
						td { (book.author.as_deref().unwrap_or("—")) }
						td { (book.genre.as_deref().unwrap_or("—")) }
						td { (book.year) }
						td { (book.available) " / " (book.total_copies) }
						td { (book.availability().label()) }
					}
				}
			}
		}
	}
}

fn tx_table(entries: &[TxRecord]) -> Markup {
	html! {
		table {
			thead { tr {
				th { "ID" }
				th { "Book" }
				th { "Action" }
				th { "User" }
				th { "When" }
			} }
			tbody {
				@for entry in entries {
					tr {
						td { (entry.id) }
						td { (entry.title.as_deref().unwrap_or("—")) }
						td { (entry.action) }
						td { (entry.user) }
						td { (entry.timestamp.format("%Y-%m-%d %H:%M:%S")) }
					}
				}
			}
		}
	}
}

pub async fn dashboard(State(store): State<Store>) -> Result<Markup, ServerError> {
	let books = store.list_books().await?;
	let recent = store.get_transactions(50).await?;

	let total_copies: i64 = books.iter().map(|b| b.total_copies).sum();
	let available: i64 = books.iter().map(|b| b.available).sum();

	let mut genres: BTreeMap<&str, i64> = BTreeMap::new();
	for book in &books {
		let genre = book.genre.as_deref().unwrap_or("unspecified");
		*genres.entry(genre).or_insert(0) += book.total_copies;
	}

	Ok(layout("Dashboard", None, html! {
		h1 { "Library Dashboard" }
		section.stats {
			div.stat { span.num { (total_copies) } span.lbl { "Total copies" } }
			div.stat { span.num { (books.len()) } span.lbl { "Unique titles" } }
			div.stat { span.num { (available) } span.lbl { "Available copies" } }
		}
		section {
			h2 { "Book Catalog" }
			@if books.is_empty() {
				p { "No books yet." }
				form method="POST" action="/sample" {
					button { "Load Sample Books" }
				}
			} @else {
				(book_table(&books))
			}
		}
		@if !genres.is_empty() {
			section {
				h2 { "Copies by genre" }
				table.genres {
					@for (genre, copies) in &genres {
						tr {
							td { (genre) }
							td { (copies) }
							td { div.bar style=(format!("width:{}rem", copies * 2)) {} }
						}
					}
				}
			}
		}
		section {
			h2 { "Recent activity" }
			@if recent.is_empty() {
				p { "No transactions yet." }
			} @else {
				(tx_table(&recent))
			}
		}
	}))
}

pub async fn manage_page() -> Markup {
	manage_body(None)
}

fn manage_body(notice: Notice) -> Markup {
	layout("Manage Books", notice, html! {
		h1 { "Add a new book" }
		form method="POST" action="/books" {
			input name="title" type="text" placeholder="Title";
			input name="author" type="text" placeholder="Author";
			input name="genre" type="text" placeholder="Genre";
			input name="year" type="number" min="1000" max="2100" value="2020";
			input name="copies" type="number" min="1" max="100" value="1";
			button { "Add Book" }
		}
		hr;
		h1 { "Search books" }
		form hx-get="/search" hx-target="#results" hx-swap="innerHTML" {
			input name="q" type="search" placeholder="Title, author or genre";
			button { "Search" }
		}
		div id="results" {
			p { "Type in the search box to filter books" }
		}
	})
}

pub async fn add_book(
	State(store): State<Store>,
	Form(form): Form<NewBookForm>,
) -> Result<Markup, ServerError> {
	let added = store
		.add_book(&form.title, &form.author, &form.genre, form.year, form.copies)
		.await;
	let notice = match added {
		Ok(book) => {
			tracing::info!(book_id = book.id, title = %book.title, "book added");
			(true, format!("Added '{}'", book.title))
		}
		Err(e @ LibraryError::Db(_)) => return Err(e.into()),
		Err(e) => {
			tracing::warn!(error = %e, "add book rejected");
			(false, e.to_string())
		}
	};
	Ok(manage_body(Some(notice)))
}

pub async fn search_fragment(
	State(store): State<Store>,
	Query(params): Query<SearchParams>,
) -> Result<Markup, ServerError> {
	let query = params.q.unwrap_or_default();
	let query = query.trim();
	if query.is_empty() {
		return Ok(html! { p { "Type in the search box to filter books" } });
	}
	let hits = store.search_books(query).await?;
	Ok(html! {
		@if hits.is_empty() {
			p { "No books match '" (query) "'" }
		} @else {
			(book_table(&hits))
		}
	})
}

async fn lend_body(store: &Store, notice: Notice) -> Result<Markup, ServerError> {
	let books = store.list_books().await?;
	Ok(layout("Borrow / Return", notice, html! {
		h1 { "Borrow or Return a Book" }
		@if books.is_empty() {
			p { "No books available. Add some in Manage Books." }
		} @else {
			form method="POST" {
				select name="bid" {
					@for book in &books {
						option value=(book.id) {
							(book.id) " - " (book.title) " (" (book.available) " available)"
						}
					}
				}
				input name="user" type="text" placeholder="Your name";
				button formaction="/borrow" { "Borrow" }
				button formaction="/return" { "Return" }
			}
		}
	}))
}

pub async fn lend_page(State(store): State<Store>) -> Result<Markup, ServerError> {
	lend_body(&store, None).await
}

pub async fn borrow(
	State(store): State<Store>,
	Form(form): Form<LendForm>,
) -> Result<Markup, ServerError> {
	let user = form.user.trim();
	let notice = if user.is_empty() {
		(false, "Please enter your name".to_string())
	} else {
		match store.borrow(form.bid, user).await {
			Ok(msg) => {
				tracing::info!(book_id = form.bid, user, "borrowed");
				(true, msg.to_string())
			}
			Err(e @ LibraryError::Db(_)) => return Err(e.into()),
			Err(e) => {
				tracing::warn!(book_id = form.bid, error = %e, "borrow rejected");
				(false, e.to_string())
			}
		}
	};
	lend_body(&store, Some(notice)).await
}

pub async fn return_book(
	State(store): State<Store>,
	Form(form): Form<LendForm>,
) -> Result<Markup, ServerError> {
	let user = form.user.trim();
	let notice = if user.is_empty() {
		(false, "Please enter your name".to_string())
	} else {
		match store.return_book(form.bid, user).await {
			Ok(msg) => {
				tracing::info!(book_id = form.bid, user, "returned");
				(true, msg.to_string())
			}
			Err(e @ LibraryError::Db(_)) => return Err(e.into()),
			Err(e) => {
				tracing::warn!(book_id = form.bid, error = %e, "return rejected");
				(false, e.to_string())
			}
		}
	};
	lend_body(&store, Some(notice)).await
}

pub async fn transactions_page(State(store): State<Store>) -> Result<Markup, ServerError> {
	let entries = store.get_transactions(500).await?;
	Ok(layout("Transactions", None, html! {
		h1 { "Transactions" }
		@if entries.is_empty() {
			p { "No transactions yet." }
		} @else {
			(tx_table(&entries))
		}
	}))
}

pub async fn load_sample(State(store): State<Store>) -> Result<Redirect, ServerError> {
	store.load_sample_data().await?;
	tracing::info!("sample data loaded");
	Ok(Redirect::to("/"))
}

// library catalog manager
// books + copy counts + a borrow/return ledger, served as HTML

mod catalog;
mod lending;
mod sql;
mod types;
mod web;

use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();
	init_tracing();

	let db_url = std::env::var("DATABASE_URL")
		.unwrap_or_else(|_| "sqlite://library.db?mode=rwc".to_string());

	let store = sql::Store::connect(&db_url)
		.await
		.expect("can't connect to database");
	store.init_schema().await.expect("can't create tables");

	let app = axum::Router::new()
		.route("/", get(web::dashboard))
		.route("/books", get(web::manage_page).post(web::add_book))
		.route("/search", get(web::search_fragment))
		.route("/lend", get(web::lend_page))
		.route("/borrow", post(web::borrow))
		.route("/return", post(web::return_book))
		.route("/transactions", get(web::transactions_page))
		.route("/sample", post(web::load_sample))
		.nest_service("/static", ServeDir::new("static"))
		.with_state(store);

	let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
		.await
		.expect("can't bind 0.0.0.0:8080");
	tracing::info!(db = %db_url, "listening on http://0.0.0.0:8080");
	axum::serve(listener, app).await.expect("server error");
}

fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_target(false)
		.try_init();
}

mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::StripeClient;

mod from_row;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and Stripe client
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub stripe: StripeClient,
    /// Base URL for checkout success/cancel redirects
    pub base_url: String,
    /// Product-name marker for premium tier classification
    pub premium_product_marker: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

pub mod models;
pub mod schema;
pub mod state;
pub mod utils;

pub use schema::*;
pub use state::AppState;
pub use utils::{create_conn, create_lazy_conn, run_migrations, seed_default_forums, DbPool};

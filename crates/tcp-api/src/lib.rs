pub mod app;
pub mod auth;
pub mod dynamic;
pub mod error;
pub mod handlers;
pub mod state;

pub use app::build_app;
pub use state::AppState;

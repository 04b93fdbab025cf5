pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod middleware;
pub mod reports;
pub mod routes;
pub mod scanner;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

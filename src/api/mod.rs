pub mod error;
pub mod handlers;
pub mod middleware;
pub mod params;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_api_router;

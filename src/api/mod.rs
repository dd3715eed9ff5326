pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use response::{ApiResponse, ResponseStatus};
pub use routes::create_router;
pub use state::AppState;

pub mod auth;
pub mod request_id;

pub use auth::{admin_auth_middleware, AdminUser};
pub use request_id::request_id_middleware;

//! Password hashing, bearer tokens and the authentication middleware.

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::require_principal;
pub use token::{Claims, TokenManager};

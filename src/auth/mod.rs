mod middleware;
mod token;

pub use middleware::{jwt_auth, websocket_token};
pub use token::{PlayerClaims, TokenVerifier};

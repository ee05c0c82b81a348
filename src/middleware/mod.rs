// Middleware stages of the admission pipeline

pub mod auth;
pub mod body_decoder;
pub mod cors;
pub mod rate_limit;

pub use auth::AuthenticatedUser;
pub use body_decoder::DecodedBody;

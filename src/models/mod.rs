pub mod auth;

pub use auth::TokenClaims;

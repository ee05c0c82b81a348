// Stateful services behind the admission middleware

pub mod jwt;
pub mod rate_limit;

pub use jwt::{AuthError, TokenService, TokenSettings};
pub use rate_limit::{RateLimitDecision, RateLimitService, RateLimitSettings};

pub mod errors;

pub use errors::ApiError;

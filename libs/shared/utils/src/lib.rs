pub mod extractor;
pub mod jwt;
pub mod test_utils;

pub use extractor::{auth_middleware, extract_bearer_token, extract_principal, BearerToken};
pub use jwt::{sign_token, validate_token};

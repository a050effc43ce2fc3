pub mod account;
pub mod guard;
pub mod resolver;
pub mod session;

pub use account::AccountService;
pub use guard::AuthorizationGuard;
pub use resolver::IdentityResolver;
pub use session::{SessionContext, SessionGate};

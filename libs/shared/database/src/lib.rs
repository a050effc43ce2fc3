pub mod identity;
pub mod memory;
pub mod postgrest;
pub mod state;
pub mod store;
pub mod supabase;

pub use identity::{AuthEvent, IdentityError, IdentityProvider, MemoryIdentity, SupabaseIdentity};
pub use memory::MemoryStore;
pub use postgrest::SupabaseStore;
pub use state::AppState;
pub use store::{collections, Document, DocumentStore, Filter, StoreError, StoreResult, WriteBatch};
pub use supabase::SupabaseClient;

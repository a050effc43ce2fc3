pub mod auth;
pub mod error;
pub mod instant;
pub mod patient;
pub mod profile;
pub mod role;

pub use patient::PatientRecord;
pub use profile::Profile;
pub use role::Role;

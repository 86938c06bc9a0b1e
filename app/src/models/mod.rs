pub mod profile;
pub mod user;

pub use profile::ProfileRecord;
pub use user::{display_name, ApplicationUser, AuthState};

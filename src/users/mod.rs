//! User accounts: registration, verification, credentials and roles.

pub mod directory;
pub mod password;
pub mod tokens;
pub mod types;

pub use directory::UserDirectory;
pub use password::Password;
pub use tokens::{TokenPolicy, TokenPurpose};
pub use types::{AccountStatus, NewAccount, Registration, User, UserLookup, UserProfile};

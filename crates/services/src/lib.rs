pub mod auth;
pub mod concurrency;
pub mod dao;
pub mod licensing;
pub mod notify;

pub use auth::{AdminClaims, AuthError, AuthService};
pub use dao::*;
pub use licensing::{Licensing, LicensingError};
pub use notify::{InvitationNotifier, LogNotifier};

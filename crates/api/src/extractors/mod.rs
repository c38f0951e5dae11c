pub mod auth;
pub mod cms;

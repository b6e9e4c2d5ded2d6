
pub mod users;
pub mod profiles;
pub mod location;
pub mod requirements;
pub mod messages;
pub mod reviews;
pub mod requests;
pub mod admin;
pub mod common;
pub mod pagination;

pub mod admin;
pub mod location;
pub mod messages;
pub mod profiles;
pub mod requests;
pub mod requirements;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub(crate) mod test_fixtures;

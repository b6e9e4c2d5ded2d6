pub mod message_expiry;

pub use message_expiry::start_message_expiry_job;

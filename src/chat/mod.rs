pub mod events;
pub mod hub;
pub mod session;

pub use events::{ClientEvent, ServerEvent};
pub use hub::ChatHub;
pub use session::{run_session, SessionContext};

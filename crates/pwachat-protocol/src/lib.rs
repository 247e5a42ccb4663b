pub mod events;

pub use events::{ClientEvent, EventPayload, ServerEvent};

pub mod error;
pub mod keys;
pub mod sink;
pub mod store;

pub use error::PushError;
pub use keys::{ServerIdentity, VapidKeys};
pub use sink::{PushPayload, PushSink, PushTransport};
pub use store::{PushSubscription, SubscriptionKeys, SubscriptionStore};

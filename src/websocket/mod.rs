pub mod handler;
pub mod registry;

pub use handler::WebSocketHandler;
pub use registry::{Subscriber, SubscriberId, SubscriberRegistry};

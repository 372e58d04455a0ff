pub mod channel;
pub mod poller;
pub mod broadcaster;

pub use channel::{update_channel, UpdateSender, UpdateReceiver};
pub use poller::Poller;
pub use broadcaster::Broadcaster;

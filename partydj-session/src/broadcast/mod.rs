//! Session event fan-out and subscriber authorization

pub mod gateway;
pub mod presence;

pub use gateway::{BroadcastGateway, SessionSubscription};
pub use presence::{ChannelAuth, PresenceData, PresenceInfo, PresenceSigner};

// Service exports
pub mod gateway;
pub mod platform;
pub mod store;

pub use gateway::{ChannelProvisioner, GatewayError, NotificationGateway};
pub use platform::PlatformClient;
pub use store::{MatchmakingStore, PendingPair, StoreError, UserSnapshot};

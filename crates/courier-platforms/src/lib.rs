pub mod adapter;
pub mod discord;
pub mod registry;
pub mod telegram;

pub use adapter::{DeliveryOutcome, PlatformAdapter};
pub use discord::DiscordAdapter;
pub use registry::{PlatformRegistry, RegistryError};
pub use telegram::TelegramAdapter;

pub mod notifier;
pub mod ws;

pub use notifier::Notifier;

/// Event name pushed to viewers whenever a status record changes.
pub const STATUS_UPDATED: &str = "statusUpdated";

pub mod message;
pub mod response;

pub use message::{Message, Role};
pub use response::{ChatResponse, UsageMap, UsageSource};

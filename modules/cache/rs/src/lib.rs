mod payload;
mod store;

pub use payload::{Format, Payload};
pub use store::{CacheStore, Category};

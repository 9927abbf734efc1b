//! Batch loaders for extracted evidence.
//!
//! Every loader upserts with `ON CONFLICT ... DO UPDATE SET col =
//! COALESCE(EXCLUDED.col, <table>.col)` so re-running an extraction is
//! idempotent and a later duplicate never overwrites a present value
//! with null. Batch sizes are fixed per domain; callers chunk their
//! deduplicated record sets and report progress between chunks.

pub mod apps;
pub mod browsing;
pub mod calls;
pub mod chat;
pub mod contacts;
pub mod locations;
pub mod messages;

pub use apps::AppLoader;
pub use browsing::BrowsingLoader;
pub use calls::CallLoader;
pub use chat::ChatLoader;
pub use contacts::ContactLoader;
pub use locations::LocationLoader;
pub use messages::MessageLoader;

fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "chat/mod.rs"]
pub mod chat;

#[path = "rag/mod.rs"]
pub mod rag;

#[path = "ratelimit/mod.rs"]
pub mod ratelimit;

#[path = "resources/mod.rs"]
pub mod resources;

// =============================================================================
// HTTP LAYER - Axum server surface
// =============================================================================
//
// Everything that knows about requests, responses, status codes and SSE
// framing lives here. The core layer stays transport-agnostic.

#[path = "error.rs"]
pub mod error;

#[path = "router.rs"]
pub mod router;

#[path = "routes/mod.rs"]
pub mod routes;

#[path = "sse.rs"]
pub mod sse;

#[path = "state.rs"]
pub mod state;

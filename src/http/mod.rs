//! HTTP transport for the RPC dispatcher
//!
//! Delivers request bodies to the dispatcher and writes back its responses, next
//! to a few metadata endpoints and the bundled demo page.

pub mod handlers;

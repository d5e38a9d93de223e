//! HTTP middleware stack: CORS policy and per-request trace IDs.

pub mod cors;
pub mod trace;

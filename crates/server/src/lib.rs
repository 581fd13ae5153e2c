//! HTTP layer for the Geoscene portrayal service.
//!
//! The library half exposes the router so handler tests and the binary
//! share one wiring; everything protocol-shaped lives in `geoscene-core`.

pub mod router;

//! Portrayal engine: protocol dispatch and the per-operation builders.
//!
//! The engine is the stateless-per-request core of the service. Given a
//! model name and a folded KVP query it determines protocol and operation,
//! validates parameters, and delegates to one response builder:
//!
//! | Service | Request | Builder |
//! |---------|---------|---------|
//! | 3DPS | `GetCapabilities` | [`handlers::capabilities`] |
//! | 3DPS | `GetFeatureInfoByObjectId` | [`handlers::FeatureInfoHandler`] |
//! | 3DPS | `GetResourceById` | [`handlers::ResourceHandler`] |
//! | WFS | `GetPropertyValue` | [`handlers::PropertyValueHandler`] |
//! | n/a | binary companion fetch | [`handlers::BlobHandler`] |
//!
//! Handlers receive an `Arc<SharedContext>` holding the registry, the
//! cache store, the index builder, and the two external collaborators.
//! Every path produces a well-formed HTTP-200 body; protocol errors render
//! as exception JSON and infrastructure failures degrade to placeholders.

pub mod engine;
pub mod handlers;

pub use engine::{PortrayalEngine, SharedContext};

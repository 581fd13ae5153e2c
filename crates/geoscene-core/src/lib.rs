//! # Geoscene Core
//!
//! Core library for the Geoscene 3D borehole portrayal service: a narrow
//! profile of the OGC 3D Portrayal Service (3DPS) plus the WFS
//! `GetPropertyValue` operation, serving borehole metadata and 3D-scene
//! fragments for named geological models.
//!
//! This crate provides the foundational components for:
//!
//! - **[`portrayal`]**: the protocol dispatcher and per-operation response
//!   builders, the core of the service.
//!
//! - **[`registry`]**: the immutable per-model parameter and listing
//!   connection registry, built once at startup and persisted in the store.
//!
//! - **[`store`]**: the disk-backed namespaced key/value store with
//!   insert-if-absent semantics shared by registry, index, and blob caches.
//!
//! - **[`index`]**: borehole index construction from the upstream listing
//!   service, with create-on-miss caching and degrade-to-empty behavior.
//!
//! - **[`scene`]**: the two-part scene payload model and the splitter that
//!   turns one payload into two independently servable responses.
//!
//! - **[`ogc`]**: KVP query folding, the exception taxonomy, and the fixed
//!   success documents.
//!
//! - **[`attrs`]** / **[`upstream`]**: the external collaborators (attribute
//!   store, record lister, scene assembler) behind trait seams.
//!
//! ## Request Flow
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌──────────────┐
//! │ KVP folding  │
//! └──────┬───────┘
//!        ▼
//! ┌──────────────────┐     unknown/invalid
//! │ PortrayalEngine  │ ───────────────────► exception JSON (HTTP 200)
//! │   (dispatch)     │
//! └──────┬───────────┘
//!        │
//!   ┌────┼──────────────┬─────────────────┐
//!   ▼    ▼              ▼                 ▼
//! Caps  FeatureInfo   PropertyValue   GetResourceById
//!  │     │              │                 │
//!  │     ▼              ▼                 ▼
//!  │   attribute     borehole index   scene source → splitter
//!  │   store         (cache / list)       │            │
//!  │                                      │       binary part → blob cache
//!  ▼                                      ▼                        │
//! XML doc                          rewritten glTF doc    $blobfile.bin fetch
//! ```
//!
//! Infrastructure failures degrade to empty or placeholder HTTP-200 bodies
//! throughout; only the four protocol exception codes are user-visible.

pub mod attrs;
pub mod config;
pub mod index;
pub mod ogc;
pub mod portrayal;
pub mod registry;
pub mod scene;
pub mod store;
pub mod upstream;

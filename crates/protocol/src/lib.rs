//! Shared protocol crate for the swarm hub.
//!
//! This crate contains:
//! - JSON event definitions for both directions of the wire
//! - Shared types (identity ids, positions and colors as `glam::Vec3`)

mod error;
pub mod events;

pub use error::ProtocolError;
pub use events::{
    AdminPing, ClientEvent, ClientSummary, CommuneMessage, DirectMessage, PingResponse, Query,
    ReactionEntry, ServerEvent,
};

/// Opaque unique token assigned to a connection at admission time.
pub type ClientId = uuid::Uuid;

/// A point (or velocity) in the swarm volume, serialized as `[x, y, z]`.
pub type Position = glam::Vec3;

/// Unit-normalized RGB color, serialized as `[r, g, b]`.
pub type Color = glam::Vec3;

//! Wire protocol for Rendezvous.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Envelope`], [`Request`], [`Response`], [`RoomStatus`],
//!   [`HostInfo`], [`RoomSummary`]): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or the room registry.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Registry (rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    DEFAULT_HOST_PORT, Envelope, HostInfo, Payload, Request, Response,
    RoomStatus, RoomSummary,
};

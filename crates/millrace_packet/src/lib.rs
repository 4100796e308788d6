//! MILLRACE packet representation.
//!
//! A packet is a view over a byte buffer (with spare head and tail room)
//! plus a fixed set of typed annotation slots. It exists in two forms: a
//! shared read-only handle ([`Packet`]) and an exclusive writable handle
//! ([`WritablePacket`]). Mutation is only possible through the exclusive
//! handle; obtaining one from a shared handle copies the buffer iff more
//! than one reference exists. The transition is an explicit call
//! ([`Packet::make_writable`]), never a side effect of another operation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotations;
pub mod packet;

pub use annotations::{Annotations, PacketType, USER_SLOTS};
pub use packet::{Packet, PacketError, PacketResult, WritablePacket};

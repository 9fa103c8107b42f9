//! Logical frame contents decoded from/encoded to the wire (§3, §4.1, §6).

use crate::ids::{ClientId, NetworkObjectId};
use crate::value::RpcValue;

/// Discriminator bytes used to classify an inbound datagram (§3, §6).
pub mod discriminator {
	/// Connection handshake ping; ignored on receipt beyond routing.
	pub const HANDSHAKE_PING: u8 = 0x00;
	/// Client-id assignment; payload is a little-endian `u32`.
	pub const CLIENT_ID_ASSIGNMENT: u8 = 0x01;
	/// Entity spawn.
	pub const SPAWN: u8 = 0xFF;
}

/// A single logical message carried by one datagram (§3 "Frame").
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
	/// `0x00`: a single byte, ignored beyond routing.
	HandshakePing,
	/// `0x01`: assigns the receiving peer its [`ClientId`].
	ClientIdAssignment { client_id: ClientId },
	/// `0xFF`: materializes an entity on the receiving peer (§4.4).
	Spawn {
		type_name: String,
		network_object_id: NetworkObjectId,
		owner_client_id: ClientId,
	},
	/// Any other frame: an RPC invocation (§4.1).
	Rpc {
		method_name: String,
		network_object_id: NetworkObjectId,
		args: Vec<RpcValue>,
	},
}

impl Frame {
	/// Builds the 5-byte client-id assignment control frame.
	pub fn client_id_assignment(client_id: ClientId) -> Self {
		Self::ClientIdAssignment { client_id }
	}
}

//! The piece of manager state shared with every outstanding [`crate::EntityHandle`]:
//! enough to decide and carry out an outbound send without needing the
//! registry or client table too.

use netrpc_common::{codec, ClientId, DeliveryMode, Frame};
use netrpc_transport::Transport;

use crate::role::Role;

/// The manager's connection lifecycle. Distinct from [`Role`]: `Connecting`
/// is a client that has an open transport connection but hasn't yet
/// received its client id, and routes as [`Role::Disconnected`] until it
/// does.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ConnectionState {
	Uninitialized,
	Hosting,
	Connecting,
	Connected,
}

pub(crate) struct NetworkState {
	pub(crate) state: ConnectionState,
	pub(crate) local_client_id: ClientId,
	pub(crate) transport: Box<dyn Transport>,
}

impl NetworkState {
	pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
		Self {
			state: ConnectionState::Uninitialized,
			local_client_id: ClientId::HOST,
			transport,
		}
	}

	pub(crate) fn role(&self) -> Role {
		match self.state {
			ConnectionState::Hosting => Role::Host,
			ConnectionState::Connected => Role::Client,
			ConnectionState::Uninitialized | ConnectionState::Connecting => Role::Disconnected,
		}
	}

	/// Encodes and sends to a single client. No-op if not hosting, matching
	/// sends on a stopped or wrong-role transport being silent rather than
	/// an error.
	pub(crate) fn send_to_client(
		&mut self,
		peer: netrpc_transport::PeerId,
		frame: &Frame,
		mode: DeliveryMode,
	) {
		if self.state != ConnectionState::Hosting {
			return;
		}
		self.encode_and(frame, |bytes, transport| {
			let _ = transport.send_to_client(peer, bytes, mode);
		});
	}

	pub(crate) fn send_to_all(&mut self, frame: &Frame, mode: DeliveryMode) {
		if self.state != ConnectionState::Hosting {
			return;
		}
		self.encode_and(frame, |bytes, transport| {
			let _ = transport.send_to_all(bytes, mode);
		});
	}

	pub(crate) fn send_to_server(&mut self, frame: &Frame, mode: DeliveryMode) {
		if self.state != ConnectionState::Connected {
			return;
		}
		self.encode_and(frame, |bytes, transport| {
			let _ = transport.send_to_server(bytes, mode);
		});
	}

	fn encode_and(&mut self, frame: &Frame, f: impl FnOnce(bytes::Bytes, &mut dyn Transport)) {
		match codec::encode(frame) {
			Ok(bytes) => f(bytes, &mut *self.transport),
			Err(err) => tracing::error!(?err, "failed to encode outbound frame"),
		}
	}
}

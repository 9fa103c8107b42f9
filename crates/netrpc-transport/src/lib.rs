//! The pluggable transport interface (§4.6).
//!
//! `spec.md` treats the underlying unreliable-datagram transport as an
//! external collaborator: only its interface contract is specified here,
//! not a production implementation. [`memory`] provides an in-process
//! reference implementation used by `netrpc`'s own test suite and the
//! `demos/echo` binary; it is a test fixture, not a UDP socket.

pub mod memory;

use bytes::Bytes;
use netrpc_common::DeliveryMode;

/// A transport-level handle for a connected peer (§3 "the transport peer
/// handle"). Distinct from [`netrpc_common::ClientId`], which is assigned by
/// the manager only after the connection is established.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PeerId(pub u64);

/// An event surfaced by [`Transport::poll`] (§4.6).
#[derive(Debug, Clone)]
pub enum TransportEvent {
	/// A new peer connected. Host-side only.
	ClientConnected { peer: PeerId },
	/// A previously connected peer disconnected. Host-side only.
	ClientDisconnected { peer: PeerId },
	/// A datagram arrived from `sender`. On the client side, `sender` always
	/// identifies the single server connection.
	DataReceived { bytes: Bytes, sender: PeerId },
	/// The client finished connecting to a server. Client-side only.
	ConnectedToServer,
	/// The client's connection to the server was lost. Client-side only.
	DisconnectedFromServer,
}

/// Errors a transport can report back to the manager (§7 kind 5).
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
	#[error("transport is not started")]
	NotStarted,
	#[error("transport is already started")]
	AlreadyStarted,
	#[error("no such peer")]
	UnknownPeer,
	#[error("transport-specific failure: {0}")]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The peer id that always denotes "the server" from a client's point of
/// view, used with [`Transport::send_to_server`]'s implicit destination and
/// as the `sender` of events the client receives from the server.
pub const SERVER_PEER: PeerId = PeerId(0);

/// Connection lifecycle plus datagram send/receive with three delivery
/// modes (§4.6). Implementations are polled cooperatively from a single
/// driver thread (§5); `poll` must never block.
pub trait Transport: Send {
	/// Starts listening for incoming connections. Host-side entry point.
	fn start_server(&mut self, port: u16, max_clients: u32) -> Result<(), TransportError>;

	/// Starts connecting to a remote host. Client-side entry point.
	fn start_client(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

	/// Drains and returns all events queued since the last call. Never
	/// blocks (§5 "no suspension points").
	fn poll(&mut self) -> Vec<TransportEvent>;

	/// Sends `bytes` to one connected client. Host-side only.
	fn send_to_client(
		&mut self,
		peer: PeerId,
		bytes: Bytes,
		mode: DeliveryMode,
	) -> Result<(), TransportError>;

	/// Sends `bytes` to every connected client. Host-side only.
	fn send_to_all(&mut self, bytes: Bytes, mode: DeliveryMode) -> Result<(), TransportError>;

	/// Sends `bytes` to the server. Client-side only.
	fn send_to_server(&mut self, bytes: Bytes, mode: DeliveryMode) -> Result<(), TransportError>;

	/// Tears down the transport. Sends after `stop` are no-ops rather than
	/// errors (§7 kind 5).
	fn stop(&mut self);
}

//! An in-process, channel-based reference [`Transport`].
//!
//! This is a test/demo fixture (see `SPEC_FULL.md`'s "Reference transport"
//! section), not a production UDP transport: `spec.md` only specifies the
//! transport's interface contract (§4.6). All three delivery modes are
//! modeled as ordered, reliable channels here — there is no real packet loss
//! to distinguish them from one another in-process — which is sufficient to
//! exercise the manager and dispatch logic deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use netrpc_common::DeliveryMode;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::{PeerId, Transport, TransportError, TransportEvent};

struct Incoming {
	peer: PeerId,
	to_client: UnboundedSender<Bytes>,
	from_client: UnboundedReceiver<Bytes>,
}

#[derive(Default)]
struct HubInner {
	next_peer: u64,
	listeners: HashMap<u16, UnboundedSender<Incoming>>,
}

/// A shared in-process "network". Construct one [`MemoryHub`] per test/demo
/// and clone it into every [`MemoryTransport`] that should be able to reach
/// each other.
#[derive(Clone, Default)]
pub struct MemoryHub {
	inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
	pub fn new() -> Self {
		Self::default()
	}

	fn listen(&self, port: u16) -> UnboundedReceiver<Incoming> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.inner.lock().expect("poisoned").listeners.insert(port, tx);
		rx
	}

	fn connect(
		&self,
		port: u16,
	) -> Option<(PeerId, UnboundedSender<Bytes>, UnboundedReceiver<Bytes>)> {
		let mut inner = self.inner.lock().expect("poisoned");
		let listener = inner.listeners.get(&port)?.clone();
		inner.next_peer += 1;
		let peer = PeerId(inner.next_peer);
		drop(inner);

		let (c2s_tx, c2s_rx) = mpsc::unbounded_channel();
		let (s2c_tx, s2c_rx) = mpsc::unbounded_channel();
		listener
			.send(Incoming {
				peer,
				to_client: s2c_tx,
				from_client: c2s_rx,
			})
			.ok()?;
		Some((peer, c2s_tx, s2c_rx))
	}
}

struct ServerState {
	incoming: UnboundedReceiver<Incoming>,
	max_clients: u32,
	clients: HashMap<PeerId, (UnboundedSender<Bytes>, UnboundedReceiver<Bytes>)>,
}

struct ClientState {
	to_server: UnboundedSender<Bytes>,
	from_server: UnboundedReceiver<Bytes>,
	connected: bool,
}

enum Role {
	Uninitialized,
	Server(ServerState),
	Client(ClientState),
}

/// An in-memory [`Transport`] backed by a [`MemoryHub`].
pub struct MemoryTransport {
	hub: MemoryHub,
	role: Role,
}

impl MemoryTransport {
	pub fn new(hub: MemoryHub) -> Self {
		Self {
			hub,
			role: Role::Uninitialized,
		}
	}
}

impl Transport for MemoryTransport {
	fn start_server(&mut self, port: u16, max_clients: u32) -> Result<(), TransportError> {
		if !matches!(self.role, Role::Uninitialized) {
			return Err(TransportError::AlreadyStarted);
		}
		self.role = Role::Server(ServerState {
			incoming: self.hub.listen(port),
			max_clients,
			clients: HashMap::new(),
		});
		Ok(())
	}

	fn start_client(&mut self, _host: &str, port: u16) -> Result<(), TransportError> {
		if !matches!(self.role, Role::Uninitialized) {
			return Err(TransportError::AlreadyStarted);
		}
		let Some((_peer, to_server, from_server)) = self.hub.connect(port) else {
			return Err(TransportError::UnknownPeer);
		};
		self.role = Role::Client(ClientState {
			to_server,
			from_server,
			connected: false,
		});
		Ok(())
	}

	fn poll(&mut self) -> Vec<TransportEvent> {
		let mut events = Vec::new();
		match &mut self.role {
			Role::Uninitialized => {}
			Role::Server(state) => {
				while let Ok(incoming) = state.incoming.try_recv() {
					if state.clients.len() as u32 >= state.max_clients {
						trace!(peer = incoming.peer.0, "rejecting connection, server full");
						continue;
					}
					state
						.clients
						.insert(incoming.peer, (incoming.to_client, incoming.from_client));
					events.push(TransportEvent::ClientConnected { peer: incoming.peer });
				}
				let mut disconnected = Vec::new();
				for (&peer, (_tx, rx)) in state.clients.iter_mut() {
					loop {
						match rx.try_recv() {
							Ok(bytes) => events.push(TransportEvent::DataReceived { bytes, sender: peer }),
							Err(TryRecvError::Empty) => break,
							Err(TryRecvError::Disconnected) => {
								disconnected.push(peer);
								break;
							}
						}
					}
				}
				for peer in disconnected {
					state.clients.remove(&peer);
					events.push(TransportEvent::ClientDisconnected { peer });
				}
			}
			Role::Client(state) => {
				if !state.connected {
					state.connected = true;
					events.push(TransportEvent::ConnectedToServer);
				}
				loop {
					match state.from_server.try_recv() {
						Ok(bytes) => events.push(TransportEvent::DataReceived {
							bytes,
							sender: crate::SERVER_PEER,
						}),
						Err(TryRecvError::Empty) => break,
						Err(TryRecvError::Disconnected) => {
							if state.connected {
								state.connected = false;
								events.push(TransportEvent::DisconnectedFromServer);
							}
							break;
						}
					}
				}
			}
		}
		events
	}

	fn send_to_client(
		&mut self,
		peer: PeerId,
		bytes: Bytes,
		_mode: DeliveryMode,
	) -> Result<(), TransportError> {
		let Role::Server(state) = &mut self.role else {
			return Ok(());
		};
		let Some((tx, _rx)) = state.clients.get(&peer) else {
			return Err(TransportError::UnknownPeer);
		};
		let _ = tx.send(bytes);
		Ok(())
	}

	fn send_to_all(&mut self, bytes: Bytes, _mode: DeliveryMode) -> Result<(), TransportError> {
		let Role::Server(state) = &mut self.role else {
			return Ok(());
		};
		for (tx, _rx) in state.clients.values() {
			let _ = tx.send(bytes.clone());
		}
		Ok(())
	}

	fn send_to_server(&mut self, bytes: Bytes, _mode: DeliveryMode) -> Result<(), TransportError> {
		let Role::Client(state) = &mut self.role else {
			return Ok(());
		};
		let _ = state.to_server.send(bytes);
		Ok(())
	}

	fn stop(&mut self) {
		self.role = Role::Uninitialized;
	}
}

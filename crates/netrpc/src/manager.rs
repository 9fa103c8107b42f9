//! The connection state machine, inbound frame dispatch, and the spawn
//! protocol that ties the registry to the wire.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use netrpc_common::{codec, ClientId, Counter, Frame, NetworkObjectId, RpcKind};
use netrpc_transport::{PeerId, Transport, TransportEvent};
use tracing::{debug, instrument, trace, warn};

use crate::entity::{InvokeContext, NetworkedEntity, SpawnContext};
use crate::error::{ApiMisuseError, ConfigError, DispatchRejection, ManagerError};
use crate::handle::EntityHandle;
use crate::registry::Registry;
use crate::role::Role;
use crate::state::{ConnectionState, NetworkState};

struct ClientRecord {
	#[allow(dead_code)]
	peer: PeerId,
}

/// An event the driver loop should react to, returned from
/// [`Manager::update`]. Distinct from the lower-level
/// [`netrpc_transport::TransportEvent`]: the manager only surfaces a
/// connection as established once the handshake (and, for a client, the
/// client-id assignment) completes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ManagerEvent {
	ClientConnected(ClientId),
	ClientDisconnected(ClientId),
	ConnectedToServer,
	DisconnectedFromServer,
}

/// Owns the transport, the registry, and the connection state machine.
/// Drive it from a single thread by calling [`Self::update`] on every tick;
/// nothing in here blocks or suspends.
pub struct Manager {
	net: Rc<RefCell<NetworkState>>,
	registry: Registry,
	clients: HashMap<ClientId, ClientRecord>,
	peer_to_client: HashMap<PeerId, ClientId>,
	next_client_id: Counter,
	next_object_id: Counter,
}

impl Manager {
	pub fn new(transport: impl Transport + 'static) -> Self {
		Self {
			net: Rc::new(RefCell::new(NetworkState::new(Box::new(transport)))),
			registry: Registry::new(),
			clients: HashMap::new(),
			peer_to_client: HashMap::new(),
			next_client_id: Counter::starting_at(1),
			next_object_id: Counter::starting_at(1),
		}
	}

	pub fn registry_mut(&mut self) -> &mut Registry {
		&mut self.registry
	}

	pub fn role(&self) -> Role {
		self.net.borrow().role()
	}

	pub fn local_client_id(&self) -> ClientId {
		self.net.borrow().local_client_id
	}

	/// Every client currently connected. Host-side only; empty on a client
	/// or an uninitialized manager.
	pub fn connected_clients(&self) -> impl Iterator<Item = ClientId> + '_ {
		self.clients.keys().copied()
	}

	/// Starts listening for clients. Requires the manager to be freshly
	/// constructed or stopped.
	pub fn start_server(&mut self, port: u16, max_clients: u32) -> Result<(), ManagerError> {
		self.require_uninitialized()?;
		self.net
			.borrow_mut()
			.transport
			.start_server(port, max_clients)?;
		self.net.borrow_mut().state = ConnectionState::Hosting;
		self.net.borrow_mut().local_client_id = ClientId::HOST;
		Ok(())
	}

	/// Begins connecting to a remote host. The manager stays in a
	/// `Connecting` state — calls route as if disconnected — until the
	/// host's client-id assignment frame arrives.
	pub fn start_client(&mut self, host: &str, port: u16) -> Result<(), ManagerError> {
		self.require_uninitialized()?;
		self.net.borrow_mut().transport.start_client(host, port)?;
		self.net.borrow_mut().state = ConnectionState::Connecting;
		Ok(())
	}

	fn require_uninitialized(&self) -> Result<(), ApiMisuseError> {
		if self.net.borrow().state != ConnectionState::Uninitialized {
			return Err(ApiMisuseError::AlreadyInitialized);
		}
		Ok(())
	}

	pub fn stop(&mut self) {
		self.net.borrow_mut().transport.stop();
		self.net.borrow_mut().state = ConnectionState::Uninitialized;
		self.clients.clear();
		self.peer_to_client.clear();
	}

	/// Registers `T` so a spawn frame naming `T::TYPE_NAME` can be
	/// instantiated here. Call this on every peer that might need to
	/// receive such a frame, before `update` can observe one.
	pub fn register_entity_type<T: NetworkedEntity + Default>(&mut self) -> Result<(), ConfigError> {
		self.registry.register_entity_type::<T>()
	}

	/// Spawns a new networked entity with host-authoritative initial state
	/// (`T::default()`), assigns it the next id, and broadcasts a spawn
	/// frame. Host-only: other peers construct their own copy from
	/// `T::default()` too when the spawn frame arrives, so any state a
	/// caller wants synced beyond type and owner has to travel over an RPC
	/// afterward.
	pub fn spawn<T: NetworkedEntity + Default>(
		&mut self,
		owner: Option<ClientId>,
	) -> Result<EntityHandle<T>, ApiMisuseError> {
		if self.role() != Role::Host {
			return Err(ApiMisuseError::NotHost);
		}
		let owner = owner.unwrap_or(ClientId::HOST);
		let table = self.registry.cache_descriptors::<T>()?;
		let id = NetworkObjectId(self.next_object_id.next());

		let cell: Rc<RefCell<T>> = Rc::new(RefCell::new(T::default()));
		let erased = cell.clone();
		self.registry
			.insert(id, T::TYPE_NAME, owner, table.clone(), erased.clone());

		let frame = Frame::Spawn {
			type_name: T::TYPE_NAME.to_owned(),
			network_object_id: id,
			owner_client_id: owner,
		};
		self.net.borrow_mut().send_to_all(&frame, Default::default());

		erased
			.borrow_mut()
			.on_spawned(&mut SpawnContext {
				network_object_id: id,
				owner_client_id: owner,
			});

		Ok(EntityHandle {
			object_id: id,
			owner,
			table,
			net: self.net.clone(),
			entity: erased,
			_marker: std::marker::PhantomData,
		})
	}

	/// Reconstructs a typed handle to an entity already in the registry,
	/// whether spawned locally or instantiated here by the spawn protocol.
	pub fn handle<T: NetworkedEntity>(&self, id: NetworkObjectId) -> Option<EntityHandle<T>> {
		let slot = self.registry.get(id)?;
		Some(EntityHandle {
			object_id: id,
			owner: slot.owner_client_id,
			table: slot.table.clone(),
			net: self.net.clone(),
			entity: slot.entity.clone(),
			_marker: std::marker::PhantomData,
		})
	}

	/// Removes an entity from this peer's registry. Local only: the wire
	/// protocol has no despawn frame, so nothing is sent.
	pub fn despawn(&mut self, id: NetworkObjectId) -> bool {
		self.registry.remove(id)
	}

	/// Polls the transport, drives the connection handshake, applies spawn
	/// frames, and dispatches RPC frames. Never blocks.
	#[instrument(skip(self))]
	pub fn update(&mut self) -> Vec<ManagerEvent> {
		let events = self.net.borrow_mut().transport.poll();
		let mut out = Vec::new();
		for event in events {
			self.handle_transport_event(event, &mut out);
		}
		out
	}

	fn handle_transport_event(&mut self, event: TransportEvent, out: &mut Vec<ManagerEvent>) {
		match event {
			TransportEvent::ClientConnected { peer } => self.on_client_connected(peer, out),
			TransportEvent::ClientDisconnected { peer } => self.on_client_disconnected(peer, out),
			TransportEvent::ConnectedToServer => {
				trace!("transport connected; awaiting client id assignment");
			}
			TransportEvent::DisconnectedFromServer => self.on_disconnected_from_server(out),
			TransportEvent::DataReceived { bytes, sender } => self.on_data_received(&bytes, sender, out),
		}
	}

	fn on_client_connected(&mut self, peer: PeerId, out: &mut Vec<ManagerEvent>) {
		if self.net.borrow().state != ConnectionState::Hosting {
			return;
		}
		let client_id = ClientId(self.next_client_id.next());
		self.clients.insert(client_id, ClientRecord { peer });
		self.peer_to_client.insert(peer, client_id);

		self.net.borrow_mut().send_to_client(
			peer,
			&Frame::client_id_assignment(client_id),
			netrpc_common::DeliveryMode::Reliable,
		);

		for (id, slot) in self.registry.iter_in_spawn_order().collect::<Vec<_>>() {
			let frame = Frame::Spawn {
				type_name: slot.type_name.to_owned(),
				network_object_id: id,
				owner_client_id: slot.owner_client_id,
			};
			self.net
				.borrow_mut()
				.send_to_client(peer, &frame, netrpc_common::DeliveryMode::Reliable);
		}

		out.push(ManagerEvent::ClientConnected(client_id));
	}

	fn on_client_disconnected(&mut self, peer: PeerId, out: &mut Vec<ManagerEvent>) {
		if let Some(client_id) = self.peer_to_client.remove(&peer) {
			self.clients.remove(&client_id);
			out.push(ManagerEvent::ClientDisconnected(client_id));
		}
	}

	fn on_disconnected_from_server(&mut self, out: &mut Vec<ManagerEvent>) {
		let mut net = self.net.borrow_mut();
		if net.state == ConnectionState::Connected || net.state == ConnectionState::Connecting {
			net.state = ConnectionState::Uninitialized;
			drop(net);
			out.push(ManagerEvent::DisconnectedFromServer);
		}
	}

	fn on_data_received(&mut self, bytes: &[u8], sender: PeerId, out: &mut Vec<ManagerEvent>) {
		let connecting = {
			let net = self.net.borrow();
			net.state == ConnectionState::Connecting
		};
		if connecting {
			if let Ok(Frame::ClientIdAssignment { client_id }) = codec::decode(bytes) {
				let mut net = self.net.borrow_mut();
				net.state = ConnectionState::Connected;
				net.local_client_id = client_id;
				drop(net);
				out.push(ManagerEvent::ConnectedToServer);
				return;
			}
		}

		let frame = match codec::decode(bytes) {
			Ok(Frame::HandshakePing) => return,
			Ok(Frame::ClientIdAssignment { .. }) => return,
			Ok(frame) => frame,
			Err(err) => {
				debug!(?err, "dropping undecodable frame");
				return;
			}
		};

		match frame {
			Frame::Spawn {
				type_name,
				network_object_id,
				owner_client_id,
			} => {
				if let Err(rejection) =
					self.apply_spawn_frame(type_name, network_object_id, owner_client_id)
				{
					warn!(%rejection, "dropping spawn frame");
				}
			}
			Frame::Rpc {
				method_name,
				network_object_id,
				args,
			} => {
				let sender_client_id = self
					.peer_to_client
					.get(&sender)
					.copied()
					.unwrap_or(ClientId::HOST);
				if let Err(rejection) =
					self.dispatch_rpc(network_object_id, &method_name, args, sender_client_id)
				{
					debug!(%rejection, "rejected inbound RPC frame");
				}
			}
			Frame::HandshakePing | Frame::ClientIdAssignment { .. } => {}
		}
	}

	fn apply_spawn_frame(
		&mut self,
		type_name: String,
		id: NetworkObjectId,
		owner_client_id: ClientId,
	) -> Result<(), DispatchRejection> {
		if self.registry.contains(id) {
			trace!(%id, "spawn frame for already-known entity, ignoring");
			return Ok(());
		}
		let Some((entity, table)) = self.registry.instantiate_by_name(&type_name) else {
			return Err(DispatchRejection::UnknownEntityType(type_name));
		};
		self.registry
			.insert(id, type_name, owner_client_id, table, entity.clone());
		entity.borrow_mut().on_spawned(&mut SpawnContext {
			network_object_id: id,
			owner_client_id,
		});
		Ok(())
	}

	#[allow(clippy::too_many_arguments)]
	fn dispatch_rpc(
		&mut self,
		id: NetworkObjectId,
		method: &str,
		args: Vec<netrpc_common::RpcValue>,
		sender: ClientId,
	) -> Result<(), DispatchRejection> {
		let role = self.role();
		let slot = self
			.registry
			.get(id)
			.ok_or(DispatchRejection::UnknownEntity(id))?;
		let descriptor = slot.table.get(method).ok_or_else(|| DispatchRejection::UnknownMethod {
			type_name: slot.type_name,
			method: method.to_owned(),
		})?;

		match (descriptor.kind, role) {
			(RpcKind::ServerBound, Role::Host) => {}
			(RpcKind::ServerBound, _) => {
				return Err(DispatchRejection::ServerBoundWhileNotHost { method: descriptor.name })
			}
			(RpcKind::ClientBound, Role::Client) => {}
			(RpcKind::ClientBound, _) => {
				return Err(DispatchRejection::ClientBoundWhileNotClient { method: descriptor.name })
			}
		}

		if descriptor.kind == RpcKind::ServerBound
			&& descriptor.options.require_ownership
			&& sender != slot.owner_client_id
		{
			return Err(DispatchRejection::NotOwner { method: descriptor.name });
		}

		if args.len() != descriptor.param_types.len() {
			return Err(DispatchRejection::ArityMismatch {
				method: descriptor.name,
				expected: descriptor.param_types.len(),
				actual: args.len(),
			});
		}

		let mut converted = Vec::with_capacity(args.len());
		for (index, (value, declared)) in args
			.into_iter()
			.zip(descriptor.param_types.iter().copied())
			.enumerate()
		{
			let widened = value
				.widen_to(declared)
				.map_err(|source| DispatchRejection::BadArgument {
					method: descriptor.name,
					index,
					source,
				})?;
			converted.push(widened);
		}

		let method_name = descriptor.name;
		let entity = slot.entity.clone();
		let mut ctx = InvokeContext {
			network_object_id: id,
			sender,
		};
		let result = catch_unwind(AssertUnwindSafe(|| {
			entity.borrow_mut().invoke_rpc(method_name, &converted, &mut ctx)
		}));
		match result {
			Ok(Ok(())) => {}
			Ok(Err(err)) => debug!(method = method_name, %err, "entity rejected RPC"),
			Err(_) => warn!(method = method_name, "entity panicked handling RPC, frame consumed"),
		}
		Ok(())
	}
}

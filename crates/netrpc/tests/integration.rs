//! End-to-end host/client round trips over [`MemoryTransport`], covering the
//! literal scenarios from spec §8: echo, broadcast, ownership rejection,
//! late join, a null argument, and the JSON fallback encoding.

use netrpc::{InvokeContext, InvokeError, Manager, ManagerEvent, NetworkedEntity, RpcCallCtx, SpawnContext};
use netrpc_common::{ClientId, DeliveryMode, Frame, NetworkObjectId, ParamType, RpcDescriptor, RpcKind, RpcOptions, RpcValue};
use netrpc_transport::memory::{MemoryHub, MemoryTransport};
use netrpc_transport::TransportEvent;

#[derive(Default)]
struct PlayerEntity {
	pings: Vec<i32>,
	name: Option<String>,
	health: f32,
	loadout: Option<serde_json::Value>,
	spawned: bool,
}

impl PlayerEntity {
	fn apply_ping(&mut self, n: i32) {
		self.pings.push(n);
	}

	fn apply_set_name(&mut self, name: Option<String>) {
		self.name = name;
	}

	fn apply_update_health(&mut self, health: f32) {
		self.health = health;
	}

	fn apply_update_loadout(&mut self, document: serde_json::Value) {
		self.loadout = Some(document);
	}

	fn ping_server_rpc(&mut self, n: i32, rpc: &mut RpcCallCtx) {
		if rpc.route("ping_server_rpc", vec![RpcValue::I32(n)]) {
			return;
		}
		self.apply_ping(n);
	}

	fn set_name_server_rpc(&mut self, name: Option<String>, rpc: &mut RpcCallCtx) {
		let arg = name.clone().map(RpcValue::String).unwrap_or(RpcValue::Null);
		if rpc.route("set_name_server_rpc", vec![arg]) {
			return;
		}
		self.apply_set_name(name);
	}

	fn update_health_client_rpc(&mut self, health: f32, rpc: &mut RpcCallCtx) {
		if rpc.route("update_health_client_rpc", vec![RpcValue::F32(health)]) {
			return;
		}
		self.apply_update_health(health);
	}

	fn update_loadout_client_rpc(&mut self, document: serde_json::Value, rpc: &mut RpcCallCtx) {
		let arg = RpcValue::Json {
			type_name: "demo::Loadout".to_owned(),
			document: document.clone(),
		};
		if rpc.route("update_loadout_client_rpc", vec![arg]) {
			return;
		}
		self.apply_update_loadout(document);
	}
}

impl NetworkedEntity for PlayerEntity {
	const TYPE_NAME: &'static str = "demo::PlayerEntity";

	fn rpc_descriptors() -> Vec<RpcDescriptor> {
		vec![
			RpcDescriptor::new(
				"ping_server_rpc",
				RpcKind::ServerBound,
				RpcOptions::server_bound_default().with_require_ownership(false),
				vec![ParamType::I32],
			),
			RpcDescriptor::new(
				"set_name_server_rpc",
				RpcKind::ServerBound,
				RpcOptions::server_bound_default(),
				vec![ParamType::String],
			),
			RpcDescriptor::new(
				"update_health_client_rpc",
				RpcKind::ClientBound,
				RpcOptions::client_bound_default(),
				vec![ParamType::F32],
			),
			RpcDescriptor::new(
				"update_loadout_client_rpc",
				RpcKind::ClientBound,
				RpcOptions::client_bound_default(),
				vec![ParamType::Dynamic],
			),
		]
	}

	fn invoke_rpc(&mut self, method: &str, args: &[RpcValue], _ctx: &mut InvokeContext) -> Result<(), InvokeError> {
		match (method, args) {
			("ping_server_rpc", [RpcValue::I32(n)]) => {
				self.apply_ping(*n);
				Ok(())
			}
			("set_name_server_rpc", [RpcValue::String(s)]) => {
				self.apply_set_name(Some(s.clone()));
				Ok(())
			}
			("set_name_server_rpc", [RpcValue::Null]) => {
				self.apply_set_name(None);
				Ok(())
			}
			("update_health_client_rpc", [RpcValue::F32(h)]) => {
				self.apply_update_health(*h);
				Ok(())
			}
			("update_loadout_client_rpc", [RpcValue::Json { document, .. }]) => {
				self.apply_update_loadout(document.clone());
				Ok(())
			}
			_ => Err(InvokeError::Application(format!("`{method}` rejected its arguments"))),
		}
	}

	fn on_spawned(&mut self, _ctx: &mut SpawnContext) {
		self.spawned = true;
	}
}

fn connect_client(hub: &MemoryHub, port: u16) -> Manager {
	let mut client = Manager::new(MemoryTransport::new(hub.clone()));
	client.register_entity_type::<PlayerEntity>().unwrap();
	client.start_client("localhost", port).unwrap();
	client
}

fn pump_until(managers: &mut [&mut Manager], mut pred: impl FnMut(&[Vec<ManagerEvent>]) -> bool) {
	for _ in 0..64 {
		let events: Vec<_> = managers.iter_mut().map(|m| m.update()).collect();
		if pred(&events) {
			return;
		}
	}
	panic!("condition never became true within 64 ticks");
}

fn host_with_hub() -> (MemoryHub, Manager) {
	let hub = MemoryHub::new();
	let mut host = Manager::new(MemoryTransport::new(hub.clone()));
	host.register_entity_type::<PlayerEntity>().unwrap();
	host.start_server(7777, 32).unwrap();
	(hub, host)
}

#[test]
fn echo_server_bound_rpc_executes_once_on_host_only() {
	let (hub, mut host) = host_with_hub();
	let mut client = connect_client(&hub, 7777);

	pump_until(
		&mut [&mut host, &mut client],
		|events| events[1].contains(&ManagerEvent::ConnectedToServer),
	);

	let server_handle = host.spawn::<PlayerEntity>(None).unwrap();
	let id = server_handle.network_object_id();
	pump_until(&mut [&mut host, &mut client], |_| true);

	let client_handle = client.handle::<PlayerEntity>(id).expect("client has the spawned entity");
	client_handle.call(|entity, rpc| entity.ping_server_rpc(42, rpc));

	// Client routed the call away: nothing executed locally yet.
	assert!(client_handle.borrow().pings.is_empty());

	pump_until(&mut [&mut host, &mut client], |_| true);

	assert_eq!(server_handle.borrow().pings, vec![42]);
	assert!(client_handle.borrow().pings.is_empty());
}

#[test]
fn broadcast_client_bound_rpc_executes_on_host_and_every_client() {
	let (hub, mut host) = host_with_hub();
	let mut client_a = connect_client(&hub, 7777);
	let mut client_b = connect_client(&hub, 7777);

	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer) && events[2].contains(&ManagerEvent::ConnectedToServer)
	});

	let server_handle = host.spawn::<PlayerEntity>(None).unwrap();
	let id = server_handle.network_object_id();
	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |_| true);

	server_handle.call(|entity, rpc| entity.update_health_client_rpc(75.0, rpc));
	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |_| true);

	assert_eq!(server_handle.borrow().health, 75.0);
	let handle_a = client_a.handle::<PlayerEntity>(id).unwrap();
	let handle_b = client_b.handle::<PlayerEntity>(id).unwrap();
	assert_eq!(handle_a.borrow().health, 75.0);
	assert_eq!(handle_b.borrow().health, 75.0);
}

#[test]
fn ownership_gate_blocks_emission_from_a_non_owner_client() {
	let (hub, mut host) = host_with_hub();
	let mut client_a = connect_client(&hub, 7777); // will own the entity
	let mut client_b = connect_client(&hub, 7777); // does not own it

	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer) && events[2].contains(&ManagerEvent::ConnectedToServer)
	});
	let client_a_id = client_a.local_client_id();

	let server_handle = host.spawn::<PlayerEntity>(Some(client_a_id)).unwrap();
	let id = server_handle.network_object_id();
	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |_| true);

	let handle_b = client_b.handle::<PlayerEntity>(id).unwrap();
	assert_ne!(handle_b.owner_client_id(), client_b.local_client_id());
	handle_b.call(|entity, rpc| entity.set_name_server_rpc(Some("mallory".to_owned()), rpc));
	pump_until(&mut [&mut host, &mut client_a, &mut client_b], |_| true);

	assert_eq!(server_handle.borrow().name, None, "non-owner's call must never reach the server");
}

#[test]
fn server_authoritatively_rejects_a_forged_frame_from_a_non_owner() {
	// Bypasses the client-side interceptor entirely: a raw transport stands
	// in for a client that ignores its own ownership gate, so this exercises
	// the server's own re-validation rather than the client's cooperation.
	let (hub, mut host) = host_with_hub();
	let mut client_a = connect_client(&hub, 7777);
	pump_until(&mut [&mut host, &mut client_a], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer)
	});
	let client_a_id = client_a.local_client_id();

	let server_handle = host.spawn::<PlayerEntity>(Some(client_a_id)).unwrap();
	let id = server_handle.network_object_id();
	host.update();

	let mut forger = MemoryTransport::new(hub);
	forger.start_client("localhost", 7777).unwrap();
	forger.poll();

	let frame = Frame::Rpc {
		method_name: "set_name_server_rpc".to_owned(),
		network_object_id: id,
		args: vec![RpcValue::String("mallory".to_owned())],
	};
	let bytes = netrpc_common::codec::encode(&frame).unwrap();
	forger
		.send_to_server(bytes, DeliveryMode::Reliable)
		.unwrap();

	host.update();

	assert_eq!(server_handle.borrow().name, None);
}

#[test]
fn late_joiner_receives_spawns_in_order_before_any_rpc() {
	let (hub, mut host) = host_with_hub();

	let e1 = host.spawn::<PlayerEntity>(None).unwrap();
	let e2 = host.spawn::<PlayerEntity>(None).unwrap();
	let e3 = host.spawn::<PlayerEntity>(None).unwrap();
	host.update();

	let mut joiner = connect_client(&hub, 7777);
	pump_until(&mut [&mut host, &mut joiner], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer)
	});
	pump_until(&mut [&mut host, &mut joiner], |_| true);

	assert!(joiner.handle::<PlayerEntity>(e1.network_object_id()).is_some());
	assert!(joiner.handle::<PlayerEntity>(e2.network_object_id()).is_some());
	let joiner_e2 = joiner.handle::<PlayerEntity>(e3.network_object_id()).unwrap();
	assert!(joiner_e2.borrow().spawned);

	let id2 = e2.network_object_id();
	e2.call(|entity, rpc| entity.update_health_client_rpc(12.0, rpc));
	pump_until(&mut [&mut host, &mut joiner], |_| true);
	let joiner_handle_e2 = joiner.handle::<PlayerEntity>(id2).unwrap();
	assert_eq!(joiner_handle_e2.borrow().health, 12.0);
}

#[test]
fn null_argument_round_trips_without_a_decode_error() {
	let (hub, mut host) = host_with_hub();
	let mut client = connect_client(&hub, 7777);
	pump_until(&mut [&mut host, &mut client], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer)
	});
	let client_id = client.local_client_id();

	let server_handle = host.spawn::<PlayerEntity>(Some(client_id)).unwrap();
	let id = server_handle.network_object_id();
	pump_until(&mut [&mut host, &mut client], |_| true);

	let client_handle = client.handle::<PlayerEntity>(id).unwrap();
	client_handle.call(|entity, rpc| entity.set_name_server_rpc(None, rpc));
	pump_until(&mut [&mut host, &mut client], |_| true);

	assert_eq!(server_handle.borrow().name, None);
}

#[test]
fn fallback_json_value_is_structurally_equal_after_broadcast() {
	let (hub, mut host) = host_with_hub();
	let mut client = connect_client(&hub, 7777);
	pump_until(&mut [&mut host, &mut client], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer)
	});

	let server_handle = host.spawn::<PlayerEntity>(None).unwrap();
	let id = server_handle.network_object_id();
	pump_until(&mut [&mut host, &mut client], |_| true);

	let document = serde_json::json!({"primary": "sword", "secondary": "shield", "level": 3});
	server_handle.call(|entity, rpc| entity.update_loadout_client_rpc(document.clone(), rpc));
	pump_until(&mut [&mut host, &mut client], |_| true);

	let client_handle = client.handle::<PlayerEntity>(id).unwrap();
	assert_eq!(client_handle.borrow().loadout, Some(document));
}

#[test]
fn counters_are_strictly_increasing_within_a_session() {
	let (_hub, mut host) = host_with_hub();
	let first = host.spawn::<PlayerEntity>(None).unwrap();
	let second = host.spawn::<PlayerEntity>(None).unwrap();
	let third = host.spawn::<PlayerEntity>(None).unwrap();
	assert!(first.network_object_id().0 < second.network_object_id().0);
	assert!(second.network_object_id().0 < third.network_object_id().0);
}

#[test]
fn spawn_is_idempotent_when_the_same_frame_is_applied_twice() {
	// Drives the host side with a bare `MemoryTransport` instead of a
	// `Manager`, so the same encoded spawn frame can be redelivered on
	// purpose — `Manager::spawn` itself never sends a frame twice.
	let hub = MemoryHub::new();
	let mut host_transport = MemoryTransport::new(hub.clone());
	host_transport.start_server(7777, 32).unwrap();

	let mut client = connect_client(&hub, 7777);

	let mut peer = None;
	for _ in 0..16 {
		for event in host_transport.poll() {
			if let TransportEvent::ClientConnected { peer: p } = event {
				peer = Some(p);
			}
		}
		if peer.is_some() {
			break;
		}
		client.update();
	}
	let peer = peer.expect("client never connected to the bare host transport");

	let assignment = Frame::client_id_assignment(ClientId(1));
	host_transport
		.send_to_client(peer, netrpc_common::codec::encode(&assignment).unwrap(), DeliveryMode::Reliable)
		.unwrap();
	for _ in 0..16 {
		if client.update().contains(&ManagerEvent::ConnectedToServer) {
			break;
		}
	}

	let id = NetworkObjectId(5);
	let spawn_bytes = netrpc_common::codec::encode(&Frame::Spawn {
		type_name: PlayerEntity::TYPE_NAME.to_owned(),
		network_object_id: id,
		owner_client_id: ClientId::HOST,
	})
	.unwrap();
	host_transport.send_to_client(peer, spawn_bytes.clone(), DeliveryMode::Reliable).unwrap();
	for _ in 0..4 {
		client.update();
	}

	client
		.handle::<PlayerEntity>(id)
		.unwrap()
		.call(|entity, _| entity.apply_ping(9));

	// Redeliver the identical spawn frame; it must be a no-op rather than
	// replacing the live (and now mutated) entity.
	host_transport.send_to_client(peer, spawn_bytes, DeliveryMode::Reliable).unwrap();
	for _ in 0..4 {
		client.update();
	}

	assert_eq!(
		client.handle::<PlayerEntity>(id).unwrap().borrow().pings,
		vec![9],
		"re-applying the same spawn frame must not replace the live entity"
	);
}

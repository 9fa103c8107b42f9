//! A tiny demo that plays out the literal end-to-end scenarios from the
//! framework's testable-properties section against an in-process
//! `MemoryTransport`: echo, broadcast, and a late joiner catching up via
//! spawn sync.
//!
//! `netrpc-transport`'s reference transport is a process-local channel
//! fixture rather than a real socket, so this binary drives a host
//! `Manager` and two client `Manager`s side by side from a single tick
//! loop instead of launching separate host/client processes.

mod entity;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use entity::PlayerEntity;
use netrpc::{Manager, ManagerEvent};
use netrpc_transport::memory::{MemoryHub, MemoryTransport};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
struct Args {
	/// Port the in-process host listens on.
	#[clap(long, default_value_t = 7777)]
	port: u16,
	/// Maximum number of simultaneous clients the host accepts.
	#[clap(long, default_value_t = 32)]
	max_clients: u32,
}

fn pump(managers: &mut [&mut Manager]) -> Vec<Vec<ManagerEvent>> {
	managers.iter_mut().map(|m| m.update()).collect()
}

fn pump_until(managers: &mut [&mut Manager], mut pred: impl FnMut(&[Vec<ManagerEvent>]) -> bool) -> Result<()> {
	for _ in 0..256 {
		let events = pump(managers);
		if pred(&events) {
			return Ok(());
		}
	}
	Err(eyre!("condition never became true within 256 ticks"))
}

fn main() -> Result<()> {
	color_eyre::install()?;

	let env_filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env_lossy();
	tracing_subscriber::fmt()
		.with_target(true)
		.with_level(true)
		.with_env_filter(env_filter)
		.init();

	let args = Args::parse();

	let hub = MemoryHub::new();

	let mut host = Manager::new(MemoryTransport::new(hub.clone()));
	host.register_entity_type::<PlayerEntity>()?;
	host.start_server(args.port, args.max_clients)?;
	info!(port = args.port, "host listening");

	let mut alice = Manager::new(MemoryTransport::new(hub.clone()));
	alice.register_entity_type::<PlayerEntity>()?;
	alice.start_client("localhost", args.port)?;

	pump_until(&mut [&mut host, &mut alice], |events| {
		events[1].contains(&ManagerEvent::ConnectedToServer)
	})?;
	info!(client_id = alice.local_client_id().0, "alice connected");

	// Echo scenario: alice renames her own avatar; only the host executes
	// the server-bound call.
	let alice_id = alice.local_client_id();
	let server_avatar = host.spawn::<PlayerEntity>(Some(alice_id))?;
	pump_until(&mut [&mut host, &mut alice], |_| true)?;

	let alice_avatar = alice
		.handle::<PlayerEntity>(server_avatar.network_object_id())
		.ok_or_else(|| eyre!("alice never received the spawn frame"))?;
	alice_avatar.call(|player, rpc| player.set_name_server_rpc(Some("Alice".to_owned()), rpc));
	pump_until(&mut [&mut host, &mut alice], |_| true)?;
	info!(name = ?server_avatar.borrow().name, "host applied alice's rename");

	// Broadcast scenario: the host updates health and every connected peer,
	// itself included, converges on the new value.
	let mut bob = Manager::new(MemoryTransport::new(hub.clone()));
	bob.register_entity_type::<PlayerEntity>()?;
	bob.start_client("localhost", args.port)?;
	pump_until(&mut [&mut host, &mut alice, &mut bob], |events| {
		events[2].contains(&ManagerEvent::ConnectedToServer)
	})?;
	info!(client_id = bob.local_client_id().0, "bob connected as a late joiner");

	// Late join: bob receives alice's avatar via spawn sync despite having
	// connected after it existed.
	let bob_view = bob
		.handle::<PlayerEntity>(server_avatar.network_object_id())
		.ok_or_else(|| eyre!("bob never received the late-joiner spawn sync"))?;
	info!(name = ?bob_view.borrow().name, "bob's view of alice's avatar after late join");

	server_avatar.call(|player, rpc| player.update_health_client_rpc(75.0, rpc));
	pump_until(&mut [&mut host, &mut alice, &mut bob], |_| true)?;

	info!(
		host = server_avatar.borrow().health,
		alice = alice_avatar.borrow().health,
		bob = bob_view.borrow().health,
		"health converged across host and every client"
	);

	host.stop();
	alice.stop();
	bob.stop();
	Ok(())
}

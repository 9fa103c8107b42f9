//! A minimal networked entity, in the style §9 recommends for a
//! reimplementation without reflection: RPC methods are ordinary inherent
//! methods that call [`RpcCallCtx::route`] as their first line, and the
//! fixed descriptor table is declared once in [`NetworkedEntity::rpc_descriptors`].

use netrpc::{InvokeContext, InvokeError, NetworkedEntity, RpcCallCtx, SpawnContext};
use netrpc_common::{ParamType, RpcDescriptor, RpcKind, RpcOptions, RpcValue};
use tracing::info;

/// A toy player avatar: owns a health value and a name, both of which are
/// client-bound/server-bound RPC targets respectively.
#[derive(Default)]
pub struct PlayerEntity {
	pub name: Option<String>,
	pub health: f32,
}

impl PlayerEntity {
	/// Server-bound: any client may rename its own avatar.
	pub fn set_name_server_rpc(&mut self, name: Option<String>, rpc: &mut RpcCallCtx) {
		let arg = name.clone().map(RpcValue::String).unwrap_or(RpcValue::Null);
		if rpc.route("set_name_server_rpc", vec![arg]) {
			return;
		}
		self.apply_set_name(name);
	}

	/// Client-bound: only the host calls this, broadcasting the new value.
	pub fn update_health_client_rpc(&mut self, health: f32, rpc: &mut RpcCallCtx) {
		if rpc.route("update_health_client_rpc", vec![RpcValue::F32(health)]) {
			return;
		}
		self.apply_update_health(health);
	}

	fn apply_set_name(&mut self, name: Option<String>) {
		info!(?name, "name updated");
		self.name = name;
	}

	fn apply_update_health(&mut self, health: f32) {
		info!(health, "health updated");
		self.health = health;
	}
}

impl NetworkedEntity for PlayerEntity {
	const TYPE_NAME: &'static str = "echo_demo::PlayerEntity";

	fn rpc_descriptors() -> Vec<RpcDescriptor> {
		vec![
			RpcDescriptor::new(
				"set_name_server_rpc",
				RpcKind::ServerBound,
				RpcOptions::server_bound_default().with_require_ownership(false),
				vec![ParamType::String],
			),
			RpcDescriptor::new(
				"update_health_client_rpc",
				RpcKind::ClientBound,
				RpcOptions::client_bound_default(),
				vec![ParamType::F32],
			),
		]
	}

	fn invoke_rpc(&mut self, method: &str, args: &[RpcValue], _ctx: &mut InvokeContext) -> Result<(), InvokeError> {
		match (method, args) {
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
			_ => Err(InvokeError::Application(format!("`{method}` rejected its arguments"))),
		}
	}

	fn on_spawned(&mut self, ctx: &mut SpawnContext) {
		info!(
			id = ctx.network_object_id.0,
			owner = ctx.owner_client_id.0,
			"player entity spawned"
		);
	}
}

//! The networked entity contract and its type-erased storage form.

use std::any::Any;
use std::collections::HashMap;

use netrpc_common::{ClientId, NetworkObjectId, RpcDescriptor, RpcValue};

use crate::error::InvokeError;

/// Context handed to [`NetworkedEntity::invoke_rpc`] for an inbound,
/// already-validated call.
pub struct InvokeContext {
	pub network_object_id: NetworkObjectId,
	pub sender: ClientId,
}

/// Context handed to [`NetworkedEntity::on_spawned`].
pub struct SpawnContext {
	pub network_object_id: NetworkObjectId,
	pub owner_client_id: ClientId,
}

/// An application type that can be spawned as a networked object and carry
/// RPC methods.
///
/// There is no reflection or attribute-based method discovery here: a type
/// declares its RPC surface once, up front, via [`Self::rpc_descriptors`],
/// and dispatches inbound calls itself in [`Self::invoke_rpc`]. Each RPC
/// method is still written as an ordinary inherent method on the type; the
/// pair below only wires that method into the framework's routing and
/// inbound dispatch.
pub trait NetworkedEntity: 'static {
	/// A stable, globally unique name for this type (for example a
	/// fully-qualified Rust path string). Used on the wire by the spawn
	/// protocol and must be registered with the same factory on every peer
	/// that might receive a spawn frame naming it.
	const TYPE_NAME: &'static str
	where
		Self: Sized;

	/// The fixed RPC surface for this type, declared once. Order is
	/// insignificant; names must be unique within the type.
	fn rpc_descriptors() -> Vec<RpcDescriptor>
	where
		Self: Sized;

	/// Executes the method named by an inbound frame directly, bypassing
	/// outbound routing: the caller has already checked role, ownership and
	/// argument widening before this runs.
	fn invoke_rpc(
		&mut self,
		method: &str,
		args: &[RpcValue],
		ctx: &mut InvokeContext,
	) -> Result<(), InvokeError>;

	/// Called once after this entity is inserted into the registry, on
	/// every peer: on the host right after [`crate::Manager::spawn`], on
	/// other peers right after a spawn frame instantiates it.
	fn on_spawned(&mut self, _ctx: &mut SpawnContext) {}
}

/// The cached, O(1)-lookup form of a type's [`RpcDescriptor`] list. Built
/// once per type (see [`crate::Registry::cache_descriptors`]) and shared by
/// every instance of that type, which subsumes the common "per-entity method
/// cache" optimization: the descriptor data never varies per instance.
pub struct RpcTable {
	descriptors: Vec<RpcDescriptor>,
	index: HashMap<&'static str, usize>,
}

impl RpcTable {
	pub(crate) fn build(descriptors: Vec<RpcDescriptor>) -> Result<Self, (&'static str,)> {
		let mut index = HashMap::with_capacity(descriptors.len());
		for (i, d) in descriptors.iter().enumerate() {
			if index.insert(d.name, i).is_some() {
				return Err((d.name,));
			}
		}
		Ok(Self { descriptors, index })
	}

	pub fn get(&self, method: &str) -> Option<&RpcDescriptor> {
		self.index.get(method).map(|&i| &self.descriptors[i])
	}
}

/// Type-erased form of a [`NetworkedEntity`], stored in the registry so the
/// manager can dispatch inbound frames without knowing the concrete type.
pub(crate) trait ErasedEntity: Any {
	fn invoke_rpc(
		&mut self,
		method: &str,
		args: &[RpcValue],
		ctx: &mut InvokeContext,
	) -> Result<(), InvokeError>;
	fn on_spawned(&mut self, ctx: &mut SpawnContext);
	fn as_any(&self) -> &dyn Any;
	fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: NetworkedEntity> ErasedEntity for T {
	fn invoke_rpc(
		&mut self,
		method: &str,
		args: &[RpcValue],
		ctx: &mut InvokeContext,
	) -> Result<(), InvokeError> {
		NetworkedEntity::invoke_rpc(self, method, args, ctx)
	}

	fn on_spawned(&mut self, ctx: &mut SpawnContext) {
		NetworkedEntity::on_spawned(self, ctx)
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

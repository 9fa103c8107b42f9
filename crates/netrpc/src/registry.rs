//! The process-wide table of live networked entities and the per-type
//! descriptor/factory caches the spawn protocol and dispatch rely on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use netrpc_common::{ClientId, NetworkObjectId};

use crate::entity::{ErasedEntity, NetworkedEntity, RpcTable};
use crate::error::ConfigError;

type Factory = Box<dyn Fn() -> (Rc<RefCell<dyn ErasedEntity>>, Rc<RpcTable>)>;

pub(crate) struct EntitySlot {
	pub type_name: String,
	pub owner_client_id: ClientId,
	pub table: Rc<RpcTable>,
	pub entity: Rc<RefCell<dyn ErasedEntity>>,
}

/// Owns every live entity on this peer, the per-type RPC descriptor cache,
/// and the type-name-to-factory map the spawn protocol uses to instantiate
/// entities it only knows by name.
#[derive(Default)]
pub struct Registry {
	entities: HashMap<NetworkObjectId, EntitySlot>,
	spawn_order: Vec<NetworkObjectId>,
	descriptor_cache: HashMap<&'static str, Rc<RpcTable>>,
	factories: HashMap<String, Factory>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, id: NetworkObjectId) -> bool {
		self.entities.contains_key(&id)
	}

	pub(crate) fn get(&self, id: NetworkObjectId) -> Option<&EntitySlot> {
		self.entities.get(&id)
	}

	/// Entities in the order they were first inserted, which is the order
	/// late-joiner spawn sync replays them in.
	pub(crate) fn iter_in_spawn_order(&self) -> impl Iterator<Item = (NetworkObjectId, &EntitySlot)> {
		self.spawn_order
			.iter()
			.filter_map(|id| self.entities.get(id).map(|slot| (*id, slot)))
	}

	pub(crate) fn insert(
		&mut self,
		id: NetworkObjectId,
		type_name: impl Into<String>,
		owner_client_id: ClientId,
		table: Rc<RpcTable>,
		entity: Rc<RefCell<dyn ErasedEntity>>,
	) {
		if self
			.entities
			.insert(
				id,
				EntitySlot {
					type_name: type_name.into(),
					owner_client_id,
					table,
					entity,
				},
			)
			.is_none()
		{
			self.spawn_order.push(id);
		}
	}

	/// Removes an entity from this peer's registry. Purely local: the
	/// closed frame set has no despawn discriminator, so teardown is never
	/// propagated over the wire by the framework itself.
	pub fn remove(&mut self, id: NetworkObjectId) -> bool {
		if self.entities.remove(&id).is_some() {
			self.spawn_order.retain(|&o| o != id);
			true
		} else {
			false
		}
	}

	/// Builds and caches the RPC descriptor table for `T`, or returns the
	/// table already cached from a previous call. The one place a
	/// duplicate-method-name mistake is caught.
	pub fn cache_descriptors<T: NetworkedEntity>(&mut self) -> Result<Rc<RpcTable>, ConfigError> {
		if let Some(table) = self.descriptor_cache.get(T::TYPE_NAME) {
			return Ok(table.clone());
		}
		let table = Rc::new(RpcTable::build(T::rpc_descriptors()).map_err(|(method,)| {
			ConfigError::DuplicateMethod {
				type_name: T::TYPE_NAME,
				method,
			}
		})?);
		self.descriptor_cache.insert(T::TYPE_NAME, table.clone());
		Ok(table)
	}

	/// Registers `T` so that a spawn frame naming `T::TYPE_NAME` can be
	/// instantiated on this peer. Must be called for every entity type a
	/// peer might receive a spawn frame for, independently of whether that
	/// peer ever calls [`crate::Manager::spawn`] with `T` itself.
	pub fn register_entity_type<T: NetworkedEntity + Default>(&mut self) -> Result<(), ConfigError> {
		let table = self.cache_descriptors::<T>()?;
		self.factories.insert(
			T::TYPE_NAME.to_owned(),
			Box::new(move || {
				let cell: Rc<RefCell<T>> = Rc::new(RefCell::new(T::default()));
				let erased: Rc<RefCell<dyn ErasedEntity>> = cell;
				(erased, table.clone())
			}),
		);
		Ok(())
	}

	pub(crate) fn instantiate_by_name(
		&self,
		type_name: &str,
	) -> Option<(Rc<RefCell<dyn ErasedEntity>>, Rc<RpcTable>)> {
		self.factories.get(type_name).map(|factory| factory())
	}
}

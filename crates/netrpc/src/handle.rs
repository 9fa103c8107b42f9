//! The typed, application-facing view of a spawned entity.

use std::cell::{Ref, RefCell, RefMut};
use std::marker::PhantomData;
use std::rc::Rc;

use netrpc_common::{ClientId, NetworkObjectId, RpcValue};

use crate::entity::{ErasedEntity, NetworkedEntity, RpcTable};
use crate::interceptor::route_outbound;
use crate::state::NetworkState;

/// Passed into every RPC method body as the first argument. Call
/// [`Self::route`] as the first line of the body: `if rpc.route("foo",
/// vec![...]) { return; }`.
pub struct RpcCallCtx {
	object_id: NetworkObjectId,
	owner: ClientId,
	table: Rc<RpcTable>,
	net: Rc<RefCell<NetworkState>>,
}

impl RpcCallCtx {
	/// Looks up `method` in this entity type's descriptor table and applies
	/// the routing decision table. Returns `true` if the method body should
	/// return immediately without running.
	///
	/// # Panics
	/// Panics if `method` wasn't declared in `T::rpc_descriptors()` — this
	/// indicates the hand-written stub and the descriptor list have drifted
	/// apart, a programming error rather than a runtime condition.
	pub fn route(&mut self, method: &'static str, args: Vec<RpcValue>) -> bool {
		let descriptor = self
			.table
			.get(method)
			.unwrap_or_else(|| panic!("`{method}` has no matching RpcDescriptor"));
		route_outbound(&self.net, self.object_id, self.owner, descriptor, args)
	}
}

/// A typed handle to a networked entity, returned by [`crate::Manager::spawn`]
/// and [`crate::Manager::handle`]. Cloning is cheap and all clones refer to
/// the same underlying entity.
pub struct EntityHandle<T> {
	pub(crate) object_id: NetworkObjectId,
	pub(crate) owner: ClientId,
	pub(crate) table: Rc<RpcTable>,
	pub(crate) net: Rc<RefCell<NetworkState>>,
	pub(crate) entity: Rc<RefCell<dyn ErasedEntity>>,
	pub(crate) _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityHandle<T> {
	fn clone(&self) -> Self {
		Self {
			object_id: self.object_id,
			owner: self.owner,
			table: self.table.clone(),
			net: self.net.clone(),
			entity: self.entity.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T: NetworkedEntity> EntityHandle<T> {
	pub fn network_object_id(&self) -> NetworkObjectId {
		self.object_id
	}

	pub fn owner_client_id(&self) -> ClientId {
		self.owner
	}

	fn downcast(cell: &mut dyn ErasedEntity) -> &mut T {
		cell.as_any_mut()
			.downcast_mut::<T>()
			.expect("EntityHandle<T> type parameter doesn't match the stored entity")
	}

	pub fn borrow(&self) -> Ref<'_, T> {
		Ref::map(self.entity.borrow(), |e| {
			e.as_any().downcast_ref::<T>().expect("type mismatch")
		})
	}

	pub fn borrow_mut(&self) -> RefMut<'_, T> {
		RefMut::map(self.entity.borrow_mut(), Self::downcast)
	}

	/// Runs `f` against the entity with a fresh [`RpcCallCtx`]. Application
	/// RPC methods are ordinary inherent methods taking `&mut RpcCallCtx` as
	/// their first parameter; call them through this closure.
	pub fn call<R>(&self, f: impl FnOnce(&mut T, &mut RpcCallCtx) -> R) -> R {
		let mut guard = self.entity.borrow_mut();
		let entity = Self::downcast(&mut *guard);
		let mut ctx = RpcCallCtx {
			object_id: self.object_id,
			owner: self.owner,
			table: self.table.clone(),
			net: self.net.clone(),
		};
		f(entity, &mut ctx)
	}
}

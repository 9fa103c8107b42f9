//! The outbound routing decision table.
//!
//! A Rust entity method has no "is this call local or remote" ambient
//! context the way a dynamic-proxy interceptor does: the method body has to
//! ask explicitly. [`RpcCallCtx::route`] is that ask, called as the very
//! first line of every RPC method's body; its boolean result tells the
//! caller whether to return immediately (the call was routed over the
//! network, or suppressed) or to fall through and run the body (the call
//! executes locally, here and now).

use std::cell::RefCell;
use std::rc::Rc;

use netrpc_common::{ClientId, Frame, NetworkObjectId, RpcDescriptor, RpcKind, RpcValue};

use crate::role::Role;
use crate::state::NetworkState;

/// `true`: suppress the method body, the call has been fully handled
/// (forwarded over the network, or dropped because it isn't allowed from
/// here). `false`: fall through and run the body now.
pub(crate) fn route_outbound(
	net: &Rc<RefCell<NetworkState>>,
	object_id: NetworkObjectId,
	owner: ClientId,
	descriptor: &RpcDescriptor,
	args: Vec<RpcValue>,
) -> bool {
	let mut net = net.borrow_mut();
	let role = net.role();
	match (descriptor.kind, role) {
		// Host calling one of its own server-bound methods: that's the
		// implementation running locally, not a remote call.
		(RpcKind::ServerBound, Role::Host) => false,

		(RpcKind::ServerBound, Role::Client) => {
			if descriptor.options.require_ownership && net.local_client_id != owner {
				return true;
			}
			let frame = Frame::Rpc {
				method_name: descriptor.name.to_owned(),
				network_object_id: object_id,
				args,
			};
			net.send_to_server(&frame, descriptor.options.delivery_mode);
			true
		}

		(RpcKind::ServerBound, Role::Disconnected) => true,

		(RpcKind::ClientBound, Role::Host) => {
			if descriptor.options.require_ownership && net.local_client_id != owner {
				return true;
			}
			let frame = Frame::Rpc {
				method_name: descriptor.name.to_owned(),
				network_object_id: object_id,
				args,
			};
			net.send_to_all(&frame, descriptor.options.delivery_mode);
			// The host also runs the body itself: broadcasting doesn't loop
			// a copy back to the sender over its own transport.
			false
		}

		// A client calling one of its own client-bound methods (typically
		// because the manager just dispatched it from an inbound frame and
		// the entity's public wrapper was invoked along the way): run it.
		(RpcKind::ClientBound, Role::Client) => false,

		// Not connected to anything: nothing to broadcast to, so a
		// client-bound call just runs locally.
		(RpcKind::ClientBound, Role::Disconnected) => false,
	}
}

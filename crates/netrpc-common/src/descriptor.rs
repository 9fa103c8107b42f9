//! RPC method metadata (§3 "RPC Descriptor").

use crate::value::ParamType;

/// How a frame should be delivered by the transport (§4.6, GLOSSARY).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DeliveryMode {
	/// Ordered, guaranteed delivery.
	Reliable,
	/// Best-effort, no ordering or retransmission guarantee.
	Unreliable,
	/// Drops stale frames instead of retransmitting or reordering them.
	UnreliableSequenced,
}

impl Default for DeliveryMode {
	fn default() -> Self {
		Self::Reliable
	}
}

/// Which direction an RPC method is meant to travel (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RpcKind {
	/// Callable by a client, executed on the host.
	ServerBound,
	/// Callable by the host, executed on every client (and the host itself).
	ClientBound,
}

/// Per-method options carried by the attribute/registration (§3).
///
/// Defaults differ by [`RpcKind`]: server-bound RPCs default
/// `require_ownership = true`; client-bound RPCs default
/// `require_ownership = false`. Both default to [`DeliveryMode::Reliable`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct RpcOptions {
	pub require_ownership: bool,
	pub delivery_mode: DeliveryMode,
}

impl RpcOptions {
	/// The default options for a [`RpcKind::ServerBound`] method:
	/// `require_ownership = true`, `delivery_mode = Reliable`.
	pub const fn server_bound_default() -> Self {
		Self {
			require_ownership: true,
			delivery_mode: DeliveryMode::Reliable,
		}
	}

	/// The default options for a [`RpcKind::ClientBound`] method:
	/// `require_ownership = false`, `delivery_mode = Reliable`.
	pub const fn client_bound_default() -> Self {
		Self {
			require_ownership: false,
			delivery_mode: DeliveryMode::Reliable,
		}
	}

	pub const fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
		self.delivery_mode = mode;
		self
	}

	pub const fn with_require_ownership(mut self, require: bool) -> Self {
		self.require_ownership = require;
		self
	}
}

/// The cached metadata for one RPC method (§3, §4.2).
#[derive(Debug, Clone)]
pub struct RpcDescriptor {
	pub name: &'static str,
	pub kind: RpcKind,
	pub options: RpcOptions,
	pub param_types: Vec<ParamType>,
}

impl RpcDescriptor {
	pub fn new(
		name: &'static str,
		kind: RpcKind,
		options: RpcOptions,
		param_types: Vec<ParamType>,
	) -> Self {
		Self {
			name,
			kind,
			options,
			param_types,
		}
	}
}

//! `netrpc`: a lightweight networked-object RPC framework modeled after
//! game-engine "netcode" systems.
//!
//! Application code declares a [`NetworkedEntity`], spawns it through
//! [`Manager::spawn`], and calls RPC methods on the returned [`EntityHandle`].
//! Whether a call executes locally, is forwarded to the host, or is
//! broadcast to every client is decided by [`interceptor::route_outbound`]
//! from the method's [`netrpc_common::RpcDescriptor`] and the manager's
//! current [`Role`] — never by the caller.

pub mod entity;
pub mod error;
pub mod handle;
mod interceptor;
pub mod manager;
pub mod registry;
pub mod role;
mod state;

pub use entity::{InvokeContext, NetworkedEntity, RpcTable, SpawnContext};
pub use error::{ApiMisuseError, ConfigError, DispatchRejection, InvokeError, ManagerError};
pub use handle::{EntityHandle, RpcCallCtx};
pub use manager::{Manager, ManagerEvent};
pub use registry::Registry;
pub use role::Role;

pub use netrpc_common as common;
pub use netrpc_transport as transport;

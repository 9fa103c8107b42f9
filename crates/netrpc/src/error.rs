use netrpc_common::WideningError;
use netrpc_transport::TransportError;

/// Registration-time failures: surfaced synchronously from the call that
/// registers or instantiates a type, never discovered later mid-session.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
	#[error("type `{type_name}` registers RPC method `{method}` more than once")]
	DuplicateMethod {
		type_name: &'static str,
		method: &'static str,
	},
}

/// Misuse of the manager's API surface: calling it in a connection state it
/// doesn't support.
#[derive(thiserror::Error, Debug)]
pub enum ApiMisuseError {
	#[error("manager is already initialized; call stop() first")]
	AlreadyInitialized,
	#[error("spawn() requires the manager to be hosting")]
	NotHost,
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Failures starting a server or client, surfaced synchronously to the
/// caller rather than as a later disconnect event.
#[derive(thiserror::Error, Debug)]
pub enum ManagerError {
	#[error(transparent)]
	ApiMisuse(#[from] ApiMisuseError),
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Why an inbound RPC frame was dropped instead of executed. These never
/// propagate to the caller of [`crate::Manager::update`] — they're logged
/// and the frame is consumed either way.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum DispatchRejection {
	#[error("no entity with id {0}")]
	UnknownEntity(netrpc_common::NetworkObjectId),
	#[error("entity `{type_name}` has no RPC method named `{method}`")]
	UnknownMethod {
		type_name: &'static str,
		method: String,
	},
	#[error("method `{method}` is server-bound but was received while not hosting")]
	ServerBoundWhileNotHost { method: &'static str },
	#[error("method `{method}` is client-bound but was received while not a connected client")]
	ClientBoundWhileNotClient { method: &'static str },
	#[error("method `{method}` requires ownership; sender is not the owner")]
	NotOwner { method: &'static str },
	#[error("argument {index} for `{method}` could not be converted: {source}")]
	BadArgument {
		method: &'static str,
		index: usize,
		#[source]
		source: WideningError,
	},
	#[error("`{method}` expects {expected} argument(s), frame carried {actual}")]
	ArityMismatch {
		method: &'static str,
		expected: usize,
		actual: usize,
	},
	#[error("spawn frame named unregistered entity type `{0}`")]
	UnknownEntityType(String),
}

/// An entity's `invoke_rpc` rejected or panicked while handling an already
/// dispatch-validated frame.
#[derive(thiserror::Error, Debug)]
pub enum InvokeError {
	#[error("{0}")]
	Application(String),
}

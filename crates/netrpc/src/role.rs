//! The role an entity method sees when it checks in with the interceptor.

/// The routing role used by the interception decision table. Distinct from
/// the manager's connection lifecycle state: a manager that is `Connecting`
/// (transport connected, client id not yet assigned) still routes as
/// [`Role::Disconnected`], since the client id needed for ownership checks
/// isn't trustworthy until the handshake completes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
	Disconnected,
	Host,
	Client,
}

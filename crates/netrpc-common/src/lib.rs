//! Wire format and shared data model for `netrpc`.
//!
//! This crate has no networking or entity-dispatch logic of its own — it is
//! the vocabulary that `netrpc-transport` and `netrpc` build on: identifiers
//! (§3), RPC descriptors (§3), frame types (§3, §6) and their binary codec
//! (§4.1).

pub mod codec;
pub mod descriptor;
pub mod frame;
pub mod ids;
pub mod value;

pub use codec::CodecError;
pub use descriptor::{DeliveryMode, RpcDescriptor, RpcKind, RpcOptions};
pub use frame::Frame;
pub use ids::{ClientId, Counter, NetworkObjectId};
pub use value::{ParamType, RpcValue, WideningError};

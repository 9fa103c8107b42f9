//! Runtime parameter values carried by RPC frames (§4.1).

/// A single decoded/encoded RPC parameter.
///
/// `Json` is the fallback (wire type-id `255`) used for any value that
/// doesn't fit the closed scalar/vector table.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
	Null,
	Bool(bool),
	U8(u8),
	I8(i8),
	I16(i16),
	U16(u16),
	I32(i32),
	U32(u32),
	I64(i64),
	U64(u64),
	F32(f32),
	F64(f64),
	String(String),
	/// A 2-component vector of `f32`s.
	Vec2(f32, f32),
	/// A 3-component vector of `f32`s.
	Vec3(f32, f32, f32),
	/// The fallback encoding: an assembly/type-qualified name plus a JSON
	/// document, used for any runtime type outside the built-in table.
	Json {
		type_name: String,
		document: serde_json::Value,
	},
}

impl RpcValue {
	/// The declared [`ParamType`] this value would widen-convert from, used
	/// only for equality/debugging convenience in tests.
	pub fn type_name(&self) -> &'static str {
		match self {
			RpcValue::Null => "null",
			RpcValue::Bool(_) => "bool",
			RpcValue::U8(_) => "u8",
			RpcValue::I8(_) => "i8",
			RpcValue::I16(_) => "i16",
			RpcValue::U16(_) => "u16",
			RpcValue::I32(_) => "i32",
			RpcValue::U32(_) => "u32",
			RpcValue::I64(_) => "i64",
			RpcValue::U64(_) => "u64",
			RpcValue::F32(_) => "f32",
			RpcValue::F64(_) => "f64",
			RpcValue::String(_) => "string",
			RpcValue::Vec2(..) => "vec2",
			RpcValue::Vec3(..) => "vec3",
			RpcValue::Json { .. } => "json",
		}
	}
}

/// A declared parameter type, as recorded in an [`crate::descriptor::RpcDescriptor`].
///
/// Used to perform the widening conversion described in spec §9: a decoded
/// scalar whose wire type doesn't exactly match the declared type is
/// widened if possible (`i32`→`i64`, `f32`→`f64`, integer→float), and
/// otherwise treated as a decode error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParamType {
	Bool,
	U8,
	I8,
	I16,
	U16,
	I32,
	U32,
	I64,
	U64,
	F32,
	F64,
	String,
	Vec2,
	Vec3,
	/// Accepts any value unmodified; used for fallback/JSON parameters whose
	/// static type can't be named in the closed scalar table.
	Dynamic,
}

/// A decoded value's wire type didn't match its declared parameter type and
/// couldn't be widened.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("cannot convert wire value of type `{from}` to declared parameter type `{to:?}`")]
pub struct WideningError {
	pub from: &'static str,
	pub to: ParamType,
}

impl RpcValue {
	/// Converts `self` to match `declared`, applying a widening cast if the
	/// wire type doesn't already match exactly. `Null` always passes
	/// through unmodified, since any parameter may be omitted.
	pub fn widen_to(self, declared: ParamType) -> Result<Self, WideningError> {
		use ParamType as P;
		use RpcValue as V;

		if matches!(self, V::Null) || matches!(declared, P::Dynamic) {
			return Ok(self);
		}

		let from = self.type_name();
		let widened = match (&self, declared) {
			(V::Bool(_), P::Bool) => self,
			(V::U8(_), P::U8) => self,
			(V::I8(_), P::I8) => self,
			(V::I16(_), P::I16) => self,
			(V::U16(_), P::U16) => self,
			(V::I32(_), P::I32) => self,
			(V::U32(_), P::U32) => self,
			(V::I64(_), P::I64) => self,
			(V::U64(_), P::U64) => self,
			(V::F32(_), P::F32) => self,
			(V::F64(_), P::F64) => self,
			(V::String(_), P::String) => self,
			(V::Vec2(..), P::Vec2) => self,
			(V::Vec3(..), P::Vec3) => self,
			(V::Json { .. }, _) => self,

			// integer -> wider integer
			(V::I32(v), P::I64) => V::I64(i64::from(*v)),
			(V::U32(v), P::U64) => V::U64(u64::from(*v)),
			(V::I16(v), P::I32) => V::I32(i32::from(*v)),
			(V::I16(v), P::I64) => V::I64(i64::from(*v)),
			(V::U16(v), P::U32) => V::U32(u32::from(*v)),
			(V::U16(v), P::U64) => V::U64(u64::from(*v)),
			(V::U16(v), P::I32) => V::I32(i32::from(*v)),
			(V::I8(v), P::I16) => V::I16(i16::from(*v)),
			(V::I8(v), P::I32) => V::I32(i32::from(*v)),
			(V::I8(v), P::I64) => V::I64(i64::from(*v)),
			(V::U8(v), P::U16) => V::U16(u16::from(*v)),
			(V::U8(v), P::U32) => V::U32(u32::from(*v)),
			(V::U8(v), P::U64) => V::U64(u64::from(*v)),
			(V::U8(v), P::I16) => V::I16(i16::from(*v)),
			(V::U8(v), P::I32) => V::I32(i32::from(*v)),

			// float -> wider float
			(V::F32(v), P::F64) => V::F64(f64::from(*v)),

			// integer -> float
			(V::I32(v), P::F64) => V::F64(f64::from(*v)),
			(V::I32(v), P::F32) => V::F32(*v as f32),
			(V::U32(v), P::F64) => V::F64(f64::from(*v)),
			(V::I16(v), P::F32) => V::F32(f32::from(*v)),
			(V::I16(v), P::F64) => V::F64(f64::from(*v)),
			(V::U16(v), P::F32) => V::F32(f32::from(*v)),
			(V::U16(v), P::F64) => V::F64(f64::from(*v)),
			(V::I8(v), P::F32) => V::F32(f32::from(*v)),
			(V::I8(v), P::F64) => V::F64(f64::from(*v)),
			(V::U8(v), P::F32) => V::F32(f32::from(*v)),
			(V::U8(v), P::F64) => V::F64(f64::from(*v)),

			_ => return Err(WideningError { from, to: declared }),
		};
		Ok(widened)
	}
}

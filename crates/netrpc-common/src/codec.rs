//! Binary wire codec for [`Frame`]s (§4.1).
//!
//! Integers are little-endian. Strings use a 7-bit variable-length length
//! prefix (matching the reference implementation's `BinaryWriter`/
//! `BinaryReader` 7-bit encoded integers), not a fixed-width prefix.

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::{discriminator, Frame};
use crate::ids::{ClientId, NetworkObjectId};
use crate::value::RpcValue;

/// A frame failed to decode. The offending frame should be dropped and this
/// logged (§7 kind 2).
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum CodecError {
	#[error("frame was empty")]
	EmptyFrame,
	#[error("unexpected end of frame while reading {context}")]
	UnexpectedEof { context: &'static str },
	#[error("length prefix longer than 5 bytes")]
	MalformedLength,
	#[error("string was not valid utf-8")]
	InvalidUtf8,
	#[error("unknown parameter type id {0}")]
	UnknownTypeId(u8),
	#[error("negative or unreasonable param count {0}")]
	InvalidParamCount(i32),
	#[error("fallback json payload was malformed: {0}")]
	MalformedJson(String),
}

/// A cursor over an immutable byte slice with checked (non-panicking) reads,
/// since frame contents come from the network and must never be trusted
/// enough to justify `bytes::Buf`'s panic-on-underflow reads.
struct Reader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], CodecError> {
		if self.remaining() < n {
			return Err(CodecError::UnexpectedEof { context });
		}
		let slice = &self.data[self.pos..self.pos + n];
		self.pos += n;
		Ok(slice)
	}

	fn u8(&mut self, context: &'static str) -> Result<u8, CodecError> {
		Ok(self.take(1, context)?[0])
	}

	fn u16_le(&mut self, context: &'static str) -> Result<u16, CodecError> {
		Ok(u16::from_le_bytes(self.take(2, context)?.try_into().unwrap()))
	}

	fn i16_le(&mut self, context: &'static str) -> Result<i16, CodecError> {
		Ok(i16::from_le_bytes(self.take(2, context)?.try_into().unwrap()))
	}

	fn u32_le(&mut self, context: &'static str) -> Result<u32, CodecError> {
		Ok(u32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
	}

	fn i32_le(&mut self, context: &'static str) -> Result<i32, CodecError> {
		Ok(i32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
	}

	fn u64_le(&mut self, context: &'static str) -> Result<u64, CodecError> {
		Ok(u64::from_le_bytes(self.take(8, context)?.try_into().unwrap()))
	}

	fn i64_le(&mut self, context: &'static str) -> Result<i64, CodecError> {
		Ok(i64::from_le_bytes(self.take(8, context)?.try_into().unwrap()))
	}

	fn f32_le(&mut self, context: &'static str) -> Result<f32, CodecError> {
		Ok(f32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
	}

	fn f64_le(&mut self, context: &'static str) -> Result<f64, CodecError> {
		Ok(f64::from_le_bytes(self.take(8, context)?.try_into().unwrap()))
	}

	/// Reads a 7-bit variable-length encoded unsigned length prefix.
	fn length_prefix(&mut self) -> Result<u32, CodecError> {
		let mut result: u32 = 0;
		let mut shift: u32 = 0;
		loop {
			if shift >= 35 {
				return Err(CodecError::MalformedLength);
			}
			let byte = self.u8("length prefix")?;
			result |= u32::from(byte & 0x7F) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
		}
		Ok(result)
	}

	fn string(&mut self, context: &'static str) -> Result<String, CodecError> {
		let len = self.length_prefix()? as usize;
		let bytes = self.take(len, context)?;
		std::str::from_utf8(bytes)
			.map(str::to_owned)
			.map_err(|_| CodecError::InvalidUtf8)
	}
}

/// Writes a 7-bit variable-length encoded unsigned length prefix.
fn put_length_prefix(buf: &mut BytesMut, mut value: u32) {
	loop {
		let low7 = (value & 0x7F) as u8;
		value >>= 7;
		if value != 0 {
			buf.put_u8(low7 | 0x80);
		} else {
			buf.put_u8(low7);
			break;
		}
	}
}

fn put_string(buf: &mut BytesMut, s: &str) {
	put_length_prefix(buf, s.len() as u32);
	buf.put_slice(s.as_bytes());
}

fn put_param(buf: &mut BytesMut, value: &RpcValue) -> Result<(), CodecError> {
	match value {
		RpcValue::Null => buf.put_u8(0),
		RpcValue::Bool(b) => {
			buf.put_u8(1);
			buf.put_u8(*b as u8);
		}
		RpcValue::U8(v) => {
			buf.put_u8(2);
			buf.put_u8(*v);
		}
		RpcValue::I8(v) => {
			buf.put_u8(3);
			buf.put_i8(*v);
		}
		RpcValue::I16(v) => {
			buf.put_u8(4);
			buf.put_i16_le(*v);
		}
		RpcValue::U16(v) => {
			buf.put_u8(5);
			buf.put_u16_le(*v);
		}
		RpcValue::I32(v) => {
			buf.put_u8(6);
			buf.put_i32_le(*v);
		}
		RpcValue::U32(v) => {
			buf.put_u8(7);
			buf.put_u32_le(*v);
		}
		RpcValue::I64(v) => {
			buf.put_u8(8);
			buf.put_i64_le(*v);
		}
		RpcValue::U64(v) => {
			buf.put_u8(9);
			buf.put_u64_le(*v);
		}
		RpcValue::F32(v) => {
			buf.put_u8(10);
			buf.put_f32_le(*v);
		}
		RpcValue::F64(v) => {
			buf.put_u8(11);
			buf.put_f64_le(*v);
		}
		RpcValue::String(s) => {
			buf.put_u8(12);
			put_string(buf, s);
		}
		RpcValue::Vec2(x, y) => {
			buf.put_u8(13);
			buf.put_f32_le(*x);
			buf.put_f32_le(*y);
		}
		RpcValue::Vec3(x, y, z) => {
			buf.put_u8(14);
			buf.put_f32_le(*x);
			buf.put_f32_le(*y);
			buf.put_f32_le(*z);
		}
		RpcValue::Json { type_name, document } => {
			buf.put_u8(255);
			put_string(buf, type_name);
			let json = serde_json::to_string(document)
				.map_err(|e| CodecError::MalformedJson(e.to_string()))?;
			put_string(buf, &json);
		}
	}
	Ok(())
}

fn read_param(r: &mut Reader<'_>) -> Result<RpcValue, CodecError> {
	let type_id = r.u8("param type id")?;
	Ok(match type_id {
		0 => RpcValue::Null,
		1 => RpcValue::Bool(r.u8("bool")? != 0),
		2 => RpcValue::U8(r.u8("u8")?),
		3 => RpcValue::I8(r.u8("i8")? as i8),
		4 => RpcValue::I16(r.i16_le("i16")?),
		5 => RpcValue::U16(r.u16_le("u16")?),
		6 => RpcValue::I32(r.i32_le("i32")?),
		7 => RpcValue::U32(r.u32_le("u32")?),
		8 => RpcValue::I64(r.i64_le("i64")?),
		9 => RpcValue::U64(r.u64_le("u64")?),
		10 => RpcValue::F32(r.f32_le("f32")?),
		11 => RpcValue::F64(r.f64_le("f64")?),
		12 => RpcValue::String(r.string("string")?),
		13 => RpcValue::Vec2(r.f32_le("vec2.x")?, r.f32_le("vec2.y")?),
		14 => RpcValue::Vec3(r.f32_le("vec3.x")?, r.f32_le("vec3.y")?, r.f32_le("vec3.z")?),
		255 => {
			let type_name = r.string("fallback type name")?;
			let json = r.string("fallback json document")?;
			let document = serde_json::from_str(&json)
				.map_err(|e| CodecError::MalformedJson(e.to_string()))?;
			RpcValue::Json { type_name, document }
		}
		other => return Err(CodecError::UnknownTypeId(other)),
	})
}

/// Encodes `frame` to its wire representation.
pub fn encode(frame: &Frame) -> Result<Bytes, CodecError> {
	let mut buf = BytesMut::new();
	match frame {
		Frame::HandshakePing => buf.put_u8(discriminator::HANDSHAKE_PING),
		Frame::ClientIdAssignment { client_id } => {
			buf.put_u8(discriminator::CLIENT_ID_ASSIGNMENT);
			buf.put_u32_le(client_id.0);
		}
		Frame::Spawn {
			type_name,
			network_object_id,
			owner_client_id,
		} => {
			buf.put_u8(discriminator::SPAWN);
			put_string(&mut buf, type_name);
			buf.put_u32_le(network_object_id.0);
			buf.put_u32_le(owner_client_id.0);
		}
		Frame::Rpc {
			method_name,
			network_object_id,
			args,
		} => {
			put_string(&mut buf, method_name);
			buf.put_u32_le(network_object_id.0);
			buf.put_i32_le(args.len() as i32);
			for arg in args {
				put_param(&mut buf, arg)?;
			}
		}
	}
	Ok(buf.freeze())
}

/// Decodes a [`Frame`] from a raw datagram, classifying it by its leading
/// discriminator byte the way the manager's inbound dispatch does (§4.5).
pub fn decode(data: &[u8]) -> Result<Frame, CodecError> {
	if data.is_empty() {
		return Err(CodecError::EmptyFrame);
	}
	if data.len() == 1 && data[0] == discriminator::HANDSHAKE_PING {
		return Ok(Frame::HandshakePing);
	}
	if data.len() == 5 && data[0] == discriminator::CLIENT_ID_ASSIGNMENT {
		let mut r = Reader::new(&data[1..]);
		return Ok(Frame::ClientIdAssignment {
			client_id: ClientId(r.u32_le("client id")?),
		});
	}
	if data[0] == discriminator::SPAWN {
		let mut r = Reader::new(&data[1..]);
		let type_name = r.string("spawn type name")?;
		let network_object_id = NetworkObjectId(r.u32_le("spawn network object id")?);
		let owner_client_id = ClientId(r.u32_le("spawn owner client id")?);
		return Ok(Frame::Spawn {
			type_name,
			network_object_id,
			owner_client_id,
		});
	}

	let mut r = Reader::new(data);
	let method_name = r.string("rpc method name")?;
	let network_object_id = NetworkObjectId(r.u32_le("rpc network object id")?);
	let param_count = r.i32_le("rpc param count")?;
	if param_count < 0 || param_count > 10_000 {
		return Err(CodecError::InvalidParamCount(param_count));
	}
	let mut args = Vec::with_capacity(param_count as usize);
	for _ in 0..param_count {
		args.push(read_param(&mut r)?);
	}
	Ok(Frame::Rpc {
		method_name,
		network_object_id,
		args,
	})
}

#[cfg(test)]
mod test {
	use super::*;

	fn roundtrip(frame: Frame) {
		let encoded = encode(&frame).unwrap();
		let decoded = decode(&encoded).unwrap();
		assert_eq!(decoded, frame);
	}

	#[test]
	fn handshake_ping_is_one_byte() {
		let encoded = encode(&Frame::HandshakePing).unwrap();
		assert_eq!(&encoded[..], &[0x00]);
		roundtrip(Frame::HandshakePing);
	}

	#[test]
	fn client_id_assignment_is_five_bytes() {
		let frame = Frame::client_id_assignment(ClientId(7));
		let encoded = encode(&frame).unwrap();
		assert_eq!(encoded.len(), 5);
		assert_eq!(encoded[0], 0x01);
		roundtrip(frame);
	}

	#[test]
	fn spawn_frame_roundtrips() {
		roundtrip(Frame::Spawn {
			type_name: "Game.PlayerEntity".to_owned(),
			network_object_id: NetworkObjectId(3),
			owner_client_id: ClientId(1),
		});
	}

	#[test]
	fn rpc_frame_roundtrips_each_scalar_type() {
		let values = vec![
			RpcValue::Null,
			RpcValue::Bool(true),
			RpcValue::U8(200),
			RpcValue::I8(-12),
			RpcValue::I16(-3000),
			RpcValue::U16(4000),
			RpcValue::I32(-70000),
			RpcValue::U32(70000),
			RpcValue::I64(-5_000_000_000),
			RpcValue::U64(5_000_000_000),
			RpcValue::F32(1.25),
			RpcValue::F64(2.5),
			RpcValue::String("hello world".to_owned()),
			RpcValue::Vec2(1.0, 2.0),
			RpcValue::Vec3(1.0, 2.0, 3.0),
		];
		for v in values {
			roundtrip(Frame::Rpc {
				method_name: "ping_server_rpc".to_owned(),
				network_object_id: NetworkObjectId(1),
				args: vec![v],
			});
		}
	}

	#[test]
	fn null_param_encodes_to_exactly_one_byte() {
		let encoded = encode(&Frame::Rpc {
			method_name: "m".to_owned(),
			network_object_id: NetworkObjectId(1),
			args: vec![RpcValue::Null],
		})
		.unwrap();
		// 1 (len prefix) + 1 ('m') + 4 (id) + 4 (count) + 1 (null tag) == 11
		assert_eq!(encoded.len(), 11);
	}

	#[test]
	fn fallback_json_roundtrips() {
		let document = serde_json::json!({"loadout": ["sword", "shield"], "level": 3});
		roundtrip(Frame::Rpc {
			method_name: "update_loadout_client_rpc".to_owned(),
			network_object_id: NetworkObjectId(1),
			args: vec![RpcValue::Json {
				type_name: "Game.CustomStruct".to_owned(),
				document,
			}],
		});
	}

	#[test]
	fn long_method_name_uses_multi_byte_length_prefix() {
		let name = "x".repeat(200);
		roundtrip(Frame::Rpc {
			method_name: name,
			network_object_id: NetworkObjectId(1),
			args: vec![],
		});
	}

	#[test]
	fn unknown_type_id_is_decode_error() {
		let mut buf = BytesMut::new();
		put_string(&mut buf, "m");
		buf.put_u32_le(1);
		buf.put_i32_le(1);
		buf.put_u8(254); // unused type id between the scalar table and json fallback
		let err = decode(&buf).unwrap_err();
		assert_eq!(err, CodecError::UnknownTypeId(254));
	}

	#[test]
	fn empty_frame_is_an_error() {
		assert_eq!(decode(&[]).unwrap_err(), CodecError::EmptyFrame);
	}

	#[test]
	fn truncated_frame_is_an_error() {
		let full = encode(&Frame::Rpc {
			method_name: "ping_server_rpc".to_owned(),
			network_object_id: NetworkObjectId(1),
			args: vec![RpcValue::I32(42)],
		})
		.unwrap();
		assert!(decode(&full[..full.len() - 1]).is_err());
	}
}

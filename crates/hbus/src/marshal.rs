// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload values and the marshalling capability.
//!
//! The byte-level wire codec is an external collaborator: this core hands it
//! typed [`Value`]s and declared [`TypeCode`]s and gets wire values back.
//! [`WireMarshaller`] is the bundled implementation used by the in-process
//! transport; it computes signature codes and enforces value/type agreement
//! but deliberately does not define the full signature grammar.

use crate::error::{Error, Result};

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Boolean,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    Str,
    ObjectPath,
    Signature,
    /// Dynamically typed container; the concrete type travels with the value.
    Variant,
    Array(Box<TypeCode>),
    Struct(Vec<TypeCode>),
}

impl TypeCode {
    /// Wire signature code for this type.
    pub fn signature(&self) -> String {
        match self {
            Self::Boolean => "b".to_string(),
            Self::Byte => "y".to_string(),
            Self::Int16 => "n".to_string(),
            Self::UInt16 => "q".to_string(),
            Self::Int32 => "i".to_string(),
            Self::UInt32 => "u".to_string(),
            Self::Int64 => "x".to_string(),
            Self::UInt64 => "t".to_string(),
            Self::Double => "d".to_string(),
            Self::Str => "s".to_string(),
            Self::ObjectPath => "o".to_string(),
            Self::Signature => "g".to_string(),
            Self::Variant => "v".to_string(),
            Self::Array(inner) => format!("a{}", inner.signature()),
            Self::Struct(fields) => {
                let mut out = String::from("(");
                for field in fields {
                    out.push_str(&field.signature());
                }
                out.push(')');
                out
            }
        }
    }
}

/// A typed payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    ObjectPath(String),
    Signature(String),
    Variant(Box<Value>),
    /// Homogeneous array; the element type is kept explicitly so empty
    /// arrays still carry a signature.
    Array(TypeCode, Vec<Value>),
    Struct(Vec<Value>),
}

impl Value {
    /// The type of this value.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Boolean(_) => TypeCode::Boolean,
            Self::Byte(_) => TypeCode::Byte,
            Self::Int16(_) => TypeCode::Int16,
            Self::UInt16(_) => TypeCode::UInt16,
            Self::Int32(_) => TypeCode::Int32,
            Self::UInt32(_) => TypeCode::UInt32,
            Self::Int64(_) => TypeCode::Int64,
            Self::UInt64(_) => TypeCode::UInt64,
            Self::Double(_) => TypeCode::Double,
            Self::Str(_) => TypeCode::Str,
            Self::ObjectPath(_) => TypeCode::ObjectPath,
            Self::Signature(_) => TypeCode::Signature,
            Self::Variant(_) => TypeCode::Variant,
            Self::Array(elem, _) => TypeCode::Array(Box::new(elem.clone())),
            Self::Struct(fields) => TypeCode::Struct(fields.iter().map(Value::type_code).collect()),
        }
    }
}

/// Marshalling capability consumed by the call dispatcher.
///
/// Implementations convert between local values and wire values and compute
/// wire type signatures for declared parameter lists. Any failure aborts the
/// dispatch before a message is enqueued.
pub trait Marshaller: Send + Sync {
    /// Wire type signature for a declared parameter list.
    fn signature_of(&self, types: &[TypeCode]) -> Result<String>;

    /// Convert local argument values into wire values, validated against
    /// the declared parameter types.
    fn marshal(&self, values: Vec<Value>, types: &[TypeCode]) -> Result<Vec<Value>>;

    /// Convert wire reply values back into local values, validated against
    /// the declared return types.
    fn demarshal(&self, values: Vec<Value>, types: &[TypeCode]) -> Result<Vec<Value>>;
}

/// Structural marshaller for in-process transports.
///
/// Wire values and local values share the same representation here, so
/// marshalling reduces to arity and type validation plus variant
/// boxing/unboxing at the edges.
#[derive(Debug, Default)]
pub struct WireMarshaller;

impl WireMarshaller {
    pub fn new() -> Self {
        Self
    }

    fn check(value: &Value, expected: &TypeCode, context: &str) -> Result<()> {
        let actual = value.type_code();
        if actual != *expected {
            return Err(Error::Construction(format!(
                "{}: expected {} but got {}",
                context,
                expected.signature(),
                actual.signature()
            )));
        }
        Ok(())
    }

    fn check_arity(got: usize, want: usize, context: &str) -> Result<()> {
        if got != want {
            return Err(Error::Construction(format!(
                "{}: {} values against {} declared types",
                context, got, want
            )));
        }
        Ok(())
    }
}

impl Marshaller for WireMarshaller {
    fn signature_of(&self, types: &[TypeCode]) -> Result<String> {
        Ok(types.iter().map(TypeCode::signature).collect())
    }

    fn marshal(&self, values: Vec<Value>, types: &[TypeCode]) -> Result<Vec<Value>> {
        Self::check_arity(values.len(), types.len(), "marshal")?;
        values
            .into_iter()
            .zip(types)
            .map(|(value, expected)| {
                // A variant target boxes whatever it is given.
                if *expected == TypeCode::Variant {
                    return Ok(match value {
                        v @ Value::Variant(_) => v,
                        other => Value::Variant(Box::new(other)),
                    });
                }
                Self::check(&value, expected, "marshal")?;
                Ok(value)
            })
            .collect()
    }

    fn demarshal(&self, values: Vec<Value>, types: &[TypeCode]) -> Result<Vec<Value>> {
        Self::check_arity(values.len(), types.len(), "demarshal")?;
        values
            .into_iter()
            .zip(types)
            .map(|(value, expected)| {
                // Unbox a variant when the declared type is concrete.
                let value = match (value, expected) {
                    (Value::Variant(inner), t) if *t != TypeCode::Variant => *inner,
                    (v, _) => v,
                };
                if *expected == TypeCode::Variant {
                    return Ok(match value {
                        v @ Value::Variant(_) => v,
                        other => Value::Variant(Box::new(other)),
                    });
                }
                Self::check(&value, expected, "demarshal")?;
                Ok(value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_of_basic_types() {
        let m = WireMarshaller::new();
        let sig = m
            .signature_of(&[TypeCode::Int32, TypeCode::Str, TypeCode::Double])
            .unwrap();
        assert_eq!(sig, "isd");
    }

    #[test]
    fn test_signature_of_containers() {
        let m = WireMarshaller::new();
        let sig = m
            .signature_of(&[
                TypeCode::Array(Box::new(TypeCode::Byte)),
                TypeCode::Struct(vec![TypeCode::Str, TypeCode::UInt32]),
            ])
            .unwrap();
        assert_eq!(sig, "ay(su)");
    }

    #[test]
    fn test_marshal_validates_types() {
        let m = WireMarshaller::new();
        let err = m
            .marshal(vec![Value::Str("x".into())], &[TypeCode::Int32])
            .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }

    #[test]
    fn test_marshal_validates_arity() {
        let m = WireMarshaller::new();
        let err = m.marshal(vec![Value::Int32(1)], &[]).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }

    #[test]
    fn test_variant_boxing_round_trip() {
        let m = WireMarshaller::new();
        let wire = m
            .marshal(vec![Value::Int32(5)], &[TypeCode::Variant])
            .unwrap();
        assert_eq!(wire, vec![Value::Variant(Box::new(Value::Int32(5)))]);

        let local = m.demarshal(wire, &[TypeCode::Int32]).unwrap();
        assert_eq!(local, vec![Value::Int32(5)]);
    }

    #[test]
    fn test_empty_array_keeps_element_type() {
        let v = Value::Array(TypeCode::Str, vec![]);
        assert_eq!(v.type_code().signature(), "as");
    }
}

//! Type descriptors for remotely invocable methods
//!
//! Rust has no runtime method reflection, so every parameter and return slot of a
//! registered method is described by a [`TypeDescriptor`]. Descriptors are derived
//! from Rust types through [`FromArgument`] and [`ResultValue`], or written by hand
//! for methods declared with an explicit signature.

use std::{any::Any, fmt};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Decodes one raw JSON fragment into a fresh instance of a structured type.
pub type ObjectDecoder = fn(&Value) -> Result<Box<dyn Any + Send>, serde_json::Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
}

impl IntKind {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Isize
        )
    }

    /// Inclusive bounds of the kind, expressed as floats for range checks.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::I8 => (i8::MIN as f64, i8::MAX as f64),
            Self::I16 => (i16::MIN as f64, i16::MAX as f64),
            Self::I32 => (i32::MIN as f64, i32::MAX as f64),
            Self::I64 => (i64::MIN as f64, i64::MAX as f64),
            Self::Isize => (isize::MIN as f64, isize::MAX as f64),
            Self::U8 => (0.0, u8::MAX as f64),
            Self::U16 => (0.0, u16::MAX as f64),
            Self::U32 => (0.0, u32::MAX as f64),
            Self::U64 => (0.0, u64::MAX as f64),
            Self::Usize => (0.0, usize::MAX as f64),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    F32,
    F64,
}

/// A structured type whose fields map to JSON keys.
#[derive(Clone, Copy)]
pub struct ObjectType {
    pub name: &'static str,
    pub decode: ObjectDecoder,
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ObjectType {
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Default + Send + 'static,
    {
        Self {
            name: short_type_name::<T>(),
            decode: decode_object::<T>,
        }
    }
}

// Keys absent from the request keep the value they have in `T::default()`.
fn decode_object<T>(raw: &Value) -> Result<Box<dyn Any + Send>, serde_json::Error>
where
    T: DeserializeOwned + Serialize + Default + Send + 'static,
{
    let Value::Object(fields) = raw else {
        return T::deserialize(raw).map(|value| Box::new(value) as Box<dyn Any + Send>);
    };

    let merged = match serde_json::to_value(T::default())? {
        Value::Object(mut defaults) => {
            for (key, value) in fields {
                defaults.insert(key.clone(), value.clone());
            }
            Value::Object(defaults)
        }
        _ => raw.clone(),
    };
    T::deserialize(merged).map(|value| Box::new(value) as Box<dyn Any + Send>)
}

#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    String,
    Bool,
    Integer(IntKind),
    Float(FloatKind),
    Object(ObjectType),
    /// Sequence of values; only valid in the result slot.
    List(Box<TypeDescriptor>),
    /// The failure-signalling status slot.
    Failure,
    Unsupported(&'static str),
}

impl TypeDescriptor {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Bool | Self::Integer(_) | Self::Float(_)
        )
    }

    pub fn is_param_kind(&self) -> bool {
        self.is_primitive() || matches!(self, Self::Object(_))
    }

    pub fn is_result_kind(&self) -> bool {
        match self {
            Self::List(elem) => elem.is_result_kind(),
            other => other.is_param_kind(),
        }
    }

    /// Name of the structured type this slot points at, if any.
    pub fn object_name(&self) -> Option<&'static str> {
        match self {
            Self::Object(object) => Some(object.name),
            Self::List(elem) => elem.object_name(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Integer(kind) => kind.as_str().to_string(),
            Self::Float(FloatKind::F32) => "f32".to_string(),
            Self::Float(FloatKind::F64) => "f64".to_string(),
            Self::Object(object) => object.name.to_string(),
            Self::List(elem) => format!("[{}]", elem.type_name()),
            Self::Failure => "Failure".to_string(),
            Self::Unsupported(name) => (*name).to_string(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// A parameter value after coercion, ready to be handed to a method.
pub enum Argument {
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Object(Box<dyn Any + Send>),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.debug_tuple("Str").field(value).finish(),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Uint(value) => f.debug_tuple("Uint").field(value).finish(),
            Self::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Structured parameter or result, decoded from and encoded to a JSON object.
///
/// Parameters are only decoded from JSON objects, key by key. A key missing from
/// the request takes its value from `T::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obj<T>(pub T);

/// Rust types accepted as method parameters.
pub trait FromArgument: Sized {
    fn descriptor() -> TypeDescriptor;

    fn from_argument(argument: Argument) -> Option<Self>;
}

/// Rust types accepted in a method's result slot.
pub trait ResultValue {
    fn descriptor() -> TypeDescriptor;

    fn into_value(self) -> Result<Value, serde_json::Error>;
}

impl FromArgument for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::String
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl FromArgument for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Bool
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Bool(value) => Some(value),
            _ => None,
        }
    }
}

macro_rules! integer_argument {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromArgument for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::Integer(IntKind::$kind)
                }

                fn from_argument(argument: Argument) -> Option<Self> {
                    match argument {
                        Argument::Int(value) => <$ty>::try_from(value).ok(),
                        Argument::Uint(value) => <$ty>::try_from(value).ok(),
                        _ => None,
                    }
                }
            }

            impl ResultValue for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::Integer(IntKind::$kind)
                }

                fn into_value(self) -> Result<Value, serde_json::Error> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

integer_argument!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
);

impl FromArgument for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float(FloatKind::F64)
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl FromArgument for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float(FloatKind::F32)
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Float(value) => Some(value as f32),
            _ => None,
        }
    }
}

impl<T> FromArgument for Obj<T>
where
    T: DeserializeOwned + Serialize + Default + Send + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Object(ObjectType::of::<T>())
    }

    fn from_argument(argument: Argument) -> Option<Self> {
        match argument {
            Argument::Object(value) => value.downcast::<T>().ok().map(|value| Obj(*value)),
            _ => None,
        }
    }
}

impl ResultValue for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::String
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        Ok(Value::String(self))
    }
}

impl ResultValue for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Bool
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        Ok(Value::Bool(self))
    }
}

impl ResultValue for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float(FloatKind::F64)
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        Ok(float_value(self))
    }
}

impl ResultValue for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float(FloatKind::F32)
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        Ok(float_value(f64::from(self)))
    }
}

impl<T> ResultValue for Obj<T>
where
    T: Serialize + DeserializeOwned + Default + Send + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Object(ObjectType::of::<T>())
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.0)
    }
}

impl<T> ResultValue for Vec<T>
where
    T: ResultValue,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::List(Box::new(T::descriptor()))
    }

    fn into_value(self) -> Result<Value, serde_json::Error> {
        self.into_iter()
            .map(ResultValue::into_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

// Integral floats are written without a fraction (`42`, not `42.0`).
fn float_value(value: f64) -> Value {
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

    if value.is_finite() && value.fract() == 0.0 && value.abs() < EXACT_LIMIT {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// Is this an exported (upper case) name?
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Last path segment of a Rust type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    strip_type_path(std::any::type_name::<T>())
}

fn strip_type_path(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

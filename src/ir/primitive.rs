use crate::{util::get_array, Error};
use std::fmt;
use std::str::FromStr;

/// Byte order of multi-byte primitives within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// Scalar representation of an encoded primitive slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PrimitiveType {
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
}

macro_rules! read_as {
    ($ty:ty, $data:expr, $order:expr) => {{
        let bytes = get_array::<{ std::mem::size_of::<$ty>() }>($data)?;
        match $order {
            ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
            ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
        }
    }};
}

macro_rules! write_as {
    ($val:expr, $order:expr, $out:expr) => {{
        match $order {
            ByteOrder::LittleEndian => $out.extend_from_slice(&$val.to_le_bytes()),
            ByteOrder::BigEndian => $out.extend_from_slice(&$val.to_be_bytes()),
        }
    }};
}

impl PrimitiveType {
    /// The name used for the type in schemas
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Encoded size in bytes
    pub const fn size(self) -> usize {
        match self {
            PrimitiveType::Char | PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Double => 8,
        }
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveType::UInt8
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// The value that represents an absent optional field when the schema
    /// does not declare one
    pub fn null_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0),
            PrimitiveType::Int8 => PrimitiveValue::Int(i64::from(i8::MIN)),
            PrimitiveType::Int16 => PrimitiveValue::Int(i64::from(i16::MIN)),
            PrimitiveType::Int32 => PrimitiveValue::Int(i64::from(i32::MIN)),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(u64::from(u8::MAX)),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(u64::from(u16::MAX)),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(u64::from(u32::MAX)),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(u64::MAX),
            PrimitiveType::Float => PrimitiveValue::Float(f32::NAN),
            PrimitiveType::Double => PrimitiveValue::Double(f64::NAN),
        }
    }

    /// Smallest valid value when the schema does not declare one
    pub fn min_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x20),
            PrimitiveType::Int8 => PrimitiveValue::Int(i64::from(i8::MIN) + 1),
            PrimitiveType::Int16 => PrimitiveValue::Int(i64::from(i16::MIN) + 1),
            PrimitiveType::Int32 => PrimitiveValue::Int(i64::from(i32::MIN) + 1),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MIN + 1),
            PrimitiveType::UInt8
            | PrimitiveType::UInt16
            | PrimitiveType::UInt32
            | PrimitiveType::UInt64 => PrimitiveValue::UInt(0),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MIN),
            PrimitiveType::Double => PrimitiveValue::Double(f64::MIN),
        }
    }

    /// Largest valid value when the schema does not declare one
    pub fn max_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x7e),
            PrimitiveType::Int8 => PrimitiveValue::Int(i64::from(i8::MAX)),
            PrimitiveType::Int16 => PrimitiveValue::Int(i64::from(i16::MAX)),
            PrimitiveType::Int32 => PrimitiveValue::Int(i64::from(i32::MAX)),
            PrimitiveType::Int64 => PrimitiveValue::Int(i64::MAX),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(u64::from(u8::MAX) - 1),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(u64::from(u16::MAX) - 1),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(u64::from(u32::MAX) - 1),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(u64::MAX - 1),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MAX),
            PrimitiveType::Double => PrimitiveValue::Double(f64::MAX),
        }
    }

    /// Decode a single value from the front of `data`. Returns `None` when
    /// there are fewer than [`size`](PrimitiveType::size) bytes.
    ///
    /// ```
    /// use sbe_otf::{ByteOrder, PrimitiveType, PrimitiveValue};
    ///
    /// let data = [0x39, 0x30, 0x00, 0x00];
    /// let value = PrimitiveType::UInt32.read(&data, ByteOrder::LittleEndian);
    /// assert_eq!(value, Some(PrimitiveValue::UInt(12345)));
    /// assert_eq!(PrimitiveType::UInt64.read(&data, ByteOrder::LittleEndian), None);
    /// ```
    #[inline]
    pub fn read(self, data: &[u8], order: ByteOrder) -> Option<PrimitiveValue> {
        let value = match self {
            PrimitiveType::Char => PrimitiveValue::Char(*data.first()?),
            PrimitiveType::Int8 => PrimitiveValue::Int(i64::from(read_as!(i8, data, order))),
            PrimitiveType::Int16 => PrimitiveValue::Int(i64::from(read_as!(i16, data, order))),
            PrimitiveType::Int32 => PrimitiveValue::Int(i64::from(read_as!(i32, data, order))),
            PrimitiveType::Int64 => PrimitiveValue::Int(read_as!(i64, data, order)),
            PrimitiveType::UInt8 => PrimitiveValue::UInt(u64::from(*data.first()?)),
            PrimitiveType::UInt16 => PrimitiveValue::UInt(u64::from(read_as!(u16, data, order))),
            PrimitiveType::UInt32 => PrimitiveValue::UInt(u64::from(read_as!(u32, data, order))),
            PrimitiveType::UInt64 => PrimitiveValue::UInt(read_as!(u64, data, order)),
            PrimitiveType::Float => PrimitiveValue::Float(read_as!(f32, data, order)),
            PrimitiveType::Double => PrimitiveValue::Double(read_as!(f64, data, order)),
        };
        Some(value)
    }

    /// Append the encoded form of `value` to `out`, converting it to this
    /// type with `as` semantics
    pub fn write(self, value: PrimitiveValue, order: ByteOrder, out: &mut Vec<u8>) {
        match self {
            PrimitiveType::Char | PrimitiveType::UInt8 => out.push(value.cast_u64() as u8),
            PrimitiveType::Int8 => out.push(value.cast_i64() as i8 as u8),
            PrimitiveType::Int16 => write_as!(value.cast_i64() as i16, order, out),
            PrimitiveType::Int32 => write_as!(value.cast_i64() as i32, order, out),
            PrimitiveType::Int64 => write_as!(value.cast_i64(), order, out),
            PrimitiveType::UInt16 => write_as!(value.cast_u64() as u16, order, out),
            PrimitiveType::UInt32 => write_as!(value.cast_u64() as u32, order, out),
            PrimitiveType::UInt64 => write_as!(value.cast_u64(), order, out),
            PrimitiveType::Float => write_as!(value.cast_f64() as f32, order, out),
            PrimitiveType::Double => write_as!(value.cast_f64(), order, out),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "char" => Ok(PrimitiveType::Char),
            "int8" => Ok(PrimitiveType::Int8),
            "int16" => Ok(PrimitiveType::Int16),
            "int32" => Ok(PrimitiveType::Int32),
            "int64" => Ok(PrimitiveType::Int64),
            "uint8" => Ok(PrimitiveType::UInt8),
            "uint16" => Ok(PrimitiveType::UInt16),
            "uint32" => Ok(PrimitiveType::UInt32),
            "uint64" => Ok(PrimitiveType::UInt64),
            "float" => Ok(PrimitiveType::Float),
            "double" => Ok(PrimitiveType::Double),
            x => Err(Error::invalid_ir(format!("unknown primitive type: {}", x))),
        }
    }
}

/// A single decoded scalar
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveValue {
    Char(u8),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
}

impl PrimitiveValue {
    /// The value as an unsigned integer when it is integral and not negative
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PrimitiveValue::Char(x) => Some(u64::from(x)),
            PrimitiveValue::Int(x) => u64::try_from(x).ok(),
            PrimitiveValue::UInt(x) => Some(x),
            PrimitiveValue::Float(_) | PrimitiveValue::Double(_) => None,
        }
    }

    /// The value as a signed integer when it is integral and in range
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PrimitiveValue::Char(x) => Some(i64::from(x)),
            PrimitiveValue::Int(x) => Some(x),
            PrimitiveValue::UInt(x) => i64::try_from(x).ok(),
            PrimitiveValue::Float(_) | PrimitiveValue::Double(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            PrimitiveValue::Char(x) => f64::from(x),
            PrimitiveValue::Int(x) => x as f64,
            PrimitiveValue::UInt(x) => x as f64,
            PrimitiveValue::Float(x) => f64::from(x),
            PrimitiveValue::Double(x) => x,
        }
    }

    /// Compares two values by their numeric content, so that `Int(1)` and
    /// `UInt(1)` are considered the same literal. NaN equals NaN, as null
    /// values of floating point fields are NaN.
    pub fn same_as(&self, other: &PrimitiveValue) -> bool {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.as_u64(), other.as_u64()) {
                (Some(a), Some(b)) => a == b,
                _ => {
                    let (a, b) = (self.as_f64(), other.as_f64());
                    a == b || (a.is_nan() && b.is_nan())
                }
            },
        }
    }

    fn cast_i64(&self) -> i64 {
        match *self {
            PrimitiveValue::Char(x) => i64::from(x),
            PrimitiveValue::Int(x) => x,
            PrimitiveValue::UInt(x) => x as i64,
            PrimitiveValue::Float(x) => x as i64,
            PrimitiveValue::Double(x) => x as i64,
        }
    }

    fn cast_u64(&self) -> u64 {
        match *self {
            PrimitiveValue::Char(x) => u64::from(x),
            PrimitiveValue::Int(x) => x as u64,
            PrimitiveValue::UInt(x) => x,
            PrimitiveValue::Float(x) => x as u64,
            PrimitiveValue::Double(x) => x as u64,
        }
    }

    fn cast_f64(&self) -> f64 {
        self.as_f64()
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PrimitiveValue::Char(x) => write!(f, "{}", char::from(x)),
            PrimitiveValue::Int(x) => write!(f, "{}", x),
            PrimitiveValue::UInt(x) => write!(f, "{}", x),
            PrimitiveValue::Float(x) => write!(f, "{}", x),
            PrimitiveValue::Double(x) => write!(f, "{}", x),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty, $($t:ty),*) => {
        $(
            impl From<$t> for PrimitiveValue {
                fn from(x: $t) -> Self {
                    PrimitiveValue::$variant(<$target>::from(x))
                }
            }
        )*
    };
}

value_from!(Int, i64, i8, i16, i32, i64);
value_from!(UInt, u64, u8, u16, u32, u64);

impl From<f32> for PrimitiveValue {
    fn from(x: f32) -> Self {
        PrimitiveValue::Float(x)
    }
}

impl From<f64> for PrimitiveValue {
    fn from(x: f64) -> Self {
        PrimitiveValue::Double(x)
    }
}

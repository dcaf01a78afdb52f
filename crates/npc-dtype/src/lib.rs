#![forbid(unsafe_code)]

use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Element storage kinds understood by the `.npy` reference model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Complex64,
    Complex128,
}

impl DType {
    /// Every supported kind, in matrix iteration order.
    pub const ALL: [Self; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Complex64,
        Self::Complex128,
    ];

    /// Short NumPy type code, also used in fixture file names.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Bool => "?",
            Self::I8 => "i1",
            Self::I16 => "i2",
            Self::I32 => "i4",
            Self::I64 => "i8",
            Self::U8 => "u1",
            Self::U16 => "u2",
            Self::U32 => "u4",
            Self::U64 => "u8",
            Self::F32 => "f4",
            Self::F64 => "f8",
            Self::Complex64 => "c8",
            Self::Complex128 => "c16",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        }
    }

    /// Kind character of the array-protocol type string (`b`, `i`, `u`, `f`, `c`).
    #[must_use]
    pub const fn kind_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => 'i',
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 'u',
            Self::F32 | Self::F64 => 'f',
            Self::Complex64 | Self::Complex128 => 'c',
        }
    }

    #[must_use]
    pub const fn item_size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// Byte order is meaningless for these kinds.
    #[must_use]
    pub const fn is_single_byte(self) -> bool {
        self.item_size() == 1
    }

    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.code() == token || dtype.name() == token)
    }

    /// Resolves the kind/size pair of a type string such as `<i4` or `|b1`.
    #[must_use]
    pub fn from_kind_and_size(kind: char, item_size: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.kind_char() == kind && dtype.item_size() == item_size)
    }

    /// Unsafe NumPy-style cast of a non-negative integer into this kind.
    ///
    /// Integers wrap modulo 2^bits, bool is `value != 0`, floats round to
    /// nearest and complex kinds carry the value in the real component.
    #[must_use]
    pub fn cast_index(self, value: u64) -> Scalar {
        match self {
            Self::Bool => Scalar::Bool(value != 0),
            Self::I8 => Scalar::I8(value as i8),
            Self::I16 => Scalar::I16(value as i16),
            Self::I32 => Scalar::I32(value as i32),
            Self::I64 => Scalar::I64(value as i64),
            Self::U8 => Scalar::U8(value as u8),
            Self::U16 => Scalar::U16(value as u16),
            Self::U32 => Scalar::U32(value as u32),
            Self::U64 => Scalar::U64(value),
            Self::F32 => Scalar::F32(value as f32),
            Self::F64 => Scalar::F64(value as f64),
            Self::Complex64 => Scalar::Complex64(value as f32, 0.0),
            Self::Complex128 => Scalar::Complex128(value as f64, 0.0),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Endianness of multi-byte element encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
    /// `|` in a type string: single-byte kinds only.
    NotApplicable,
}

impl ByteOrder {
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
            Self::NotApplicable => '|',
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Little => "little-endian",
            Self::Big => "big-endian",
            Self::NotApplicable => "not applicable",
        }
    }

    /// Parses a type-string byte-order character; `=` is the host order.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '<' => Some(Self::Little),
            '>' => Some(Self::Big),
            '|' => Some(Self::NotApplicable),
            '=' => Some(Self::native()),
            _ => None,
        }
    }

    /// Canonical order for `dtype`, as NumPy stores it.
    ///
    /// Single-byte kinds always become `NotApplicable`; a multi-byte kind
    /// cannot be `NotApplicable`.
    pub fn normalize_for(self, dtype: DType) -> Result<Self, DTypeError> {
        if dtype.is_single_byte() {
            return Ok(Self::NotApplicable);
        }
        match self {
            Self::NotApplicable => Err(DTypeError::ByteOrderRequired(dtype)),
            order => Ok(order),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DTypeError {
    #[error("element of {dtype} needs {expected} bytes, got {got}")]
    ElementLength {
        dtype: DType,
        expected: usize,
        got: usize,
    },
    #[error("multi-byte dtype {0} requires an explicit byte order")]
    ByteOrderRequired(DType),
}

/// One typed element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Complex64(f32, f32),
    Complex128(f64, f64),
}

macro_rules! ordered_bytes {
    ($value:expr, $order:expr) => {
        match $order {
            ByteOrder::Little => $value.to_le_bytes(),
            ByteOrder::Big => $value.to_be_bytes(),
            ByteOrder::NotApplicable => $value.to_ne_bytes(),
        }
    };
}

macro_rules! from_ordered_bytes {
    ($ty:ty, $bytes:expr, $order:expr) => {
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes($bytes),
            ByteOrder::Big => <$ty>::from_be_bytes($bytes),
            ByteOrder::NotApplicable => <$ty>::from_ne_bytes($bytes),
        }
    };
}

fn fixed<const N: usize>(dtype: DType, bytes: &[u8]) -> Result<[u8; N], DTypeError> {
    bytes.try_into().map_err(|_| DTypeError::ElementLength {
        dtype,
        expected: N,
        got: bytes.len(),
    })
}

impl Scalar {
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::I8(_) => DType::I8,
            Self::I16(_) => DType::I16,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
            Self::U16(_) => DType::U16,
            Self::U32(_) => DType::U32,
            Self::U64(_) => DType::U64,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::Complex64(..) => DType::Complex64,
            Self::Complex128(..) => DType::Complex128,
        }
    }

    /// Appends the encoded element. `NotApplicable` encodes in host order.
    pub fn write_bytes(&self, order: ByteOrder, out: &mut Vec<u8>) {
        match *self {
            Self::Bool(v) => out.push(u8::from(v)),
            Self::I8(v) => out.extend_from_slice(&v.to_ne_bytes()),
            Self::U8(v) => out.push(v),
            Self::I16(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::I32(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::I64(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::U16(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::U32(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::U64(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::F32(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::F64(v) => out.extend_from_slice(&ordered_bytes!(v, order)),
            Self::Complex64(re, im) => {
                out.extend_from_slice(&ordered_bytes!(re, order));
                out.extend_from_slice(&ordered_bytes!(im, order));
            }
            Self::Complex128(re, im) => {
                out.extend_from_slice(&ordered_bytes!(re, order));
                out.extend_from_slice(&ordered_bytes!(im, order));
            }
        }
    }

    /// Decodes exactly one element of `dtype` from `bytes`.
    pub fn read_bytes(dtype: DType, order: ByteOrder, bytes: &[u8]) -> Result<Self, DTypeError> {
        if bytes.len() != dtype.item_size() {
            return Err(DTypeError::ElementLength {
                dtype,
                expected: dtype.item_size(),
                got: bytes.len(),
            });
        }
        let scalar = match dtype {
            DType::Bool => Self::Bool(bytes[0] != 0),
            DType::I8 => Self::I8(i8::from_ne_bytes([bytes[0]])),
            DType::U8 => Self::U8(bytes[0]),
            DType::I16 => Self::I16(from_ordered_bytes!(i16, fixed(dtype, bytes)?, order)),
            DType::I32 => Self::I32(from_ordered_bytes!(i32, fixed(dtype, bytes)?, order)),
            DType::I64 => Self::I64(from_ordered_bytes!(i64, fixed(dtype, bytes)?, order)),
            DType::U16 => Self::U16(from_ordered_bytes!(u16, fixed(dtype, bytes)?, order)),
            DType::U32 => Self::U32(from_ordered_bytes!(u32, fixed(dtype, bytes)?, order)),
            DType::U64 => Self::U64(from_ordered_bytes!(u64, fixed(dtype, bytes)?, order)),
            DType::F32 => Self::F32(from_ordered_bytes!(f32, fixed(dtype, bytes)?, order)),
            DType::F64 => Self::F64(from_ordered_bytes!(f64, fixed(dtype, bytes)?, order)),
            DType::Complex64 => {
                let (re, im) = bytes.split_at(4);
                Self::Complex64(
                    from_ordered_bytes!(f32, fixed(dtype, re)?, order),
                    from_ordered_bytes!(f32, fixed(dtype, im)?, order),
                )
            }
            DType::Complex128 => {
                let (re, im) = bytes.split_at(8);
                Self::Complex128(
                    from_ordered_bytes!(f64, fixed(dtype, re)?, order),
                    from_ordered_bytes!(f64, fixed(dtype, im)?, order),
                )
            }
        };
        Ok(scalar)
    }

    /// Bit-exact equality; unlike `==`, NaN payloads compare equal to themselves.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Complex64(ar, ai), Self::Complex64(br, bi)) => {
                ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
            }
            (Self::Complex128(ar, ai), Self::Complex128(br, bi)) => {
                ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v:?}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::Complex64(re, im) => write!(f, "{re:?} + {im:?} I"),
            Self::Complex128(re, im) => write!(f, "{re:?} + {im:?} I"),
        }
    }
}

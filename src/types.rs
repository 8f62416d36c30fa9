use byteorder::{BigEndian, ByteOrder, LittleEndian};
use half::f16;
use num_complex::Complex;

use crate::error::{ZarrError, ZarrResult};

// ---------------------------------------------------------------------------
// Endian
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
    NotApplicable,
}

// ---------------------------------------------------------------------------
// ArrayOrder
// ---------------------------------------------------------------------------

/// Memory layout of elements inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrayOrder {
    #[default]
    C,
    F,
}

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Bytes,
}

impl DataType {
    /// Number of bytes per element for fixed-size types.
    pub fn byte_size(&self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 | DataType::Float16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 | DataType::Complex64 => Some(8),
            DataType::Complex128 => Some(16),
            DataType::String | DataType::Bytes => None,
        }
    }

    /// Whether values of this type can be read as numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::String | DataType::Bytes)
    }
}

// ---------------------------------------------------------------------------
// Widening to f64
// ---------------------------------------------------------------------------

/// Lossy conversion of one element to `f64`. Complex values keep their real
/// part.
trait Widen: Copy {
    fn widen(self) -> f64;
}

macro_rules! widen_as {
    ($($t:ty),*) => {
        $(impl Widen for $t {
            fn widen(self) -> f64 {
                self as f64
            }
        })*
    };
}

widen_as!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl Widen for bool {
    fn widen(self) -> f64 {
        u8::from(self).into()
    }
}

impl Widen for f16 {
    fn widen(self) -> f64 {
        self.to_f64()
    }
}

impl<T: Widen> Widen for Complex<T> {
    fn widen(self) -> f64 {
        self.re.widen()
    }
}

// ---------------------------------------------------------------------------
// ZarrValue  (scalar)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ZarrValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Complex64(Complex<f32>),
    Complex128(Complex<f64>),
    String(String),
    Bytes(Vec<u8>),
}

impl ZarrValue {
    /// `None` for strings and raw bytes.
    pub fn to_f64(&self) -> Option<f64> {
        Some(match *self {
            ZarrValue::Bool(v) => v.widen(),
            ZarrValue::Int8(v) => v.widen(),
            ZarrValue::Int16(v) => v.widen(),
            ZarrValue::Int32(v) => v.widen(),
            ZarrValue::Int64(v) => v.widen(),
            ZarrValue::UInt8(v) => v.widen(),
            ZarrValue::UInt16(v) => v.widen(),
            ZarrValue::UInt32(v) => v.widen(),
            ZarrValue::UInt64(v) => v.widen(),
            ZarrValue::Float16(v) => v.widen(),
            ZarrValue::Float32(v) => v.widen(),
            ZarrValue::Float64(v) => v,
            ZarrValue::Complex64(v) => v.widen(),
            ZarrValue::Complex128(v) => v.widen(),
            ZarrValue::String(_) | ZarrValue::Bytes(_) => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// FillValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Value(ZarrValue),
    NaN,
    Infinity,
    NegativeInfinity,
    /// JSON `null`: no fill value recorded, absent chunks read as zero.
    Unset,
}

impl FillValue {
    /// Numeric fill used when materialising an array of `dtype`.
    ///
    /// Non-finite fills only apply to floating types; integer arrays with a
    /// mismatched or unset fill read as zero.
    pub fn to_f64(&self, dtype: DataType) -> f64 {
        let floating = matches!(
            dtype,
            DataType::Float16
                | DataType::Float32
                | DataType::Float64
                | DataType::Complex64
                | DataType::Complex128
        );
        match self {
            FillValue::Value(v) => v.to_f64().unwrap_or(0.0),
            FillValue::NaN if floating => f64::NAN,
            FillValue::Infinity if floating => f64::INFINITY,
            FillValue::NegativeInfinity if floating => f64::NEG_INFINITY,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ZarrVectorValue  (typed chunk data)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ZarrVectorValue {
    VBool(Vec<bool>),
    VInt8(Vec<i8>),
    VInt16(Vec<i16>),
    VInt32(Vec<i32>),
    VInt64(Vec<i64>),
    VUInt8(Vec<u8>),
    VUInt16(Vec<u16>),
    VUInt32(Vec<u32>),
    VUInt64(Vec<u64>),
    VFloat16(Vec<f16>),
    VFloat32(Vec<f32>),
    VFloat64(Vec<f64>),
    VComplex64(Vec<Complex<f32>>),
    VComplex128(Vec<Complex<f64>>),
}

/// Run `$body` with `$v` bound to the inner `Vec` of any variant.
macro_rules! each_vec {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            ZarrVectorValue::VBool($v) => $body,
            ZarrVectorValue::VInt8($v) => $body,
            ZarrVectorValue::VInt16($v) => $body,
            ZarrVectorValue::VInt32($v) => $body,
            ZarrVectorValue::VInt64($v) => $body,
            ZarrVectorValue::VUInt8($v) => $body,
            ZarrVectorValue::VUInt16($v) => $body,
            ZarrVectorValue::VUInt32($v) => $body,
            ZarrVectorValue::VUInt64($v) => $body,
            ZarrVectorValue::VFloat16($v) => $body,
            ZarrVectorValue::VFloat32($v) => $body,
            ZarrVectorValue::VFloat64($v) => $body,
            ZarrVectorValue::VComplex64($v) => $body,
            ZarrVectorValue::VComplex128($v) => $body,
        }
    };
}

impl ZarrVectorValue {
    pub fn len(&self) -> usize {
        each_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element widened to `f64`, complex values by their real part.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_vec!(self, v => v.iter().map(|x| x.widen()).collect())
    }
}

// ---------------------------------------------------------------------------
// Raw bytes -> typed vector
// ---------------------------------------------------------------------------

/// Interpret a decoded chunk as elements of `dtype`. Multi-byte types are
/// read with `endian`; single-byte types ignore it.
pub fn bytes_to_zarr_vector(
    endian: Endian,
    dtype: DataType,
    data: &[u8],
) -> ZarrResult<ZarrVectorValue> {
    let Some(size) = dtype.byte_size() else {
        return Err(ZarrError::Unsupported(format!(
            "{dtype:?} chunks cannot be read as numbers"
        )));
    };
    if data.len() % size != 0 {
        return Err(ZarrError::Decode(format!(
            "Chunk of {} bytes is not a whole number of {dtype:?} elements",
            data.len()
        )));
    }
    let count = data.len() / size;

    Ok(match endian {
        Endian::Big => decode::<BigEndian>(dtype, data, count),
        Endian::Little | Endian::NotApplicable => decode::<LittleEndian>(dtype, data, count),
    })
}

/// `data.len()` must be exactly `count` elements of `dtype`.
fn decode<B: ByteOrder>(dtype: DataType, data: &[u8], count: usize) -> ZarrVectorValue {
    macro_rules! read_into {
        ($read:ident, $t:ty, $n:expr) => {{
            let mut out = vec![<$t>::default(); $n];
            B::$read(data, &mut out);
            out
        }};
    }
    match dtype {
        DataType::Bool => ZarrVectorValue::VBool(data.iter().map(|b| *b != 0).collect()),
        DataType::Int8 => ZarrVectorValue::VInt8(data.iter().map(|b| *b as i8).collect()),
        DataType::UInt8 => ZarrVectorValue::VUInt8(data.to_vec()),
        DataType::Int16 => ZarrVectorValue::VInt16(read_into!(read_i16_into, i16, count)),
        DataType::Int32 => ZarrVectorValue::VInt32(read_into!(read_i32_into, i32, count)),
        DataType::Int64 => ZarrVectorValue::VInt64(read_into!(read_i64_into, i64, count)),
        DataType::UInt16 => ZarrVectorValue::VUInt16(read_into!(read_u16_into, u16, count)),
        DataType::UInt32 => ZarrVectorValue::VUInt32(read_into!(read_u32_into, u32, count)),
        DataType::UInt64 => ZarrVectorValue::VUInt64(read_into!(read_u64_into, u64, count)),
        DataType::Float16 => ZarrVectorValue::VFloat16(
            read_into!(read_u16_into, u16, count)
                .into_iter()
                .map(f16::from_bits)
                .collect(),
        ),
        DataType::Float32 => ZarrVectorValue::VFloat32(read_into!(read_f32_into, f32, count)),
        DataType::Float64 => ZarrVectorValue::VFloat64(read_into!(read_f64_into, f64, count)),
        DataType::Complex64 => {
            let flat: Vec<f32> = read_into!(read_f32_into, f32, 2 * count);
            ZarrVectorValue::VComplex64(
                flat.chunks_exact(2)
                    .map(|p| Complex::new(p[0], p[1]))
                    .collect(),
            )
        }
        DataType::Complex128 => {
            let flat: Vec<f64> = read_into!(read_f64_into, f64, 2 * count);
            ZarrVectorValue::VComplex128(
                flat.chunks_exact(2)
                    .map(|p| Complex::new(p[0], p[1]))
                    .collect(),
            )
        }
        DataType::String | DataType::Bytes => {
            unreachable!("variable-length dtypes are rejected before decoding")
        }
    }
}

// ---------------------------------------------------------------------------
// f64 values -> raw bytes
// ---------------------------------------------------------------------------

/// Write `values` as elements of a real-valued `dtype`. Integer targets
/// truncate toward zero and wrap to the type's width, as NumPy's unchecked
/// casts do; NaN becomes 0.
pub fn f64s_to_bytes(endian: Endian, dtype: DataType, values: &[f64]) -> ZarrResult<Vec<u8>> {
    match dtype {
        DataType::Complex64 | DataType::Complex128 | DataType::String | DataType::Bytes => {
            Err(ZarrError::Unsupported(format!(
                "{dtype:?} elements cannot be written from real numbers"
            )))
        }
        _ => Ok(match endian {
            Endian::Big => encode::<BigEndian>(dtype, values),
            Endian::Little | Endian::NotApplicable => encode::<LittleEndian>(dtype, values),
        }),
    }
}

fn encode<B: ByteOrder>(dtype: DataType, values: &[f64]) -> Vec<u8> {
    macro_rules! write_from {
        ($write:ident, $t:ty, $conv:expr) => {{
            let typed: Vec<$t> = values.iter().map(|v| $conv(*v)).collect();
            let mut out = vec![0u8; typed.len() * std::mem::size_of::<$t>()];
            B::$write(&typed, &mut out);
            out
        }};
    }
    match dtype {
        DataType::Bool => values.iter().map(|v| u8::from(*v != 0.0)).collect(),
        DataType::Int8 => values.iter().map(|v| *v as i128 as i8 as u8).collect(),
        DataType::UInt8 => values.iter().map(|v| *v as i128 as u8).collect(),
        DataType::Int16 => write_from!(write_i16_into, i16, |v: f64| v as i128 as i16),
        DataType::Int32 => write_from!(write_i32_into, i32, |v: f64| v as i128 as i32),
        DataType::Int64 => write_from!(write_i64_into, i64, |v: f64| v as i128 as i64),
        DataType::UInt16 => write_from!(write_u16_into, u16, |v: f64| v as i128 as u16),
        DataType::UInt32 => write_from!(write_u32_into, u32, |v: f64| v as i128 as u32),
        DataType::UInt64 => write_from!(write_u64_into, u64, |v: f64| v as i128 as u64),
        DataType::Float16 => {
            write_from!(write_u16_into, u16, |v: f64| f16::from_f64(v).to_bits())
        }
        DataType::Float32 => write_from!(write_f32_into, f32, |v: f64| v as f32),
        DataType::Float64 => write_from!(write_f64_into, f64, |v: f64| v),
        DataType::Complex64 | DataType::Complex128 | DataType::String | DataType::Bytes => {
            unreachable!("rejected by f64s_to_bytes")
        }
    }
}

pub mod v2;

use crate::types::{DataType, FillValue, ZarrValue};
use half::f16;
use num_complex::Complex;

/// Parse a `fill_value` JSON value for an array of `dtype`.
///
/// Accepts JSON `null`, the special strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"` (floating types only), booleans, numbers and the
/// `[real, imag]` pairs written for complex dtypes.
pub fn parse_fill_value(dtype: DataType, value: &serde_json::Value) -> Result<FillValue, String> {
    let floating = matches!(
        dtype,
        DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Complex64
            | DataType::Complex128
    );

    match value {
        serde_json::Value::Null => Ok(FillValue::Unset),

        serde_json::Value::String(s) => match (s.as_str(), floating) {
            ("NaN", true) => Ok(FillValue::NaN),
            ("Infinity", true) => Ok(FillValue::Infinity),
            ("-Infinity", true) => Ok(FillValue::NegativeInfinity),
            ("NaN" | "Infinity" | "-Infinity", false) => {
                Err(format!("{s} not valid for {dtype:?}"))
            }
            _ => match dtype {
                DataType::String => Ok(FillValue::Value(ZarrValue::String(s.clone()))),
                // V2 encodes fixed-length byte fills as base64; keep the text as-is.
                DataType::Bytes => Ok(FillValue::Value(ZarrValue::Bytes(s.as_bytes().to_vec()))),
                _ => Err(format!("Expected {dtype:?} value, got string: {s}")),
            },
        },

        serde_json::Value::Bool(b) => match dtype {
            DataType::Bool => Ok(FillValue::Value(ZarrValue::Bool(*b))),
            _ => Err(format!("Expected {dtype:?}, got bool")),
        },

        serde_json::Value::Number(n) => parse_numeric_fill(dtype, n).map(FillValue::Value),

        serde_json::Value::Array(parts) => match (dtype, parts.as_slice()) {
            (DataType::Complex64, [re, im]) => Ok(FillValue::Value(ZarrValue::Complex64(
                Complex::new(complex_part(re)? as f32, complex_part(im)? as f32),
            ))),
            (DataType::Complex128, [re, im]) => Ok(FillValue::Value(ZarrValue::Complex128(
                Complex::new(complex_part(re)?, complex_part(im)?),
            ))),
            _ => Err(format!("Unexpected fill_value JSON for {dtype:?}: {value}")),
        },

        _ => Err(format!("Unexpected fill_value JSON: {value}")),
    }
}

/// One half of a complex fill. Either half may be a non-finite float string.
fn complex_part(part: &serde_json::Value) -> Result<f64, String> {
    match part {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("Expected float, got {n}")),
        serde_json::Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(format!("Expected float, got string: {s}")),
        },
        other => Err(format!("Expected float, got {other}")),
    }
}

fn signed<T: TryFrom<i64>>(dtype: DataType, n: &serde_json::Number) -> Result<T, String> {
    let i = n
        .as_i64()
        .ok_or_else(|| format!("Expected int for {dtype:?}, got {n}"))?;
    T::try_from(i).map_err(|_| format!("Value {i} out of range for {dtype:?}"))
}

fn unsigned<T: TryFrom<u64>>(dtype: DataType, n: &serde_json::Number) -> Result<T, String> {
    let u = n
        .as_u64()
        .ok_or_else(|| format!("Expected uint for {dtype:?}, got {n}"))?;
    T::try_from(u).map_err(|_| format!("Value {u} out of range for {dtype:?}"))
}

fn parse_numeric_fill(dtype: DataType, n: &serde_json::Number) -> Result<ZarrValue, String> {
    let float = || {
        n.as_f64()
            .ok_or_else(|| format!("Expected float for {dtype:?}, got {n}"))
    };

    Ok(match dtype {
        DataType::Bool => ZarrValue::Bool(signed::<i64>(dtype, n)? != 0),
        DataType::Int8 => ZarrValue::Int8(signed(dtype, n)?),
        DataType::Int16 => ZarrValue::Int16(signed(dtype, n)?),
        DataType::Int32 => ZarrValue::Int32(signed(dtype, n)?),
        DataType::Int64 => ZarrValue::Int64(signed(dtype, n)?),
        DataType::UInt8 => ZarrValue::UInt8(unsigned(dtype, n)?),
        DataType::UInt16 => ZarrValue::UInt16(unsigned(dtype, n)?),
        DataType::UInt32 => ZarrValue::UInt32(unsigned(dtype, n)?),
        DataType::UInt64 => ZarrValue::UInt64(unsigned(dtype, n)?),
        DataType::Float16 => ZarrValue::Float16(f16::from_f64(float()?)),
        DataType::Float32 => ZarrValue::Float32(float()? as f32),
        DataType::Float64 => ZarrValue::Float64(float()?),
        DataType::Complex64 => ZarrValue::Complex64(Complex::new(float()? as f32, 0.0)),
        DataType::Complex128 => ZarrValue::Complex128(Complex::new(float()?, 0.0)),
        DataType::String | DataType::Bytes => {
            return Err(format!("Expected string for {dtype:?}, got number"));
        }
    })
}

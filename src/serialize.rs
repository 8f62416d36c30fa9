//! Dump a whole array as raw `u8` bytes after scaling.
//!
//! Every element is divided by a divisor (2.0 unless overridden), truncated
//! toward zero and wrapped into a byte. The output has no header: one byte
//! per element, C order.

use std::path::Path;

use crate::array::ZarrArray;
use crate::error::{ZarrError, ZarrResult};
use crate::metadata::v2::parse_numpy_dtype;
use crate::store::StoreRef;
use crate::v2::open_array;

pub const DEFAULT_DIVISOR: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct SerializeOptions {
    pub divisor: f64,
    /// NumPy dtype string the source must match, e.g. `"<f4"`.
    pub expected_dtype: Option<String>,
    /// Fail on scaled values outside `0..=255` instead of wrapping.
    pub check_range: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_DIVISOR,
            expected_dtype: None,
            check_range: false,
        }
    }
}

/// Summary of the scaled values, before the cast to `u8`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ValueStats {
    /// `None` for an empty input. NaNs are ignored by min/max but poison the mean.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &v| (lo.min(v), hi.max(v), sum + v),
        );
        Some(Self {
            min,
            max,
            mean: sum / values.len() as f64,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SerializeReport {
    pub shape: Vec<usize>,
    pub dtype: String,
    pub bytes_written: usize,
    pub stats: Option<ValueStats>,
}

/// Cast one scaled value to a byte: truncate toward zero, then keep the low
/// eight bits of the integer. NaN becomes 0 and infinities saturate before
/// wrapping.
pub fn wrap_to_u8(v: f64) -> u8 {
    (v as i64) as u8
}

/// Divide every value by `divisor` and cast with [`wrap_to_u8`].
pub fn scale_to_u8(values: &[f64], divisor: f64) -> Vec<u8> {
    values.iter().map(|v| wrap_to_u8(v / divisor)).collect()
}

fn check_dtype(array: &ZarrArray, expected: &str) -> ZarrResult<()> {
    let wanted = parse_numpy_dtype(expected)
        .map_err(|e| ZarrError::Other(format!("bad expected dtype: {e}")))?;
    let actual = &array.element_type()?.dtype;
    if !actual.same_layout(&wanted) {
        return Err(ZarrError::DtypeMismatch {
            expected: wanted.to_string(),
            found: actual.to_string(),
        });
    }
    Ok(())
}

fn check_range(scaled: &[f64]) -> ZarrResult<()> {
    match scaled
        .iter()
        .enumerate()
        .find(|(_, v)| !(0.0..=255.0).contains(*v))
    {
        Some((index, &value)) => Err(ZarrError::OutOfRange { index, value }),
        None => Ok(()),
    }
}

/// Read the array at `array_path`, scale it and write the bytes to `output`.
///
/// `output` is only created once the array has been read and checked.
pub async fn serialize_array(
    store: StoreRef,
    array_path: &str,
    output: &Path,
    options: &SerializeOptions,
) -> ZarrResult<SerializeReport> {
    if options.divisor == 0.0 || !options.divisor.is_finite() {
        return Err(ZarrError::Other(format!(
            "divisor must be finite and non-zero, got {}",
            options.divisor
        )));
    }

    let array = open_array(store, array_path).await?;
    if let Some(expected) = &options.expected_dtype {
        check_dtype(&array, expected)?;
    }
    let dtype = array.element_type()?.dtype.to_string();

    log::info!(
        "reading {} elements of {dtype} (shape {:?})",
        array.num_elements(),
        array.shape()
    );
    let values = array.load().await?;

    let scaled: Vec<f64> = values.iter().map(|v| v / options.divisor).collect();
    if options.check_range {
        check_range(&scaled)?;
    }
    let stats = ValueStats::of(&scaled);
    if let Some(s) = &stats {
        log::info!("scaled values: min {} max {} mean {}", s.min, s.max, s.mean);
    }

    let bytes: Vec<u8> = scaled.iter().copied().map(wrap_to_u8).collect();
    tokio::fs::write(output, &bytes)
        .await
        .map_err(|e| ZarrError::io_at(output, e))?;
    log::info!("wrote {} bytes to {}", bytes.len(), output.display());

    Ok(SerializeReport {
        shape: array.shape().to_vec(),
        dtype,
        bytes_written: bytes.len(),
        stats,
    })
}

use crate::error::{ZarrError, ZarrResult};
use crate::types::{ArrayOrder, DataType, Endian, FillValue};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata document names inside a V2 store.
pub const ZARRAY: &str = ".zarray";
pub const ZGROUP: &str = ".zgroup";
pub const ZATTRS: &str = ".zattrs";

// ---------------------------------------------------------------------------
// V2 DataType  (NumPy format wrapper)
// ---------------------------------------------------------------------------

/// A NumPy dtype string (e.g. `"<f8"`, `">i4"`, `"|b1"`, `"<M8[ns]"`)
/// resolved to the core [`DataType`] plus its byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2DataType {
    pub data_type: DataType,
    pub byte_order: Endian,
    /// NumPy kind code (`i`, `u`, `f`, `M`, `S`, `U`, ...).
    pub kind: char,
    /// Item size in bytes as written after the kind code.
    pub item_size: usize,
    pub time_unit: Option<String>,
    /// The dtype string exactly as written in `.zarray`.
    pub numpy: String,
}

impl V2DataType {
    /// True when both describe the same element layout. A `|` byte order
    /// matches either endianness. Datetimes must agree on their unit.
    pub fn same_layout(&self, other: &V2DataType) -> bool {
        let order_ok = match (self.byte_order, other.byte_order) {
            (Endian::NotApplicable, _) | (_, Endian::NotApplicable) => true,
            (a, b) => a == b,
        };
        self.data_type == other.data_type
            && self.kind == other.kind
            && self.item_size == other.item_size
            && self.time_unit == other.time_unit
            && order_ok
    }
}

impl std::fmt::Display for V2DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.numpy)
    }
}

/// Parse a NumPy dtype format string into a [`V2DataType`].
pub fn parse_numpy_dtype(s: &str) -> Result<V2DataType, String> {
    let mut chars = s.chars();
    let (Some(order), Some(code)) = (chars.next(), chars.next()) else {
        return Err(format!("NumPy format string too short: {s}"));
    };
    let rest = chars.as_str();

    let byte_order = match order {
        '<' => Endian::Little,
        '>' => Endian::Big,
        '|' => Endian::NotApplicable,
        _ => return Err(format!("Invalid byte order: {order}")),
    };

    // Datetime/timedelta carry a unit suffix like `[ns]`.
    let (size_str, time_unit) = match rest.split_once('[') {
        Some((size, unit)) if matches!(code, 'M' | 'm') => {
            let unit = unit
                .strip_suffix(']')
                .ok_or("Missing closing bracket in datetime format")?;
            (size, Some(unit.to_string()))
        }
        _ => (rest, None),
    };

    if code == 'O' {
        return Err(format!("object dtype {s} has no fixed-width layout"));
    }

    let byte_size: usize = size_str
        .parse()
        .map_err(|_| format!("Invalid byte size: {size_str}"))?;
    if byte_size == 0 {
        return Err(format!("Byte size must be > 0, got {size_str}"));
    }

    let data_type = match (code, byte_size) {
        ('b', 1) => DataType::Bool,
        ('i', 1) => DataType::Int8,
        ('i', 2) => DataType::Int16,
        ('i', 4) => DataType::Int32,
        ('i', 8) => DataType::Int64,
        ('u', 1) => DataType::UInt8,
        ('u', 2) => DataType::UInt16,
        ('u', 4) => DataType::UInt32,
        ('u', 8) => DataType::UInt64,
        ('f', 2) => DataType::Float16,
        ('f', 4) => DataType::Float32,
        ('f', 8) => DataType::Float64,
        ('c', 8) => DataType::Complex64,
        ('c', 16) => DataType::Complex128,
        ('S', _) | ('U', _) => DataType::String,
        ('V', _) => DataType::Bytes,
        // Datetimes are epoch offsets.
        ('M', 8) | ('m', 8) => DataType::Int64,
        _ => return Err(format!("Unsupported NumPy type: {code}{byte_size}")),
    };

    Ok(V2DataType {
        data_type,
        byte_order,
        kind: code,
        item_size: byte_size,
        time_unit,
        numpy: s.to_string(),
    })
}

impl<'de> Deserialize<'de> for V2DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_numpy_dtype(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ZarrCompressor
// ---------------------------------------------------------------------------

/// The `compressor` object of a `.zarray`: a numcodecs id plus its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZarrCompressor {
    pub id: String,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// ZarrV2Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ZarrV2Metadata {
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,

    /// `dtype` as written: a NumPy string, `"|O"`, or a structured list.
    /// [`ZarrV2Metadata::element_type`] resolves it.
    pub dtype: serde_json::Value,

    #[serde(default)]
    pub fill_value: serde_json::Value,

    #[serde(default)]
    pub order: ArrayOrder,

    #[serde(default)]
    pub compressor: Option<ZarrCompressor>,

    #[serde(default)]
    pub filters: Option<Vec<serde_json::Value>>,

    #[serde(default = "default_zarr_format")]
    pub zarr_format: u32,

    #[serde(default = "default_separator")]
    pub dimension_separator: String,

    /// The document as stored, for rewriting without losing unknown fields.
    #[serde(skip)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// A `.zarray` dtype and fill value resolved into typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementType {
    pub dtype: V2DataType,
    pub fill_value: FillValue,
}

fn default_zarr_format() -> u32 {
    2
}

fn default_separator() -> String {
    ".".into()
}

impl<'de> Deserialize<'de> for ArrayOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "C" | "c" => Ok(ArrayOrder::C),
            "F" | "f" => Ok(ArrayOrder::F),
            _ => Err(serde::de::Error::custom(format!("Unknown order: {s}"))),
        }
    }
}

impl ZarrV2Metadata {
    /// Parse a `.zarray` document.
    ///
    /// Only the chunk grid and key layout are checked here. `dtype` and
    /// `fill_value` stay as JSON, so arrays of object or structured dtypes
    /// still open and can be copied byte for byte.
    pub fn parse(json_bytes: &[u8]) -> ZarrResult<Self> {
        let raw: serde_json::Value = serde_json::from_slice(json_bytes)
            .map_err(|e| ZarrError::Metadata(format!("Invalid JSON: {e}")))?;

        let obj = raw
            .as_object()
            .ok_or_else(|| ZarrError::Metadata("Expected JSON object".into()))?
            .clone();

        let mut md: ZarrV2Metadata = serde_json::from_value(raw)
            .map_err(|e| ZarrError::Metadata(format!("Metadata parse error: {e}")))?;

        if md.zarr_format != 2 {
            return Err(ZarrError::Unsupported(format!(
                "zarr_format {} (only 2 is supported)",
                md.zarr_format
            )));
        }
        if md.shape.len() != md.chunks.len() {
            return Err(ZarrError::Metadata(format!(
                "shape has {} dimensions but chunks has {}",
                md.shape.len(),
                md.chunks.len()
            )));
        }
        if md.chunks.contains(&0) {
            return Err(ZarrError::Metadata("chunk sizes must be > 0".into()));
        }
        if !matches!(md.dimension_separator.as_str(), "." | "/") {
            return Err(ZarrError::Metadata(format!(
                "Unknown dimension_separator: {}",
                md.dimension_separator
            )));
        }

        md.raw = obj;
        Ok(md)
    }

    /// Resolve `dtype` and `fill_value`. The fill value's meaning depends on
    /// the dtype, so both are parsed together.
    pub fn element_type(&self) -> Result<ElementType, String> {
        let numpy = self
            .dtype
            .as_str()
            .ok_or_else(|| format!("structured dtype {} is not supported", self.dtype))?;
        let dtype = parse_numpy_dtype(numpy)?;
        let fill_value = super::parse_fill_value(dtype.data_type, &self.fill_value)
            .map_err(|e| format!("fill_value: {e}"))?;
        Ok(ElementType { dtype, fill_value })
    }

    /// Total element count.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Elements in one (full) chunk.
    pub fn chunk_len(&self) -> usize {
        self.chunks.iter().product()
    }

    /// Filters declared on the array, treating `null` and `[]` alike.
    pub fn active_filters(&self) -> &[serde_json::Value] {
        self.filters.as_deref().unwrap_or(&[])
    }

    /// Storage key of the chunk at grid position `indices`.
    pub fn chunk_key(&self, indices: &[usize]) -> String {
        chunk_key(indices, &self.dimension_separator)
    }

    /// Storage keys of every chunk position in the grid, in C order.
    pub fn keys(&self) -> Vec<String> {
        list_keys(&self.shape, &self.chunks, &self.dimension_separator)
    }

    /// The same document with `compressor` cleared, as pretty JSON.
    pub fn to_uncompressed_json(&self) -> ZarrResult<Vec<u8>> {
        let mut doc = self.raw.clone();
        doc.insert("compressor".into(), serde_json::Value::Null);
        Ok(serde_json::to_vec_pretty(&serde_json::Value::Object(doc))?)
    }
}

// ---------------------------------------------------------------------------
// Group metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZarrGroupMetadata {
    pub zarr_format: u32,
}

impl Default for ZarrGroupMetadata {
    fn default() -> Self {
        Self { zarr_format: 2 }
    }
}

impl ZarrGroupMetadata {
    pub fn parse(json_bytes: &[u8]) -> ZarrResult<Self> {
        let md: ZarrGroupMetadata = serde_json::from_slice(json_bytes)
            .map_err(|e| ZarrError::Metadata(format!("Invalid .zgroup: {e}")))?;
        if md.zarr_format != 2 {
            return Err(ZarrError::Unsupported(format!(
                "zarr_format {} (only 2 is supported)",
                md.zarr_format
            )));
        }
        Ok(md)
    }

    pub fn to_json(&self) -> ZarrResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// Storage key for a chunk position. Zero-dimensional arrays use `"0"`.
pub fn chunk_key(indices: &[usize], separator: &str) -> String {
    if indices.is_empty() {
        return "0".into();
    }
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Generate all storage keys for a given array shape and chunk sizes.
pub fn list_keys(shape: &[usize], chunks: &[usize], separator: &str) -> Vec<String> {
    let chunks_per_dim: Vec<usize> = shape
        .iter()
        .zip(chunks.iter())
        .map(|(s, c)| (*s).div_ceil(*c))
        .collect();

    crate::array::cartesian_indices(&chunks_per_dim)
        .into_iter()
        .map(|idx| chunk_key(&idx, separator))
        .collect()
}

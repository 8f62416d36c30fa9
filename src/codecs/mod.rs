pub mod blosc;
pub mod bz2;
pub mod delta;
pub mod fixedscaleoffset;
pub mod gzip;
pub mod lz4;
pub mod lzma;
pub mod zlib;
pub mod zstd;

use crate::error::{ZarrError, ZarrResult};
use crate::metadata::v2::{V2DataType, ZarrCompressor, parse_numpy_dtype};

type ConfigMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// AnyCodec  (enum dispatch, no Box<dyn>)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum AnyCodec {
    Gzip(gzip::GzipCodec),
    Blosc(blosc::BloscCodec),
    Zlib(zlib::ZlibCodec),
    Zstd(zstd::ZstdCodec),
    Lz4(lz4::Lz4Codec),
    Bz2(bz2::Bz2Codec),
    Lzma(lzma::LzmaCodec),
}

impl AnyCodec {
    /// The numcodecs id this codec is stored under in a `.zarray`.
    pub fn id(&self) -> &'static str {
        match self {
            AnyCodec::Gzip(_) => "gzip",
            AnyCodec::Blosc(_) => "blosc",
            AnyCodec::Zlib(_) => "zlib",
            AnyCodec::Zstd(_) => "zstd",
            AnyCodec::Lz4(_) => "lz4",
            AnyCodec::Bz2(_) => "bz2",
            AnyCodec::Lzma(_) => "lzma",
        }
    }

    /// Decode bytes using this codec.
    pub async fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        match self {
            AnyCodec::Gzip(c) => c.decode(data),
            AnyCodec::Blosc(c) => c.decode(data).await,
            AnyCodec::Zlib(c) => c.decode(data),
            AnyCodec::Zstd(c) => c.decode(data),
            AnyCodec::Lz4(c) => c.decode(data),
            AnyCodec::Bz2(c) => c.decode(data),
            AnyCodec::Lzma(c) => c.decode(data),
        }
    }

    /// Encode bytes using this codec.
    pub async fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        match self {
            AnyCodec::Gzip(c) => c.encode(data),
            AnyCodec::Blosc(c) => c.encode(data).await,
            AnyCodec::Zlib(c) => c.encode(data),
            AnyCodec::Zstd(c) => c.encode(data),
            AnyCodec::Lz4(c) => c.encode(data),
            AnyCodec::Bz2(c) => c.encode(data),
            AnyCodec::Lzma(c) => c.encode(data),
        }
    }
}

// ---------------------------------------------------------------------------
// V2 compressor -> codec
// ---------------------------------------------------------------------------

/// Resolve a `.zarray` compressor object to the codec that decodes it.
///
/// The standalone `lz4hc`, `blosclz` and `snappy` ids only exist as blosc
/// sub-compressors, so they map onto blosc.
pub fn compressor_to_codec(comp: &ZarrCompressor) -> ZarrResult<AnyCodec> {
    let config = &comp.config;
    match comp.id.to_lowercase().as_str() {
        "gzip" => Ok(AnyCodec::Gzip(gzip::GzipCodec::from_v2_config(config))),
        "zlib" => Ok(AnyCodec::Zlib(zlib::ZlibCodec::from_v2_config(config))),
        "zstd" => Ok(AnyCodec::Zstd(zstd::ZstdCodec::from_v2_config(config))),
        "lz4" => Ok(AnyCodec::Lz4(lz4::Lz4Codec::from_v2_config(config))),
        "bz2" => Ok(AnyCodec::Bz2(bz2::Bz2Codec::from_v2_config(config))),
        "lzma" => Ok(AnyCodec::Lzma(lzma::LzmaCodec::from_v2_config(config)?)),
        "blosc" => Ok(AnyCodec::Blosc(blosc::BloscCodec::from_v2_config(config, None))),
        "lz4hc" => Ok(AnyCodec::Blosc(blosc::BloscCodec::from_v2_config(
            config,
            Some(blosc::BloscCname::Lz4hc),
        ))),
        "blosclz" => Ok(AnyCodec::Blosc(blosc::BloscCodec::from_v2_config(
            config,
            Some(blosc::BloscCname::Blosclz),
        ))),
        "snappy" => Ok(AnyCodec::Blosc(blosc::BloscCodec::from_v2_config(
            config,
            Some(blosc::BloscCname::Snappy),
        ))),
        other => Err(ZarrError::Codec(format!("Unsupported compressor: {other}"))),
    }
}

// ---------------------------------------------------------------------------
// V2 filters
// ---------------------------------------------------------------------------

/// A `.zarray` filter. Filters run between the compressor and the typed
/// view: decoding undoes the compressor first, then each filter from last
/// to first.
#[derive(Debug, Clone)]
pub enum AnyFilter {
    FixedScaleOffset(fixedscaleoffset::FixedScaleOffsetCodec),
    Delta(delta::DeltaCodec),
}

impl AnyFilter {
    /// Resolve one entry of a `filters` list. Ids with no decoder here
    /// (`vlen-utf8`, `quantize`, ...) are reported by name.
    pub fn from_v2_config(filter: &serde_json::Value) -> Result<Self, String> {
        let config = filter
            .as_object()
            .ok_or_else(|| format!("filter is not an object: {filter}"))?;
        match config.get("id").and_then(serde_json::Value::as_str) {
            Some("fixedscaleoffset") => Ok(AnyFilter::FixedScaleOffset(
                fixedscaleoffset::FixedScaleOffsetCodec::from_v2_config(config)?,
            )),
            Some("delta") => Ok(AnyFilter::Delta(delta::DeltaCodec::from_v2_config(config)?)),
            Some(other) => Err(format!("no decoder for filter {other}")),
            None => Err(format!("filter without an id: {filter}")),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            AnyFilter::FixedScaleOffset(_) => "fixedscaleoffset",
            AnyFilter::Delta(_) => "delta",
        }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        match self {
            AnyFilter::FixedScaleOffset(c) => c.decode(data),
            AnyFilter::Delta(c) => c.decode(data),
        }
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        match self {
            AnyFilter::FixedScaleOffset(c) => c.encode(data),
            AnyFilter::Delta(c) => c.encode(data),
        }
    }
}

/// Undo `filters` on a chunk the compressor has already released.
pub fn apply_filter_pipeline(filters: &[AnyFilter], data: Vec<u8>) -> ZarrResult<Vec<u8>> {
    filters
        .iter()
        .rev()
        .try_fold(data, |buf, filter| filter.decode(&buf))
}

/// Inverse of [`apply_filter_pipeline`].
pub fn encode_filter_pipeline(filters: &[AnyFilter], data: Vec<u8>) -> ZarrResult<Vec<u8>> {
    filters.iter().try_fold(data, |buf, filter| filter.encode(&buf))
}

/// A dtype setting of a filter config. numcodecs writes NumPy strings such
/// as `"<f8"`; bare codes (`"f8"`) and names (`"float32"`) are also accepted.
pub(crate) fn config_dtype(config: &ConfigMap, key: &str) -> Result<Option<V2DataType>, String> {
    let s = match config.get(key) {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(other) => return Err(format!("{key} must be a dtype string, got {other}")),
    };
    let named = [("uint", 'u'), ("int", 'i'), ("float", 'f')]
        .into_iter()
        .find_map(|(name, code)| Some((code, s.strip_prefix(name)?)));
    let numpy = match named {
        _ if s == "bool" => "|b1".to_string(),
        Some((code, bits)) => {
            let bits: usize = bits
                .parse()
                .map_err(|_| format!("{key}: unknown dtype name {s}"))?;
            format!("<{code}{}", bits / 8)
        }
        None if s.starts_with(['<', '>', '|']) => s.to_string(),
        None => format!("<{s}"),
    };
    parse_numpy_dtype(&numpy).map(Some)
}

/// Float setting of a filter config, as a JSON number or numeric string.
pub(crate) fn config_float(config: &ConfigMap, key: &str) -> Result<Option<f64>, String> {
    match config.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .map(Some)
            .ok_or_else(|| format!("{key} must be a number, got {v}")),
    }
}

/// Integer setting from a compressor config; numcodecs sometimes writes
/// them as strings.
pub(crate) fn config_int(config: &ConfigMap, key: &str) -> Option<i64> {
    config.get(key).and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse::<i64>().ok()))
    })
}

// ---------------------------------------------------------------------------
// Codec pipeline
// ---------------------------------------------------------------------------

/// Apply a list of codecs to decode data. Codecs are applied in *reverse* order
/// (last codec decodes first).
pub async fn apply_codec_pipeline(codecs: &[AnyCodec], data: &[u8]) -> ZarrResult<Vec<u8>> {
    let mut buf = data.to_vec();
    for codec in codecs.iter().rev() {
        buf = codec.decode(&buf).await?;
    }
    Ok(buf)
}

/// Inverse of [`apply_codec_pipeline`]: encode with each codec in order.
pub async fn encode_codec_pipeline(codecs: &[AnyCodec], data: &[u8]) -> ZarrResult<Vec<u8>> {
    let mut buf = data.to_vec();
    for codec in codecs {
        buf = codec.encode(&buf).await?;
    }
    Ok(buf)
}

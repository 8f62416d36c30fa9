use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};
use std::ffi::CStr;

// ---------------------------------------------------------------------------
// Blosc sub-compressor and shuffle types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloscCname {
    Lz4,
    Lz4hc,
    Blosclz,
    Zstd,
    Snappy,
    Zlib,
}

impl BloscCname {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lz4" => Some(BloscCname::Lz4),
            "lz4hc" => Some(BloscCname::Lz4hc),
            "blosclz" => Some(BloscCname::Blosclz),
            "zstd" => Some(BloscCname::Zstd),
            "snappy" => Some(BloscCname::Snappy),
            "zlib" => Some(BloscCname::Zlib),
            _ => None,
        }
    }

    /// Name as the blosc C library expects it.
    fn as_cstr(self) -> &'static CStr {
        match self {
            BloscCname::Lz4 => c"lz4",
            BloscCname::Lz4hc => c"lz4hc",
            BloscCname::Blosclz => c"blosclz",
            BloscCname::Zstd => c"zstd",
            BloscCname::Snappy => c"snappy",
            BloscCname::Zlib => c"zlib",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloscShuffle {
    NoShuffle,
    Shuffle,
    BitShuffle,
}

impl BloscShuffle {
    /// numcodecs writes shuffle as an int; older stores use names.
    fn from_json(v: &serde_json::Value) -> Option<Self> {
        let n = match v {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => match s.to_lowercase().as_str() {
                "noshuffle" | "0" => 0,
                "shuffle" | "1" => 1,
                "bitshuffle" | "2" => 2,
                _ => return None,
            },
            _ => return None,
        };
        match n {
            0 => Some(BloscShuffle::NoShuffle),
            1 => Some(BloscShuffle::Shuffle),
            2 => Some(BloscShuffle::BitShuffle),
            _ => None,
        }
    }

    fn as_raw(self) -> i32 {
        match self {
            BloscShuffle::NoShuffle => blosc_src::BLOSC_NOSHUFFLE as i32,
            BloscShuffle::Shuffle => blosc_src::BLOSC_SHUFFLE as i32,
            BloscShuffle::BitShuffle => blosc_src::BLOSC_BITSHUFFLE as i32,
        }
    }
}

// ---------------------------------------------------------------------------
// BloscCodec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BloscCodec {
    pub typesize: Option<usize>,
    pub cname: BloscCname,
    pub clevel: i32,
    pub shuffle: Option<BloscShuffle>,
    pub blocksize: usize,
}

impl Default for BloscCodec {
    fn default() -> Self {
        Self {
            typesize: None,
            cname: BloscCname::Lz4,
            clevel: 5,
            shuffle: Some(BloscShuffle::NoShuffle),
            blocksize: 0,
        }
    }
}

impl BloscCodec {
    /// Build from a numcodecs blosc config. `fallback_cname` applies when the
    /// config names no sub-compressor (the `lz4hc`/`snappy`/... aliases).
    pub fn from_v2_config(config: &ConfigMap, fallback_cname: Option<BloscCname>) -> Self {
        let cname = config
            .get("cname")
            .and_then(|v| v.as_str())
            .and_then(BloscCname::parse)
            .or(fallback_cname)
            .unwrap_or(BloscCname::Lz4);

        let clevel = config_int(config, "clevel")
            .or_else(|| config_int(config, "level"))
            .unwrap_or(5)
            .clamp(0, 9) as i32;

        let shuffle = config.get("shuffle").and_then(BloscShuffle::from_json);
        let blocksize = config_int(config, "blocksize").unwrap_or(0).max(0) as usize;

        BloscCodec {
            typesize: config_int(config, "typesize").map(|t| t.max(1) as usize),
            cname,
            clevel,
            shuffle,
            blocksize,
        }
    }

    /// Decompress blosc-compressed data.
    /// Runs on a blocking thread since decompression can be CPU-intensive.
    pub async fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || blosc_decompress(&data))
            .await
            .map_err(|e| ZarrError::Decode(format!("Blosc task join error: {e}")))?
    }

    /// Compress data using blosc.
    pub async fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let data = data.to_vec();
        let codec = self.clone();
        tokio::task::spawn_blocking(move || blosc_compress(&data, &codec))
            .await
            .map_err(|e| ZarrError::Encode(format!("Blosc task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Blosc FFI wrappers
// ---------------------------------------------------------------------------

/// Uncompressed size recorded in a blosc header, or `None` if the header
/// does not validate.
fn blosc_validate(data: &[u8]) -> Option<usize> {
    let mut nbytes: usize = 0;
    // SAFETY: blosc only reads `data.len()` bytes from the pointer.
    let result =
        unsafe { blosc_src::blosc_cbuffer_validate(data.as_ptr().cast(), data.len(), &mut nbytes) };
    if result == 0 { Some(nbytes) } else { None }
}

/// `blosc_decompress_ctx` is thread-safe and needs no `blosc_init()`.
fn blosc_decompress(data: &[u8]) -> ZarrResult<Vec<u8>> {
    let nbytes = blosc_validate(data)
        .ok_or_else(|| ZarrError::Decode("Blosc encoded value is invalid".into()))?;

    if nbytes == 0 {
        return Ok(Vec::new());
    }

    let mut output = vec![0u8; nbytes];
    // SAFETY: `output` holds exactly the size the header validated.
    let result = unsafe {
        blosc_src::blosc_decompress_ctx(
            data.as_ptr().cast(),
            output.as_mut_ptr().cast(),
            output.len(),
            1, // numinternalthreads
        )
    };
    if result < 0 {
        return Err(ZarrError::Decode(format!(
            "Blosc decompress returned error code: {result}"
        )));
    }
    output.truncate(result as usize);
    Ok(output)
}

fn blosc_compress(data: &[u8], codec: &BloscCodec) -> ZarrResult<Vec<u8>> {
    let destsize = data.len() + blosc_src::BLOSC_MAX_OVERHEAD as usize;
    let mut compressed = vec![0u8; destsize];

    // SAFETY: `compressed` has room for the input plus blosc's worst-case overhead.
    let cbytes = unsafe {
        blosc_src::blosc_compress_ctx(
            codec.clevel,
            codec.shuffle.unwrap_or(BloscShuffle::NoShuffle).as_raw(),
            codec.typesize.unwrap_or(1),
            data.len(),
            data.as_ptr().cast(),
            compressed.as_mut_ptr().cast(),
            destsize,
            codec.cname.as_cstr().as_ptr(),
            codec.blocksize,
            1, // numinternalthreads
        )
    };

    if cbytes <= 0 {
        return Err(ZarrError::Encode(format!(
            "Blosc compress returned error code: {cbytes}"
        )));
    }
    compressed.truncate(cbytes as usize);
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numcodecs_config() {
        let config: ConfigMap = serde_json::from_str(
            r#"{"cname": "zstd", "clevel": 3, "shuffle": 2, "blocksize": 0}"#,
        )
        .unwrap();
        let codec = BloscCodec::from_v2_config(&config, None);
        assert_eq!(codec.cname, BloscCname::Zstd);
        assert_eq!(codec.clevel, 3);
        assert_eq!(codec.shuffle, Some(BloscShuffle::BitShuffle));
    }

    #[test]
    fn alias_supplies_sub_compressor() {
        let codec = BloscCodec::from_v2_config(&ConfigMap::new(), Some(BloscCname::Snappy));
        assert_eq!(codec.cname, BloscCname::Snappy);
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let err = BloscCodec::default().decode(b"not blosc").await.unwrap_err();
        assert!(matches!(err, ZarrError::Decode(_)));
    }
}

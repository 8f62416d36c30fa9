use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};

const LZ4_SIZE_PREFIX_BYTES: usize = 4;

/// numcodecs `LZ4`: a raw lz4 block behind a little-endian `u32` length.
#[derive(Debug, Clone)]
pub struct Lz4Codec {
    pub acceleration: i32,
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Self { acceleration: 1 }
    }
}

impl Lz4Codec {
    pub fn from_v2_config(config: &ConfigMap) -> Self {
        let acceleration = config_int(config, "acceleration").unwrap_or(1).max(1) as i32;
        Self { acceleration }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let Some((prefix, payload)) = data.split_first_chunk::<LZ4_SIZE_PREFIX_BYTES>() else {
            return Err(ZarrError::Decode(
                "LZ4 decode: compressed buffer missing 4-byte size prefix".into(),
            ));
        };
        let dest_size = u32::from_le_bytes(*prefix) as usize;

        let decompressed = lz4_flex::block::decompress(payload, dest_size)
            .map_err(|e| ZarrError::Decode(format!("LZ4 decompress failed: {e}")))?;

        if decompressed.len() != dest_size {
            return Err(ZarrError::Decode(format!(
                "LZ4 decompression error: expected {} bytes, got {}",
                dest_size,
                decompressed.len()
            )));
        }
        Ok(decompressed)
    }

    /// lz4_flex has no acceleration knob; the setting only round-trips.
    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let orig_size = u32::try_from(data.len())
            .map_err(|_| ZarrError::Encode("LZ4 input exceeds 4 GiB".into()))?;
        let compressed = lz4_flex::block::compress(data);
        let mut out = Vec::with_capacity(LZ4_SIZE_PREFIX_BYTES + compressed.len());
        out.extend_from_slice(&orig_size.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }
}

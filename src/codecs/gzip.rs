use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};
use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};
use std::io::Read;

/// numcodecs `gzip`: a full gzip stream (header, deflate body, crc trailer).
#[derive(Debug, Clone)]
pub struct GzipCodec {
    pub level: u32,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 5 }
    }
}

impl GzipCodec {
    pub fn from_v2_config(config: &ConfigMap) -> Self {
        let level = config_int(config, "level").unwrap_or(5).clamp(0, 9) as u32;
        Self { level }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Decode(format!("Gzip decompress failed: {e}")))?;
        Ok(out)
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        GzEncoder::new(data, Compression::new(self.level.min(9)))
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Encode(format!("Gzip compress failed: {e}")))?;
        Ok(out)
    }
}

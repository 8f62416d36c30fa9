use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

#[derive(Debug, Clone)]
pub struct ZlibCodec {
    pub level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self { level: 1 }
    }
}

impl ZlibCodec {
    pub fn from_v2_config(config: &ConfigMap) -> Self {
        let level = config_int(config, "level").unwrap_or(1).clamp(0, 9) as u32;
        Self { level }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Decode(format!("Zlib decompress failed: {e}")))?;
        Ok(out)
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        ZlibEncoder::new(data, Compression::new(self.level.min(9)))
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Encode(format!("Zlib compress failed: {e}")))?;
        Ok(out)
    }
}

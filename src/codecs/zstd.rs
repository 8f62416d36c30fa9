use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};

#[derive(Debug, Clone)]
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 1 }
    }
}

impl ZstdCodec {
    pub fn from_v2_config(config: &ConfigMap) -> Self {
        let level = config_int(config, "level").unwrap_or(1).clamp(-131072, 22) as i32;
        Self { level }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        // numcodecs frames always record the content size, but streaming
        // decode also covers frames written without it.
        zstd::stream::decode_all(data)
            .map_err(|e| ZarrError::Decode(format!("Zstd decompress failed: {e}")))
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        zstd::bulk::compress(data, self.level)
            .map_err(|e| ZarrError::Encode(format!("Zstd compress failed: {e}")))
    }
}

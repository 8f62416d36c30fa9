use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};
use bzip2::Compression;
use bzip2::read::{BzDecoder, BzEncoder};
use std::io::Read;

/// numcodecs `bz2`: a plain bzip2 stream.
#[derive(Debug, Clone)]
pub struct Bz2Codec {
    pub level: u32,
}

impl Default for Bz2Codec {
    fn default() -> Self {
        Self { level: 1 }
    }
}

impl Bz2Codec {
    pub fn from_v2_config(config: &ConfigMap) -> Self {
        let level = config_int(config, "level").unwrap_or(1).clamp(1, 9) as u32;
        Self { level }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        BzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Decode(format!("Bz2 decompress failed: {e}")))?;
        Ok(out)
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let mut out = Vec::new();
        BzEncoder::new(data, Compression::new(self.level.clamp(1, 9)))
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Encode(format!("Bz2 compress failed: {e}")))?;
        Ok(out)
    }
}

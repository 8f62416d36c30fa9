use crate::codecs::{ConfigMap, config_int};
use crate::error::{ZarrError, ZarrResult};
use std::io::Read;
use xz2::read::{XzDecoder, XzEncoder};
use xz2::stream::{Check, LzmaOptions, Stream};

/// Container formats numcodecs can write, by their Python `lzma` constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzmaFormat {
    Xz,
    Alone,
}

/// numcodecs `lzma`. Decoding detects `.xz` and legacy `.lzma` streams by
/// their headers; raw streams carry no header and are rejected.
#[derive(Debug, Clone)]
pub struct LzmaCodec {
    pub format: LzmaFormat,
    pub preset: u32,
    /// Python `lzma` check constant; -1 picks the format's default.
    pub check: i64,
}

impl Default for LzmaCodec {
    fn default() -> Self {
        Self {
            format: LzmaFormat::Xz,
            preset: 6,
            check: -1,
        }
    }
}

impl LzmaCodec {
    pub fn from_v2_config(config: &ConfigMap) -> ZarrResult<Self> {
        let format = match config_int(config, "format").unwrap_or(1) {
            // FORMAT_AUTO only applies to decompression; numcodecs treats it as xz.
            0 | 1 => LzmaFormat::Xz,
            2 => LzmaFormat::Alone,
            3 => {
                return Err(ZarrError::Codec(
                    "lzma FORMAT_RAW streams cannot be decoded without their filter chain".into(),
                ));
            }
            other => return Err(ZarrError::Codec(format!("Unknown lzma format: {other}"))),
        };
        let check = config_int(config, "check").unwrap_or(-1);
        let preset = config_int(config, "preset").unwrap_or(6).clamp(0, 9) as u32;
        Ok(Self { format, preset, check })
    }

    fn xz_check(&self) -> Check {
        match self.check {
            0 => Check::None,
            1 => Check::Crc32,
            10 => Check::Sha256,
            _ => Check::Crc64,
        }
    }

    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let stream = Stream::new_auto_decoder(u64::MAX, 0)
            .map_err(|e| ZarrError::Decode(format!("Lzma decoder setup failed: {e}")))?;
        let mut out = Vec::new();
        XzDecoder::new_stream(data, stream)
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Decode(format!("Lzma decompress failed: {e}")))?;
        Ok(out)
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let stream = match self.format {
            LzmaFormat::Xz => Stream::new_easy_encoder(self.preset, self.xz_check()),
            LzmaFormat::Alone => LzmaOptions::new_preset(self.preset)
                .and_then(|options| Stream::new_lzma_encoder(&options)),
        }
        .map_err(|e| ZarrError::Encode(format!("Lzma encoder setup failed: {e}")))?;
        let mut out = Vec::new();
        XzEncoder::new_stream(data, stream)
            .read_to_end(&mut out)
            .map_err(|e| ZarrError::Encode(format!("Lzma compress failed: {e}")))?;
        Ok(out)
    }
}

use crate::codecs::{ConfigMap, config_dtype, config_float};
use crate::error::ZarrResult;
use crate::metadata::v2::V2DataType;
use crate::types::{bytes_to_zarr_vector, f64s_to_bytes};

/// numcodecs `fixedscaleoffset`: values of `dtype` are stored as
/// `round((x - offset) * scale)` in the usually narrower `astype`.
#[derive(Debug, Clone)]
pub struct FixedScaleOffsetCodec {
    pub scale: f64,
    pub offset: f64,
    pub dtype: V2DataType,
    pub astype: V2DataType,
}

impl FixedScaleOffsetCodec {
    pub fn from_v2_config(config: &ConfigMap) -> Result<Self, String> {
        let dtype = config_dtype(config, "dtype")?.ok_or("fixedscaleoffset needs a dtype")?;
        let astype = config_dtype(config, "astype")?.unwrap_or_else(|| dtype.clone());
        let scale = config_float(config, "scale")?.unwrap_or(1.0);
        if scale == 0.0 {
            return Err("fixedscaleoffset scale must not be 0".into());
        }
        Ok(Self {
            scale,
            offset: config_float(config, "offset")?.unwrap_or(0.0),
            dtype,
            astype,
        })
    }

    /// `astype` bytes in, `dtype` bytes out: `stored / scale + offset`.
    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let stored = bytes_to_zarr_vector(self.astype.byte_order, self.astype.data_type, data)?;
        let values: Vec<f64> = stored
            .to_f64_vec()
            .into_iter()
            .map(|v| v / self.scale + self.offset)
            .collect();
        f64s_to_bytes(self.dtype.byte_order, self.dtype.data_type, &values)
    }

    /// Rounds half to even, like `numpy.around`.
    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let values = bytes_to_zarr_vector(self.dtype.byte_order, self.dtype.data_type, data)?;
        let stored: Vec<f64> = values
            .to_f64_vec()
            .into_iter()
            .map(|v| ((v - self.offset) * self.scale).round_ties_even())
            .collect();
        f64s_to_bytes(self.astype.byte_order, self.astype.data_type, &stored)
    }
}

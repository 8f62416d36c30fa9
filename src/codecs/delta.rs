use crate::codecs::{ConfigMap, config_dtype};
use crate::error::ZarrResult;
use crate::metadata::v2::V2DataType;
use crate::types::{bytes_to_zarr_vector, f64s_to_bytes};

/// numcodecs `delta`: the first element is kept, every later one is stored
/// as the difference from its predecessor.
#[derive(Debug, Clone)]
pub struct DeltaCodec {
    pub dtype: V2DataType,
    pub astype: V2DataType,
}

impl DeltaCodec {
    pub fn from_v2_config(config: &ConfigMap) -> Result<Self, String> {
        let dtype = config_dtype(config, "dtype")?.ok_or("delta needs a dtype")?;
        let astype = config_dtype(config, "astype")?.unwrap_or_else(|| dtype.clone());
        Ok(Self { dtype, astype })
    }

    /// Running sum of the stored differences. Integer dtypes wrap on overflow.
    pub fn decode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let diffs = bytes_to_zarr_vector(self.astype.byte_order, self.astype.data_type, data)?;
        let values: Vec<f64> = diffs
            .to_f64_vec()
            .into_iter()
            .scan(0.0, |acc, d| {
                *acc += d;
                Some(*acc)
            })
            .collect();
        f64s_to_bytes(self.dtype.byte_order, self.dtype.data_type, &values)
    }

    pub fn encode(&self, data: &[u8]) -> ZarrResult<Vec<u8>> {
        let values = bytes_to_zarr_vector(self.dtype.byte_order, self.dtype.data_type, data)?
            .to_f64_vec();
        let diffs: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| if i == 0 { *v } else { v - values[i - 1] })
            .collect();
        f64s_to_bytes(self.astype.byte_order, self.astype.data_type, &diffs)
    }
}

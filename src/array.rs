use std::sync::Arc;

use crate::codecs::{
    AnyCodec, AnyFilter, apply_codec_pipeline, apply_filter_pipeline, compressor_to_codec,
};
use crate::error::{ZarrError, ZarrResult};
use crate::metadata::v2::{ElementType, ZarrV2Metadata};
use crate::store::StoreRef;
use crate::types::{ArrayOrder, ZarrVectorValue, bytes_to_zarr_vector};

// ---------------------------------------------------------------------------
// ZarrArray
// ---------------------------------------------------------------------------

/// An opened V2 array: its metadata plus the store it lives in.
///
/// Any array with a known compressor opens, so its chunks can always be
/// fetched as bytes. Reading values additionally needs a numeric dtype and
/// filters we can undo; that part is resolved once here and reported on
/// the first typed read.
///
/// Cloning is cheap; the store, metadata and codec chain are shared.
#[derive(Clone)]
pub struct ZarrArray {
    pub metadata: Arc<ZarrV2Metadata>,
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    store: StoreRef,
    path: String,
    codecs: Arc<Vec<AnyCodec>>,
    values: Arc<Result<ValueLayout, String>>,
}

/// What turns a decompressed chunk into numbers.
#[derive(Debug)]
struct ValueLayout {
    element: ElementType,
    filters: Vec<AnyFilter>,
}

impl ValueLayout {
    fn resolve(metadata: &ZarrV2Metadata) -> Result<Self, String> {
        let element = metadata.element_type()?;
        if !element.dtype.data_type.is_numeric() {
            return Err(format!("dtype {} is not numeric", element.dtype));
        }
        let filters = metadata
            .active_filters()
            .iter()
            .map(AnyFilter::from_v2_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { element, filters })
    }
}

impl std::fmt::Debug for ZarrArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrArray")
            .field("path", &self.path)
            .field("shape", &self.metadata.shape)
            .field("chunks", &self.metadata.chunks)
            .field("dtype", &self.metadata.dtype)
            .finish()
    }
}

impl ZarrArray {
    /// Wrap already-parsed metadata. Fails if the compressor is not one we
    /// can decode.
    pub fn new(
        store: StoreRef,
        path: impl Into<String>,
        metadata: ZarrV2Metadata,
        attributes: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> ZarrResult<Self> {
        let path = path.into();
        let codecs = match &metadata.compressor {
            Some(comp) => vec![compressor_to_codec(comp)?],
            None => vec![],
        };
        let values = ValueLayout::resolve(&metadata);
        if let Err(e) = &values {
            log::debug!("{path}: chunks are opaque bytes ({e})");
        }

        Ok(Self {
            metadata: Arc::new(metadata),
            attributes,
            store,
            path,
            codecs: Arc::new(codecs),
            values: Arc::new(values),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn shape(&self) -> &[usize] {
        &self.metadata.shape
    }

    /// Resolved dtype and fill value, or `Unsupported` for arrays whose
    /// elements are not fixed-width numbers.
    pub fn element_type(&self) -> ZarrResult<&ElementType> {
        self.value_layout().map(|v| &v.element)
    }

    pub fn num_elements(&self) -> usize {
        self.metadata.num_elements()
    }

    /// Store key of the chunk at grid position `indices`.
    pub fn chunk_path(&self, indices: &[usize]) -> ZarrResult<String> {
        if indices.len() != self.metadata.shape.len() {
            return Err(ZarrError::Other(format!(
                "Chunk index {indices:?} does not match {}-d array",
                self.metadata.shape.len()
            )));
        }
        Ok(self
            .store
            .join(&self.path, &self.metadata.chunk_key(indices)))
    }

    /// Bytes of the chunk at `indices` after undoing the compressor, or
    /// `None` when the chunk was never written.
    ///
    /// Filters are not undone; the result is what an uncompressed store
    /// with the same `filters` would hold.
    pub async fn get_raw_chunk(&self, indices: &[usize]) -> ZarrResult<Option<Vec<u8>>> {
        let key = self.chunk_path(indices)?;
        match self.store.get(&key).await? {
            Some(stored) => {
                log::debug!("decoding chunk {key} ({} bytes)", stored.len());
                let decoded = apply_codec_pipeline(&self.codecs, &stored).await?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    /// Typed contents of one chunk in the array's memory order, or `None`
    /// for a missing chunk.
    pub async fn get_chunk(&self, indices: &[usize]) -> ZarrResult<Option<ZarrVectorValue>> {
        let layout = self.value_layout()?;
        let Some(raw) = self.get_raw_chunk(indices).await? else {
            return Ok(None);
        };

        let raw = apply_filter_pipeline(&layout.filters, raw)?;
        let dtype = &layout.element.dtype;
        let chunk = bytes_to_zarr_vector(dtype.byte_order, dtype.data_type, &raw)?;

        let expected = self.metadata.chunk_len();
        if chunk.len() != expected {
            return Err(ZarrError::Decode(format!(
                "Chunk {indices:?} of {} holds {} elements, expected {expected}",
                self.path,
                chunk.len()
            )));
        }
        Ok(Some(chunk))
    }

    /// Load all chunks concurrently and merge them into a flat `Vec<f64>`
    /// in C (row-major) order, whatever the array's own `order`.
    pub async fn load(&self) -> ZarrResult<Vec<f64>> {
        let element = self.element_type()?;
        let fill = element.fill_value.to_f64(element.dtype.data_type);

        let chunks_per_dim: Vec<usize> = self
            .metadata
            .shape
            .iter()
            .zip(&self.metadata.chunks)
            .map(|(s, c)| s.div_ceil(*c))
            .collect();

        let handles: Vec<_> = cartesian_indices(&chunks_per_dim)
            .into_iter()
            .map(|indices| {
                let array = self.clone();
                tokio::spawn(async move {
                    let chunk = array.get_chunk(&indices).await?;
                    Ok::<_, ZarrError>((indices, chunk))
                })
            })
            .collect();

        let mut chunks = Vec::with_capacity(handles.len());
        for handle in handles {
            let (indices, chunk) = handle
                .await
                .map_err(|e| ZarrError::Other(format!("Task join error: {e}")))??;
            if let Some(chunk) = chunk {
                chunks.push((indices, chunk));
            }
        }

        log::debug!(
            "{}: {} of {} chunks present",
            self.path,
            chunks.len(),
            chunks_per_dim.iter().product::<usize>()
        );
        Ok(merge_chunks(&chunks, &self.metadata, fill))
    }

    fn value_layout(&self) -> ZarrResult<&ValueLayout> {
        (*self.values).as_ref().map_err(|e| {
            ZarrError::Unsupported(format!("{} cannot be read as numbers: {e}", self.path))
        })
    }
}

// ---------------------------------------------------------------------------
// Index math
// ---------------------------------------------------------------------------

/// Calculate strides for an N-dimensional array.
pub fn strides(shape: &[usize], order: ArrayOrder) -> Vec<usize> {
    let stride = |state: &mut usize, dim: &usize| {
        let s = *state;
        *state *= *dim;
        Some(s)
    };
    match order {
        // Row-major: last dimension varies fastest.
        ArrayOrder::C => {
            let mut s: Vec<usize> = shape.iter().rev().scan(1usize, stride).collect();
            s.reverse();
            s
        }
        // Column-major: first dimension varies fastest.
        ArrayOrder::F => shape.iter().scan(1usize, stride).collect(),
    }
}

/// Generate all multi-dimensional index tuples within the given shape,
/// in C order.
pub fn cartesian_indices(shape: &[usize]) -> Vec<Vec<usize>> {
    let Some((&first, rest)) = shape.split_first() else {
        return vec![vec![]];
    };
    let rest = cartesian_indices(rest);
    let mut result = Vec::with_capacity(first * rest.len());
    for i in 0..first {
        for r in &rest {
            let mut v = Vec::with_capacity(r.len() + 1);
            v.push(i);
            v.extend_from_slice(r);
            result.push(v);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Merge chunks into a flat array
// ---------------------------------------------------------------------------

/// Place decoded chunks into a C-order buffer of the full array, filling
/// gaps with `fill`. Edge chunks are clipped to the array bounds.
pub fn merge_chunks(
    chunks: &[(Vec<usize>, ZarrVectorValue)],
    metadata: &ZarrV2Metadata,
    fill: f64,
) -> Vec<f64> {
    let total_size = metadata.num_elements();
    let mut result = vec![fill; total_size];
    if total_size == 0 {
        return result;
    }

    let out_strides = strides(&metadata.shape, ArrayOrder::C);
    let chunk_strides = strides(&metadata.chunks, metadata.order);
    let local_positions = cartesian_indices(&metadata.chunks);

    for (chunk_idx, chunk) in chunks {
        let values = chunk.to_f64_vec();

        for local in &local_positions {
            let mut flat = 0;
            let mut in_bounds = true;
            for (d, &lp) in local.iter().enumerate() {
                let g = chunk_idx[d] * metadata.chunks[d] + lp;
                if g >= metadata.shape[d] {
                    in_bounds = false;
                    break;
                }
                flat += g * out_strides[d];
            }
            if !in_bounds {
                continue;
            }

            let src: usize = local.iter().zip(&chunk_strides).map(|(l, s)| l * s).sum();
            result[flat] = values[src];
        }
    }

    result
}

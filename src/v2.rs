//! Opening Zarr V2 arrays and groups from a store.

use crate::array::ZarrArray;
use crate::error::{ZarrError, ZarrResult};
use crate::group::{ZarrGroup, ZarrNode};
use crate::metadata::v2::{ZARRAY, ZATTRS, ZGROUP, ZarrGroupMetadata, ZarrV2Metadata};
use crate::store::StoreRef;

/// Read `.zattrs` at `path`, if present.
pub async fn read_attributes(
    store: &StoreRef,
    path: &str,
) -> ZarrResult<Option<serde_json::Map<String, serde_json::Value>>> {
    let key = store.join(path, ZATTRS);
    let Some(bytes) = store.get(&key).await? else {
        return Ok(None);
    };
    match serde_json::from_slice(&bytes)
        .map_err(|e| ZarrError::Metadata(format!("Invalid {key}: {e}")))?
    {
        serde_json::Value::Object(map) => Ok(Some(map)),
        _ => Err(ZarrError::Metadata(format!("{key} is not a JSON object"))),
    }
}

/// Open a Zarr V2 array at `path`.
pub async fn open_array(store: StoreRef, path: &str) -> ZarrResult<ZarrArray> {
    let zarray_path = store.join(path, ZARRAY);
    let bytes = store
        .get(&zarray_path)
        .await?
        .ok_or_else(|| ZarrError::NotFound(format!("No {ZARRAY} at '{path}'")))?;

    let md = ZarrV2Metadata::parse(&bytes).map_err(|e| match e {
        ZarrError::Metadata(msg) => ZarrError::Metadata(format!("{zarray_path}: {msg}")),
        ZarrError::Unsupported(msg) => ZarrError::Unsupported(format!("{zarray_path}: {msg}")),
        other => other,
    })?;
    let attributes = read_attributes(&store, path).await?;

    log::debug!(
        "opened array '{path}': shape {:?}, chunks {:?}, dtype {}, compressor {}",
        md.shape,
        md.chunks,
        md.dtype,
        md.compressor.as_ref().map_or("none", |c| c.id.as_str())
    );
    ZarrArray::new(store, path, md, attributes)
}

/// Open a Zarr V2 group at `path`.
pub async fn open_group(store: StoreRef, path: &str) -> ZarrResult<ZarrGroup> {
    let zgroup_path = store.join(path, ZGROUP);
    let bytes = store
        .get(&zgroup_path)
        .await?
        .ok_or_else(|| ZarrError::NotFound(format!("No {ZGROUP} at '{path}'")))?;

    let metadata = ZarrGroupMetadata::parse(&bytes)?;
    let attributes = read_attributes(&store, path).await?;
    Ok(ZarrGroup::new(store, path, metadata, attributes))
}

/// Open whatever node lives at `path`, preferring an array when a path
/// carries both documents.
pub async fn open_node(store: StoreRef, path: &str) -> ZarrResult<ZarrNode> {
    if store.get(&store.join(path, ZARRAY)).await?.is_some() {
        return open_array(store, path).await.map(ZarrNode::Array);
    }
    if store.get(&store.join(path, ZGROUP)).await?.is_some() {
        return open_group(store, path).await.map(ZarrNode::Group);
    }
    Err(ZarrError::NotFound(format!(
        "No Zarr array or group at '{path}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStoreBackend;
    use object_store::memory::InMemory;
    use std::sync::Arc;

    async fn store_with(key: &str, doc: &str) -> StoreRef {
        let store: StoreRef = Arc::new(ObjectStoreBackend::new(Box::new(InMemory::new()), ""));
        store
            .set(key, bytes::Bytes::copy_from_slice(doc.as_bytes()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn bad_zarray_names_the_key_once() {
        let store = store_with("a/.zarray", r#"{"shape": [4], "chunks": [0], "dtype": "<i2"}"#).await;
        let err = open_array(store, "a").await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ZarrError::Metadata(_)));
        assert_eq!(msg.matches("Metadata error").count(), 1, "{msg}");
        assert_eq!(msg.matches("a/.zarray").count(), 1, "{msg}");
        assert!(msg.contains("chunk sizes must be > 0"), "{msg}");
    }

    #[tokio::test]
    async fn wrong_format_stays_unsupported() {
        let store = store_with(
            ".zarray",
            r#"{"shape": [1], "chunks": [1], "dtype": "<i2", "zarr_format": 3}"#,
        )
        .await;
        let err = open_array(store, "").await.unwrap_err();
        assert!(matches!(err, ZarrError::Unsupported(ref m) if m.starts_with(".zarray: ")), "{err}");
    }
}

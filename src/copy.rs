//! Copy a V2 hierarchy into another store with all compression removed.
//!
//! Chunks are decoded through the source compressor and written back as
//! plain bytes. Everything else about an array (dtype, order, fill value,
//! filters, key separator, attributes) is carried over unchanged.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::array::{ZarrArray, cartesian_indices};
use crate::error::{ZarrError, ZarrResult};
use crate::group::{ZarrGroup, ZarrNode};
use crate::metadata::v2::{ZARRAY, ZATTRS, ZGROUP};
use crate::store::StoreRef;
use crate::v2::open_node;

/// What a copy wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub groups: usize,
    pub arrays: usize,
    pub chunks: usize,
    pub bytes: u64,
}

/// Replace everything in `dst` with an uncompressed copy of the root node
/// of `src`.
///
/// The source root is opened before the destination is touched, so an
/// unreadable source leaves `dst` as it was.
pub async fn decompress_store(src: StoreRef, dst: StoreRef) -> ZarrResult<CopyStats> {
    let root = open_node(src.clone(), "").await?;

    dst.erase_prefix("").await?;

    let mut stats = CopyStats::default();
    copy_node(&src, &dst, &root, "", &mut stats).await?;

    log::info!(
        "copied {} group(s), {} array(s), {} chunk(s), {} bytes",
        stats.groups,
        stats.arrays,
        stats.chunks,
        stats.bytes
    );
    Ok(stats)
}

async fn copy_node(
    src: &StoreRef,
    dst: &StoreRef,
    node: &ZarrNode,
    dst_path: &str,
    stats: &mut CopyStats,
) -> ZarrResult<()> {
    match node {
        ZarrNode::Array(array) => copy_array(src, dst, array, dst_path, stats).await,
        ZarrNode::Group(group) => copy_group(src, dst, group, dst_path, stats).await,
    }
}

async fn copy_group(
    src: &StoreRef,
    dst: &StoreRef,
    group: &ZarrGroup,
    dst_path: &str,
    stats: &mut CopyStats,
) -> ZarrResult<()> {
    log::debug!("group '{}' -> '{dst_path}'", group.path());

    write(dst, &dst.join(dst_path, ZGROUP), group.metadata.to_json()?, stats).await?;
    copy_attributes(src, dst, group.path(), dst_path, stats).await?;
    stats.groups += 1;

    for (name, member) in group.members().await? {
        let child = dst.join(dst_path, &name);
        Box::pin(copy_node(src, dst, &member, &child, stats)).await?;
    }
    Ok(())
}

async fn copy_array(
    src: &StoreRef,
    dst: &StoreRef,
    array: &ZarrArray,
    dst_path: &str,
    stats: &mut CopyStats,
) -> ZarrResult<()> {
    let md = &array.metadata;
    log::debug!(
        "array '{}' -> '{dst_path}' ({} chunk positions, compressor {})",
        array.path(),
        md.keys().len(),
        md.compressor.as_ref().map_or("none", |c| c.id.as_str())
    );

    write(dst, &dst.join(dst_path, ZARRAY), md.to_uncompressed_json()?, stats).await?;
    copy_attributes(src, dst, array.path(), dst_path, stats).await?;
    stats.arrays += 1;

    let grid: Vec<usize> = md
        .shape
        .iter()
        .zip(&md.chunks)
        .map(|(s, c)| s.div_ceil(*c))
        .collect();

    for indices in cartesian_indices(&grid) {
        let Some(raw) = array.get_raw_chunk(&indices).await? else {
            continue;
        };
        let key = dst.join(dst_path, &md.chunk_key(&indices));
        write(dst, &key, raw, stats).await?;
        stats.chunks += 1;
    }
    Ok(())
}

async fn copy_attributes(
    src: &StoreRef,
    dst: &StoreRef,
    src_path: &str,
    dst_path: &str,
    stats: &mut CopyStats,
) -> ZarrResult<()> {
    if let Some(attrs) = src.get(&src.join(src_path, ZATTRS)).await? {
        write(dst, &dst.join(dst_path, ZATTRS), attrs, stats).await?;
    }
    Ok(())
}

async fn write(
    dst: &StoreRef,
    key: &str,
    data: impl Into<Bytes>,
    stats: &mut CopyStats,
) -> ZarrResult<()> {
    let data = data.into();
    stats.bytes += data.len() as u64;
    dst.set(key, data).await
}

/// Refuse to copy a directory onto itself or into itself; erasing the
/// destination would destroy the source first.
pub fn check_distinct(src: &Path, dst: &Path) -> ZarrResult<()> {
    if let (Some(s), Some(d)) = (resolve(src), resolve(dst)) {
        if d.starts_with(&s) || s.starts_with(&d) {
            return Err(ZarrError::Other(format!(
                "source {} and destination {} overlap",
                src.display(),
                dst.display()
            )));
        }
    }
    Ok(())
}

/// Canonical form of `p`, resolving through the nearest existing ancestor
/// when `p` itself does not exist yet.
fn resolve(p: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(p).ok().or_else(|| {
        let parent = match p.parent()? {
            parent if parent.as_os_str().is_empty() => Path::new("."),
            parent => parent,
        };
        Some(resolve(parent)?.join(p.file_name()?))
    })
}

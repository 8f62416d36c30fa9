mod common;

use common::{ArrayFixture, Compressor, local, write_group};
use serde_json::json;
use unzarr::{ArrayOrder, ZarrNode, decompress_store, open_array, open_node};

async fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_slice(&tokio::fs::read(path).await.unwrap()).unwrap()
}

/// A group holding arrays under every supported compressor plus a nested
/// subgroup.
async fn build_source(root: &std::path::Path) {
    let store = local(root);
    write_group(&store, "", Some(json!({"title": "fixture"}))).await;

    let ramp: Vec<u16> = (0..=510).collect();
    ArrayFixture::new(&[511], &[100], &ramp)
        .compressor(Compressor::Blosc)
        .write(&store, "ramp")
        .await;

    let grid: Vec<f32> = (0..35).map(|v| v as f32 * 0.5).collect();
    ArrayFixture::new(&[5, 7], &[2, 3], &grid)
        .compressor(Compressor::Gzip)
        .separator("/")
        .write(&store, "grid")
        .await;

    write_group(&store, "nested", None).await;
    let cols: Vec<i32> = (-6..6).collect();
    ArrayFixture::new(&[3, 4], &[2, 2], &cols)
        .compressor(Compressor::Zstd)
        .order(ArrayOrder::F)
        .write(&store, "nested/cols")
        .await;

    let small: Vec<u8> = vec![9, 8, 7, 6, 5];
    ArrayFixture::new(&[5], &[2], &small)
        .compressor(Compressor::Lz4)
        .write(&store, "nested/small")
        .await;
    ArrayFixture::new(&[5], &[5], &small)
        .compressor(Compressor::Zlib)
        .write(&store, "nested/whole")
        .await;
}

#[tokio::test]
async fn copy_preserves_values_and_drops_compression() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    build_source(src_dir.path()).await;

    let src = local(src_dir.path());
    let dst = local(dst_dir.path());
    let stats = decompress_store(src.clone(), dst.clone()).await.unwrap();
    assert_eq!(stats.groups, 2);
    assert_eq!(stats.arrays, 5);

    for path in ["ramp", "grid", "nested/cols", "nested/small", "nested/whole"] {
        let before = open_array(src.clone(), path).await.unwrap();
        let after = open_array(dst.clone(), path).await.unwrap();

        assert!(after.metadata.compressor.is_none(), "{path} still compressed");
        assert_eq!(after.shape(), before.shape(), "{path}");
        assert_eq!(after.metadata.chunks, before.metadata.chunks, "{path}");
        assert_eq!(after.metadata.dtype, before.metadata.dtype, "{path}");
        assert_eq!(after.metadata.order, before.metadata.order, "{path}");
        assert_eq!(
            after.metadata.dimension_separator, before.metadata.dimension_separator,
            "{path}"
        );
        assert_eq!(after.load().await.unwrap(), before.load().await.unwrap(), "{path}");
    }

    let root = read_json(&dst_dir.path().join(".zattrs")).await;
    assert_eq!(root, json!({"title": "fixture"}));
    assert!(dst_dir.path().join("nested/.zgroup").is_file());
}

#[tokio::test]
async fn chunks_are_written_as_plain_bytes() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    build_source(src_dir.path()).await;

    decompress_store(local(src_dir.path()), local(dst_dir.path()))
        .await
        .unwrap();

    // 100 u16 elements per chunk, including the padded edge chunk.
    for key in ["0", "5"] {
        let chunk = tokio::fs::read(dst_dir.path().join("ramp").join(key))
            .await
            .unwrap();
        assert_eq!(chunk.len(), 200, "ramp/{key}");
    }
    let first = tokio::fs::read(dst_dir.path().join("ramp/0")).await.unwrap();
    assert_eq!(&first[..6], &[0, 0, 1, 0, 2, 0]);

    // Nested keys stay nested.
    let grid_chunk = tokio::fs::read(dst_dir.path().join("grid/2/2")).await.unwrap();
    assert_eq!(grid_chunk.len(), 2 * 3 * 4);

    let zarray = read_json(&dst_dir.path().join("nested/whole/.zarray")).await;
    assert!(zarray["compressor"].is_null());
    assert_eq!(zarray["dtype"], json!("|u1"));
    assert_eq!(
        tokio::fs::read(dst_dir.path().join("nested/whole/0")).await.unwrap(),
        vec![9, 8, 7, 6, 5]
    );
}

#[tokio::test]
async fn second_run_replaces_previous_output() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    build_source(src_dir.path()).await;
    tokio::fs::write(dst_dir.path().join("stale.bin"), b"old")
        .await
        .unwrap();

    let first = decompress_store(local(src_dir.path()), local(dst_dir.path()))
        .await
        .unwrap();
    assert!(!dst_dir.path().join("stale.bin").exists());

    let second = decompress_store(local(src_dir.path()), local(dst_dir.path()))
        .await
        .unwrap();
    assert_eq!(first, second);

    let grid = open_array(local(dst_dir.path()), "grid").await.unwrap();
    let expected: Vec<f64> = (0..35).map(|v| v as f64 * 0.5).collect();
    assert_eq!(grid.load().await.unwrap(), expected);
}

#[tokio::test]
async fn missing_chunks_stay_missing() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let src = local(src_dir.path());
    write_group(&src, "", None).await;
    let values: Vec<u16> = vec![4, 4, 4, 4, 4, 4];
    ArrayFixture::new(&[6], &[2], &values)
        .compressor(Compressor::Gzip)
        .fill_value(json!(42))
        .skip(&[&[1]])
        .write(&src, "sparse")
        .await;

    let stats = decompress_store(src, local(dst_dir.path())).await.unwrap();
    assert_eq!(stats.chunks, 2);
    assert!(!dst_dir.path().join("sparse/1").exists());

    let copy = open_array(local(dst_dir.path()), "sparse").await.unwrap();
    assert_eq!(
        copy.load().await.unwrap(),
        vec![4.0, 4.0, 42.0, 42.0, 4.0, 4.0]
    );
}

#[tokio::test]
async fn bz2_and_lzma_with_filters_decompress() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let src = local(src_dir.path());
    write_group(&src, "", None).await;
    let ramp: Vec<u16> = (0..300).map(|v| v * 7).collect();
    ArrayFixture::new(&[300], &[128], &ramp)
        .compressor(Compressor::Lzma)
        .filters(json!([{"id": "delta", "dtype": "<u2"}]))
        .write(&src, "steps")
        .await;
    let grid: Vec<i32> = (0..36).map(|v| v - 18).collect();
    ArrayFixture::new(&[6, 6], &[4, 4], &grid)
        .compressor(Compressor::Bz2)
        .write(&src, "grid")
        .await;

    let dst = local(dst_dir.path());
    let stats = decompress_store(src.clone(), dst.clone()).await.unwrap();
    assert_eq!((stats.arrays, stats.chunks), (2, 7));

    let steps = open_array(dst.clone(), "steps").await.unwrap();
    assert!(steps.metadata.compressor.is_none());
    assert_eq!(steps.metadata.active_filters().len(), 1);
    // Chunks keep their delta encoding: 0 then constant steps of 7.
    let first = steps.get_raw_chunk(&[0]).await.unwrap().unwrap();
    assert_eq!(&first[..6], &[0, 0, 7, 0, 7, 0]);
    let expected: Vec<f64> = ramp.iter().map(|v| *v as f64).collect();
    assert_eq!(steps.load().await.unwrap(), expected);

    let grid_copy = open_array(dst, "grid").await.unwrap();
    let expected: Vec<f64> = grid.iter().map(|v| *v as f64).collect();
    assert_eq!(grid_copy.load().await.unwrap(), expected);
}

#[tokio::test]
async fn root_array_is_copied_as_root() {
    common::init();
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let values: Vec<f32> = vec![1.5, -2.0, 3.25];
    ArrayFixture::new(&[3], &[2], &values)
        .compressor(Compressor::Blosc)
        .write(&local(src_dir.path()), "")
        .await;

    let stats = decompress_store(local(src_dir.path()), local(dst_dir.path()))
        .await
        .unwrap();
    assert_eq!((stats.groups, stats.arrays), (0, 1));

    match open_node(local(dst_dir.path()), "").await.unwrap() {
        ZarrNode::Array(a) => assert_eq!(a.load().await.unwrap(), vec![1.5, -2.0, 3.25]),
        ZarrNode::Group(_) => panic!("root should be an array"),
    }
}

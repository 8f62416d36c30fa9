mod common;

use common::{ArrayFixture, Compressor, local, write_group};
use serde_json::json;
use unzarr::{ArrayOrder, SerializeOptions, ZarrError, serialize_array};

#[tokio::test]
async fn halves_and_truncates_in_c_order() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let ramp: Vec<u16> = (0..=510).collect();
    ArrayFixture::new(&[511], &[64], &ramp)
        .compressor(Compressor::Blosc)
        .write(&local(src.path()), "")
        .await;

    let output = out.path().join("ramp.bin");
    let report = serialize_array(local(src.path()), "", &output, &SerializeOptions::default())
        .await
        .unwrap();
    assert_eq!(report.bytes_written, 511);
    assert_eq!(report.dtype, "<u2");

    let bytes = std::fs::read(&output).unwrap();
    let expected: Vec<u8> = ramp.iter().map(|v| (v / 2) as u8).collect();
    assert_eq!(bytes, expected);

    let stats = report.stats.unwrap();
    assert_eq!((stats.min, stats.max), (0.0, 255.0));
}

#[tokio::test]
async fn fortran_array_is_written_row_major() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    // Row-major logical values 0, 2, 4, ...
    let values: Vec<f32> = (0..12).map(|v| v as f32 * 2.0).collect();
    ArrayFixture::new(&[3, 4], &[2, 3], &values)
        .compressor(Compressor::Zlib)
        .order(ArrayOrder::F)
        .write(&local(src.path()), "")
        .await;

    let output = out.path().join("f.bin");
    serialize_array(local(src.path()), "", &output, &SerializeOptions::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), (0..12).collect::<Vec<u8>>());
}

#[tokio::test]
async fn missing_chunks_use_fill_value() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let values: Vec<u8> = vec![10, 20, 30, 40, 50];
    ArrayFixture::new(&[5], &[2], &values)
        .compressor(Compressor::Gzip)
        .fill_value(json!(100))
        .skip(&[&[1]])
        .write(&local(src.path()), "")
        .await;

    let output = out.path().join("sparse.bin");
    let report = serialize_array(local(src.path()), "", &output, &SerializeOptions::default())
        .await
        .unwrap();
    assert_eq!(report.bytes_written, 5);
    assert_eq!(std::fs::read(&output).unwrap(), vec![5, 10, 50, 50, 25]);
}

#[tokio::test]
async fn array_inside_group_and_custom_divisor() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let store = local(src.path());
    write_group(&store, "", None).await;
    write_group(&store, "scans", None).await;
    let values: Vec<i32> = vec![0, 4, 8, 1020, -4];
    ArrayFixture::new(&[5], &[5], &values)
        .compressor(Compressor::Zstd)
        .write(&store, "scans/raw")
        .await;

    let output = out.path().join("raw.bin");
    let options = SerializeOptions {
        divisor: 4.0,
        ..Default::default()
    };
    serialize_array(local(src.path()), "scans/raw", &output, &options)
        .await
        .unwrap();
    // 255 and -1 both land on 0xff after wrapping.
    assert_eq!(std::fs::read(&output).unwrap(), vec![0, 1, 2, 255, 255]);
}

#[tokio::test]
async fn out_of_range_wraps_unless_checked() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let values: Vec<u16> = vec![2, 600];
    ArrayFixture::new(&[2], &[2], &values)
        .write(&local(src.path()), "")
        .await;

    let wrapped = out.path().join("wrapped.bin");
    serialize_array(local(src.path()), "", &wrapped, &SerializeOptions::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&wrapped).unwrap(), vec![1, 44]);

    let checked = out.path().join("checked.bin");
    let options = SerializeOptions {
        check_range: true,
        ..Default::default()
    };
    let err = serialize_array(local(src.path()), "", &checked, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ZarrError::OutOfRange { index: 1, .. }), "{err}");
    assert!(!checked.exists());
}

#[tokio::test]
async fn dtype_mismatch_writes_nothing() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let values: Vec<f32> = vec![1.0, 2.0];
    ArrayFixture::new(&[2], &[1], &values)
        .write(&local(src.path()), "")
        .await;

    let output = out.path().join("x.bin");
    let options = SerializeOptions {
        expected_dtype: Some("<u2".into()),
        ..Default::default()
    };
    let err = serialize_array(local(src.path()), "", &output, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ZarrError::DtypeMismatch { .. }), "{err}");
    assert!(!output.exists());

    let options = SerializeOptions {
        expected_dtype: Some("<f4".into()),
        ..Default::default()
    };
    serialize_array(local(src.path()), "", &output, &options)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), vec![0, 1]);
}

#[tokio::test]
async fn scaled_integer_storage_is_undone_before_halving() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let values: Vec<f64> = vec![0.0, 2.5, 10.0, 25.5, 7.3];
    ArrayFixture::new(&[5], &[2], &values)
        .compressor(Compressor::Bz2)
        .filters(json!([{
            "id": "fixedscaleoffset", "scale": 10, "offset": 0,
            "dtype": "<f8", "astype": "|u1"
        }]))
        .write(&local(src.path()), "")
        .await;

    // The chunk on disk holds tenths as single bytes.
    let stored = unzarr::open_array(local(src.path()), "").await.unwrap();
    assert_eq!(stored.get_raw_chunk(&[1]).await.unwrap().unwrap(), vec![100, 255]);

    let output = out.path().join("scaled.bin");
    let report = serialize_array(local(src.path()), "", &output, &SerializeOptions::default())
        .await
        .unwrap();
    assert_eq!(report.dtype, "<f8");
    assert_eq!(std::fs::read(&output).unwrap(), vec![0, 1, 5, 12, 3]);
}

#[tokio::test]
async fn missing_array_writes_nothing() {
    common::init();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let output = out.path().join("none.bin");
    let err = serialize_array(local(src.path()), "", &output, &SerializeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ZarrError::NotFound(_)), "{err}");
    assert!(!output.exists());
}

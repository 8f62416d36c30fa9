#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Value, json};
use unzarr::array::{cartesian_indices, strides};
use unzarr::codecs::blosc::{BloscCname, BloscCodec, BloscShuffle};
use unzarr::codecs::bz2::Bz2Codec;
use unzarr::codecs::gzip::GzipCodec;
use unzarr::codecs::lz4::Lz4Codec;
use unzarr::codecs::lzma::LzmaCodec;
use unzarr::codecs::zlib::ZlibCodec;
use unzarr::codecs::zstd::ZstdCodec;
use unzarr::codecs::{AnyCodec, AnyFilter, encode_codec_pipeline, encode_filter_pipeline};
use unzarr::{ArrayOrder, LocalBackend, StoreRef};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn local(root: &Path) -> StoreRef {
    Arc::new(LocalBackend::new(root))
}

/// Element types the fixtures can write, little-endian.
pub trait Element: Copy {
    const DTYPE: &'static str;
    fn put(self, out: &mut Vec<u8>);
}

impl Element for u8 {
    const DTYPE: &'static str = "|u1";
    fn put(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Element for u16 {
    const DTYPE: &'static str = "<u2";
    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Element for i32 {
    const DTYPE: &'static str = "<i4";
    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Element for f64 {
    const DTYPE: &'static str = "<f8";
    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Element for f32 {
    const DTYPE: &'static str = "<f4";
    fn put(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Compressor {
    None,
    Blosc,
    Gzip,
    Zlib,
    Zstd,
    Lz4,
    Bz2,
    Lzma,
}

impl Compressor {
    fn json(self) -> Value {
        match self {
            Compressor::None => Value::Null,
            Compressor::Blosc => {
                json!({"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0})
            }
            Compressor::Gzip => json!({"id": "gzip", "level": 5}),
            Compressor::Zlib => json!({"id": "zlib", "level": 1}),
            Compressor::Zstd => json!({"id": "zstd", "level": 3}),
            Compressor::Lz4 => json!({"id": "lz4", "acceleration": 1}),
            Compressor::Bz2 => json!({"id": "bz2", "level": 1}),
            Compressor::Lzma => {
                json!({"id": "lzma", "format": 1, "check": -1, "preset": null, "filters": null})
            }
        }
    }

    fn codecs(self, typesize: usize) -> Vec<AnyCodec> {
        match self {
            Compressor::None => vec![],
            Compressor::Blosc => vec![AnyCodec::Blosc(BloscCodec {
                typesize: Some(typesize),
                cname: BloscCname::Lz4,
                clevel: 5,
                shuffle: Some(BloscShuffle::Shuffle),
                blocksize: 0,
            })],
            Compressor::Gzip => vec![AnyCodec::Gzip(GzipCodec { level: 5 })],
            Compressor::Zlib => vec![AnyCodec::Zlib(ZlibCodec { level: 1 })],
            Compressor::Zstd => vec![AnyCodec::Zstd(ZstdCodec { level: 3 })],
            Compressor::Lz4 => vec![AnyCodec::Lz4(Lz4Codec::default())],
            Compressor::Bz2 => vec![AnyCodec::Bz2(Bz2Codec::default())],
            Compressor::Lzma => vec![AnyCodec::Lzma(LzmaCodec::default())],
        }
    }
}

/// Description of an array to write. `values` are in C order.
pub struct ArrayFixture<'a, T> {
    pub shape: &'a [usize],
    pub chunks: &'a [usize],
    pub values: &'a [T],
    pub compressor: Compressor,
    pub order: ArrayOrder,
    pub separator: &'a str,
    pub fill_value: Value,
    /// numcodecs filter configs, applied before the compressor.
    pub filters: Value,
    /// Chunk positions to leave unwritten.
    pub skip: &'a [&'a [usize]],
}

impl<'a, T: Element> ArrayFixture<'a, T> {
    pub fn new(shape: &'a [usize], chunks: &'a [usize], values: &'a [T]) -> Self {
        Self {
            shape,
            chunks,
            values,
            compressor: Compressor::None,
            order: ArrayOrder::C,
            separator: ".",
            fill_value: json!(0),
            filters: Value::Null,
            skip: &[],
        }
    }

    pub fn compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn order(mut self, order: ArrayOrder) -> Self {
        self.order = order;
        self
    }

    pub fn separator(mut self, separator: &'a str) -> Self {
        self.separator = separator;
        self
    }

    pub fn fill_value(mut self, fill_value: Value) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn filters(mut self, filters: Value) -> Self {
        self.filters = filters;
        self
    }

    pub fn skip(mut self, skip: &'a [&'a [usize]]) -> Self {
        self.skip = skip;
        self
    }

    /// Write `.zarray` and every chunk not in `skip` under `path`.
    pub async fn write(&self, store: &StoreRef, path: &str) {
        assert_eq!(self.values.len(), self.shape.iter().product::<usize>());

        let zarray = json!({
            "zarr_format": 2,
            "shape": self.shape,
            "chunks": self.chunks,
            "dtype": T::DTYPE,
            "fill_value": self.fill_value,
            "order": match self.order { ArrayOrder::C => "C", ArrayOrder::F => "F" },
            "compressor": self.compressor.json(),
            "filters": self.filters,
            "dimension_separator": self.separator,
        });
        put(store, &join(path, ".zarray"), serde_json::to_vec(&zarray).unwrap()).await;

        let grid: Vec<usize> = self
            .shape
            .iter()
            .zip(self.chunks)
            .map(|(s, c)| s.div_ceil(*c))
            .collect();
        let array_strides = strides(self.shape, ArrayOrder::C);
        let chunk_strides = strides(self.chunks, self.order);
        let chunk_len: usize = self.chunks.iter().product();
        let typesize = T::DTYPE[2..].parse().unwrap();
        let codecs = self.compressor.codecs(typesize);
        let filters: Vec<AnyFilter> = self
            .filters
            .as_array()
            .map(|list| {
                list.iter()
                    .map(|f| AnyFilter::from_v2_config(f).unwrap())
                    .collect()
            })
            .unwrap_or_default();

        for chunk_idx in cartesian_indices(&grid) {
            if self.skip.iter().any(|s| *s == chunk_idx.as_slice()) {
                continue;
            }
            // Edge chunks are padded with the first element.
            let mut elems = vec![self.values[0]; chunk_len];
            for local in cartesian_indices(self.chunks) {
                let global: Vec<usize> = local
                    .iter()
                    .zip(&chunk_idx)
                    .zip(self.chunks)
                    .map(|((l, i), c)| i * c + l)
                    .collect();
                if global.iter().zip(self.shape).any(|(g, s)| g >= s) {
                    continue;
                }
                let src: usize = global.iter().zip(&array_strides).map(|(g, s)| g * s).sum();
                let dst: usize = local.iter().zip(&chunk_strides).map(|(l, s)| l * s).sum();
                elems[dst] = self.values[src];
            }

            let mut raw = Vec::with_capacity(chunk_len * typesize);
            for e in elems {
                e.put(&mut raw);
            }
            let filtered = encode_filter_pipeline(&filters, raw).unwrap();
            let stored = encode_codec_pipeline(&codecs, &filtered).await.unwrap();

            let key = chunk_idx
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(self.separator);
            let key = if key.is_empty() { "0".to_string() } else { key };
            put(store, &join(path, &key), stored).await;
        }
    }
}

pub async fn write_group(store: &StoreRef, path: &str, attrs: Option<Value>) {
    put(store, &join(path, ".zgroup"), br#"{"zarr_format": 2}"#.to_vec()).await;
    if let Some(attrs) = attrs {
        put(store, &join(path, ".zattrs"), serde_json::to_vec(&attrs).unwrap()).await;
    }
}

pub async fn put(store: &StoreRef, key: &str, data: Vec<u8>) {
    store.set(key, Bytes::from(data)).await.unwrap();
}

pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

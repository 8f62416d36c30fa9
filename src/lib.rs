pub mod array;
pub mod cli;
pub mod codecs;
pub mod copy;
pub mod error;
pub mod group;
pub mod metadata;
pub mod serialize;
pub mod store;
pub mod types;
pub mod v2;

// Re-export key types at crate root for convenience.
pub use array::ZarrArray;
pub use copy::{CopyStats, decompress_store};
pub use error::{ZarrError, ZarrResult};
pub use group::{ZarrGroup, ZarrNode};
pub use serialize::{SerializeOptions, SerializeReport, serialize_array};
pub use store::{LocalBackend, ObjectStoreBackend, StorageBackend, StoreRef};
pub use types::{ArrayOrder, DataType, Endian, FillValue, ZarrValue, ZarrVectorValue};
pub use v2::{open_array, open_group, open_node};

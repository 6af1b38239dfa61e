//! # glyphfield-store
//!
//! Binary persistence for finished atlases.
//!
//! - **`codec`**: `GFAT` wire format (bincode record, LZ4 texels,
//!   FNV-1a checksum).
//! - **`file`**: save/load/peek on paths.

pub mod codec;
pub mod file;

pub use codec::{
    checksum, decode, decode_texture, encode, peek, AtlasSummary, FORMAT_VERSION, MAGIC,
};
pub use file::{load, peek_file, save};

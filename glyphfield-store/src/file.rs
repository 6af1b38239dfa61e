//! Atlas files on disk.

use std::fs;
use std::path::Path;

use glyphfield_core::{AtlasError, FontAtlas, FontResolver};

use crate::codec::{self, AtlasSummary};

/// Encode `atlas` and write it to `path`, replacing any existing file.
///
/// The bytes go to a sibling temporary file first and are renamed into
/// place, so readers never observe a half-written atlas.
pub fn save(path: impl AsRef<Path>, atlas: &FontAtlas) -> Result<(), AtlasError> {
    let path = path.as_ref();
    let bytes = codec::encode(atlas)?;
    let tmp = path.with_extension("gfat.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    log::info!("Saved atlas to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Read and decode the atlas at `path`.
pub fn load(path: impl AsRef<Path>, resolver: &dyn FontResolver) -> Result<FontAtlas, AtlasError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let atlas = codec::decode(&bytes, resolver)?;
    log::info!(
        "Loaded atlas {} from {}",
        atlas.atlas_descriptor(),
        path.display()
    );
    Ok(atlas)
}

/// [`codec::peek`] on a file.
pub fn peek_file(path: impl AsRef<Path>) -> Result<AtlasSummary, AtlasError> {
    codec::peek(&fs::read(path)?)
}

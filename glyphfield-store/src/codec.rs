//! Atlas wire format.
//!
//! ```text
//! ┌──────┬─────────┬──────────────────────────────────────────────┐
//! │ GFAT │ u16 LE  │ bincode (standard) AtlasRecord               │
//! │ magic│ version │  font_name, point_size, glyphs[], texture{   │
//! │      │         │    width, height, format, original_size,     │
//! │      │         │    checksum (FNV-1a), compressed (LZ4) }     │
//! └──────┴─────────┴──────────────────────────────────────────────┘
//! ```
//!
//! The font itself is not stored. [`decode`] re-resolves it by name and
//! point size, so an atlas only loads where the same font is available.

use serde::{Deserialize, Serialize};

use glyphfield_core::{
    AtlasError, AtlasTexture, FontAtlas, FontResolver, GlyphDescriptor, PixelFormat,
};

/// File magic.
pub const MAGIC: [u8; 4] = *b"GFAT";
/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AtlasRecord {
    font_name: String,
    point_size: f32,
    glyphs: Vec<GlyphDescriptor>,
    texture: TextureRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TextureRecord {
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Length of the texel bytes before compression.
    original_size: u64,
    /// FNV-1a of the uncompressed texel bytes.
    checksum: u32,
    compressed: Vec<u8>,
}

/// What [`peek`] reports about an encoded atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasSummary {
    pub version: u16,
    pub font_name: String,
    pub point_size: f32,
    pub glyph_count: usize,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub original_size: u64,
    pub compressed_size: usize,
    pub checksum: u32,
}

/// FNV-1a over `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5, |hash: u32, &b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

/// Serialize an atlas.
pub fn encode(atlas: &FontAtlas) -> Result<Vec<u8>, AtlasError> {
    let texture = atlas.texture();
    let record = AtlasRecord {
        font_name: atlas.font().name().to_string(),
        point_size: atlas.font().point_size(),
        glyphs: atlas.glyphs().to_vec(),
        texture: TextureRecord {
            width: texture.width,
            height: texture.height,
            format: texture.format,
            original_size: texture.bytes.len() as u64,
            checksum: checksum(&texture.bytes),
            compressed: lz4_flex::compress_prepend_size(&texture.bytes),
        },
    };

    let mut out = Vec::with_capacity(HEADER_LEN + record.texture.compressed.len() + 64);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    let body = bincode::serde::encode_to_vec(&record, bincode::config::standard())
        .map_err(|e| AtlasError::SerializationFormat(e.to_string()))?;
    out.extend_from_slice(&body);

    log::debug!(
        "Encoded atlas {}@{} ({} glyphs, {} → {} bytes)",
        record.font_name,
        record.texture.width,
        record.glyphs.len(),
        record.texture.original_size,
        out.len(),
    );
    Ok(out)
}

/// Deserialize an atlas, resolving its font through `resolver`.
pub fn decode(bytes: &[u8], resolver: &dyn FontResolver) -> Result<FontAtlas, AtlasError> {
    let (_, record) = read_record(bytes)?;
    let texture = inflate(record.texture)?;

    let font = resolver.resolve(&record.font_name, record.point_size)?;
    let font_glyphs = font.source().glyph_count() as usize;
    if font_glyphs != record.glyphs.len() {
        return Err(AtlasError::SerializationFormat(format!(
            "atlas has {} glyphs but font '{}' has {}",
            record.glyphs.len(),
            record.font_name,
            font_glyphs
        )));
    }

    FontAtlas::new(font, record.glyphs, texture)
        .map_err(|e| AtlasError::SerializationFormat(e.to_string()))
}

/// Deserialize only the texture, without touching the font.
pub fn decode_texture(bytes: &[u8]) -> Result<AtlasTexture, AtlasError> {
    let (_, record) = read_record(bytes)?;
    inflate(record.texture)
}

fn inflate(tex: TextureRecord) -> Result<AtlasTexture, AtlasError> {
    let texels = lz4_flex::decompress_size_prepended(&tex.compressed)
        .map_err(|e| AtlasError::SerializationFormat(format!("texture decompression: {e}")))?;
    if texels.len() as u64 != tex.original_size {
        return Err(AtlasError::SerializationFormat(format!(
            "texture is {} bytes, header says {}",
            texels.len(),
            tex.original_size
        )));
    }
    let actual = checksum(&texels);
    if actual != tex.checksum {
        return Err(AtlasError::SerializationFormat(format!(
            "texture checksum mismatch ({actual:#010x} != {:#010x})",
            tex.checksum
        )));
    }
    AtlasTexture::new(tex.width, tex.height, tex.format, texels)
        .map_err(|e| AtlasError::SerializationFormat(e.to_string()))
}

/// Read the header and record without resolving the font or inflating
/// the texture.
pub fn peek(bytes: &[u8]) -> Result<AtlasSummary, AtlasError> {
    let (version, record) = read_record(bytes)?;
    Ok(AtlasSummary {
        version,
        font_name: record.font_name,
        point_size: record.point_size,
        glyph_count: record.glyphs.len(),
        width: record.texture.width,
        height: record.texture.height,
        format: record.texture.format,
        original_size: record.texture.original_size,
        compressed_size: record.texture.compressed.len(),
        checksum: record.texture.checksum,
    })
}

fn read_record(bytes: &[u8]) -> Result<(u16, AtlasRecord), AtlasError> {
    if bytes.len() < HEADER_LEN {
        return Err(AtlasError::SerializationFormat(format!(
            "{} bytes is too short for an atlas header",
            bytes.len()
        )));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[..4] != MAGIC {
        return Err(AtlasError::SerializationFormat("bad magic".into()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(AtlasError::SerializationFormat(format!(
            "unsupported format version {version}"
        )));
    }

    let (record, used): (AtlasRecord, usize) =
        bincode::serde::decode_from_slice(body, bincode::config::standard())
            .map_err(|e| AtlasError::SerializationFormat(e.to_string()))?;
    if used != body.len() {
        return Err(AtlasError::SerializationFormat(format!(
            "{} trailing bytes",
            body.len() - used
        )));
    }
    Ok((version, record))
}

// ===================================================================
// Tests
// ===================================================================

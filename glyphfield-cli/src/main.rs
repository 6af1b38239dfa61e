//! `glyphfield`: build, inspect and export SDF font atlases.
//!
//! ```text
//! glyphfield build --font "DejaVu Sans" --size 512 --out dejavu.gfat
//! glyphfield inspect dejavu.gfat
//! glyphfield export dejavu.gfat --png dejavu.png
//! glyphfield fonts
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage timings.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use image::{GrayImage, Luma};
use log::{error, info, warn};

use glyphfield_atlas::{AtlasBuilder, AtlasConfig};
use glyphfield_core::{AtlasError, AtlasTexture, FieldBackend, FontAtlasDescriptor, PixelFormat};
use glyphfield_render::GpuBackend;
use glyphfield_sdf::CpuBackend;
use glyphfield_text::FontKitResolver;

#[derive(Parser, Debug)]
#[command(name = "glyphfield", version, about = "Signed distance field font atlases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an atlas and write it to a file.
    Build(BuildArgs),
    /// Print what an atlas file holds.
    Inspect {
        file: PathBuf,
    },
    /// Write an atlas texture as a grayscale PNG.
    Export {
        file: PathBuf,
        #[arg(long)]
        png: PathBuf,
    },
    /// List font families the system knows about.
    Fonts,
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Family name or CSS generic (`serif`, `sans-serif`, `monospace`, ...).
    #[arg(long, default_value = FontAtlasDescriptor::DEFAULT_FONT)]
    font: String,
    /// Load the font from this file instead of the system.
    #[arg(long)]
    font_file: Option<PathBuf>,
    /// Width and height of the atlas texture.
    #[arg(long, default_value_t = FontAtlasDescriptor::DEFAULT_SIZE)]
    size: u32,
    #[arg(long, default_value_t = 4)]
    oversample: u32,
    /// Packing margin in canvas pixels (derived from the spread when unset).
    #[arg(long)]
    margin: Option<u32>,
    /// Raster point size (fitted to the glyph count when unset).
    #[arg(long)]
    point_size: Option<f32>,
    /// Normalize and resample on the GPU.
    #[arg(long)]
    gpu: bool,
    #[arg(long)]
    out: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build(args) => build(args),
        Command::Inspect { file } => inspect(&file),
        Command::Export { file, png } => export(&file, &png),
        Command::Fonts => {
            for family in FontKitResolver::system_families() {
                println!("{family}");
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn build(args: BuildArgs) -> Result<(), AtlasError> {
    let mut resolver = FontKitResolver::new();
    if let Some(path) = &args.font_file {
        resolver = resolver.with_file(args.font.clone(), path.clone());
    }

    let backend: Arc<dyn FieldBackend> = if args.gpu {
        match GpuBackend::new() {
            Ok(gpu) => Arc::new(gpu),
            Err(e) => {
                warn!("GPU backend unavailable ({e}); falling back to CPU");
                Arc::new(CpuBackend)
            }
        }
    } else {
        Arc::new(CpuBackend)
    };

    let config = AtlasConfig {
        oversample: args.oversample,
        margin: args.margin,
        point_size: args.point_size,
        ..AtlasConfig::default()
    };
    let builder = AtlasBuilder::new(Arc::new(resolver), backend, config);
    let atlas = builder.build(&FontAtlasDescriptor::new(args.font, args.size))?;
    glyphfield_store::save(&args.out, &atlas)?;
    info!("Wrote {}", args.out.display());
    Ok(())
}

fn inspect(file: &Path) -> Result<(), AtlasError> {
    let summary = glyphfield_store::peek_file(file)?;
    println!("file:        {}", file.display());
    println!("version:     {}", summary.version);
    println!("font:        {}", summary.font_name);
    println!("point size:  {:.2}", summary.point_size);
    println!("glyphs:      {}", summary.glyph_count);
    println!(
        "texture:     {}×{} {:?}",
        summary.width, summary.height, summary.format
    );
    println!(
        "bytes:       {} ({} compressed)",
        summary.original_size, summary.compressed_size
    );
    println!("checksum:    {:#010x}", summary.checksum);
    Ok(())
}

fn export(file: &Path, png: &Path) -> Result<(), AtlasError> {
    let bytes = std::fs::read(file)?;
    let texture = glyphfield_store::decode_texture(&bytes)?;
    let image = to_gray_image(&texture)?;
    image
        .save(png)
        .map_err(|e| AtlasError::Io(std::io::Error::other(e)))?;
    info!("Exported {}×{} texture to {}", texture.width, texture.height, png.display());
    Ok(())
}

/// R8 texels as-is; R32Float texels quantized to bytes.
fn to_gray_image(texture: &AtlasTexture) -> Result<GrayImage, AtlasError> {
    let texels: Vec<u8> = match texture.format {
        PixelFormat::R8 => texture.bytes.clone(),
        PixelFormat::R32Float => texture
            .bytes
            .chunks_exact(4)
            .map(|c| {
                let v = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            })
            .collect(),
    };
    GrayImage::from_raw(texture.width, texture.height, texels).ok_or_else(|| {
        AtlasError::SerializationFormat(format!(
            "texture {}×{} does not match its texel count",
            texture.width, texture.height
        ))
    })
}

// ===================================================================
// Tests
// ===================================================================

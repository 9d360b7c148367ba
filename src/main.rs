use std::{fs, path::{Path, PathBuf}, process::ExitCode};

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde_json::json;

use aphl::{
    data::{bitmap::{Bitmap, TiledImage}, header::RomHeader, palette::PaletteTable, pixels::PixelPlane, types::PixelDepth},
    engine::{compression, rombuffer::RomBuffer},
    error::RomError,
    load::load_character_table,
    utils::{log_write, parse_address, print_vector_u8, profile, LogLevel},
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// GBA ROM image
    rom: PathBuf,
    /// Character table to use instead of the built-in English one
    #[arg(long)]
    charset: Option<PathBuf>,
    #[arg(short,long)]
    debug: bool,
    /// Serve puffin profiling data while running
    #[arg(long)]
    profile: bool,
    #[command(subcommand)]
    command: Command,
}

/// Where to find an image and how to lay it out
#[derive(clap::Args, Debug)]
pub struct ImageArgs {
    /// Address of the pixel data
    #[arg(long, value_parser = parse_address)]
    pixels: usize,
    /// Address of the palette
    #[arg(long, value_parser = parse_address)]
    palette: usize,
    #[arg(long)]
    width: usize,
    /// Derived from the pixel data length when omitted
    #[arg(long)]
    height: Option<usize>,
    /// Bits per pixel: 1, 2, 4 or 8
    #[arg(long, default_value = "4", value_parser = parse_depth)]
    depth: PixelDepth,
    /// Palette entries, for uncompressed palettes
    #[arg(long, default_value_t = 16)]
    colors: usize,
    /// Pixel data length in bytes, for uncompressed pixel data
    #[arg(long, value_parser = parse_address)]
    pixel_bytes: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the cartridge header
    Header {
        #[arg(long)]
        json: bool,
    },
    /// Hex dump a range of bytes
    Dump {
        #[arg(long, value_parser = parse_address)]
        address: usize,
        #[arg(long, value_parser = parse_address, default_value = "0x100")]
        length: usize,
    },
    /// Decode Poketext. Reads up to the terminator unless a length or list count is given
    Text {
        #[arg(long, value_parser = parse_address)]
        address: usize,
        #[arg(long, conflicts_with = "list")]
        length: Option<usize>,
        #[arg(long)]
        list: Option<usize>,
    },
    /// Encode Poketext into the ROM and save the result
    WriteText {
        #[arg(long, value_parser = parse_address)]
        address: usize,
        text: String,
        /// Modified ROM destination
        #[arg(long)]
        output: PathBuf,
    },
    /// Inflate an LZ77 block to a file
    Decompress {
        #[arg(long, value_parser = parse_address)]
        address: usize,
        #[arg(long)]
        output: PathBuf,
    },
    /// List palette colors
    Palette {
        #[arg(long, value_parser = parse_address)]
        address: usize,
        #[arg(long, default_value_t = 16)]
        count: usize,
        #[arg(long)]
        json: bool,
    },
    /// Export a tiled image as PNG
    Render {
        #[command(flatten)]
        image: ImageArgs,
        #[arg(long)]
        output: PathBuf,
    },
    /// Export one 8x8 tile as PNG
    Tile {
        #[command(flatten)]
        image: ImageArgs,
        #[arg(long)]
        id: usize,
        #[arg(long)]
        flip_x: bool,
        #[arg(long)]
        flip_y: bool,
        #[arg(long)]
        output: PathBuf,
    },
}

fn parse_depth(text: &str) -> Result<PixelDepth, String> {
    let bits: u8 = text.trim().parse().map_err(|error| format!("'{text}' is not a number: {error}"))?;
    PixelDepth::try_from(bits)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.debug { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(error) = simple_logging::log_to_file("aphl.log", level) {
        eprintln!("Could not open aphl.log: '{error}'");
    }
    log_panics::init();
    if args.profile {
        profile::enable_profiling();
    }

    log_write(format!("== aphl {} ==", VERSION), LogLevel::Debug);
    let result = run(&args);
    if args.profile {
        profile::finish_frame();
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log_write(error.to_string(), LogLevel::Error);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RomError> {
    let characters = load_character_table(args.charset.as_deref())?;
    let mut rom = RomBuffer::from_file(&args.rom, characters)?;
    match &args.command {
        Command::Header { json } => {
            let header = RomHeader::from_rom(&mut rom)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&header)?);
            } else {
                println!("Title:     {}", header.title);
                println!("Game code: {}", header.game_code);
                println!("Version:   {}", header.version_string());
            }
        }
        Command::Dump { address, length } => {
            let bytes = rom.read_u8s(*address, *length)?;
            print_vector_u8(&bytes, *address);
        }
        Command::Text { address, length, list } => {
            match (length, list) {
                (Some(length), _) => println!("{}", rom.read_text_at(*address, *length)?),
                (None, Some(count)) => {
                    for (i, text) in rom.read_text_list(*address, *count)?.iter().enumerate() {
                        println!("{i:>4}: {text}");
                    }
                }
                (None, None) => println!("{}", rom.read_text_until_terminator_at(*address)?),
            }
        }
        Command::WriteText { address, text, output } => {
            let written = rom.write_text(*address, text)?;
            log_write(format!("Wrote 0x{written:X} bytes of text at 0x{address:X}"), LogLevel::Log);
            rom.save(output)?;
        }
        Command::Decompress { address, output } => {
            let data = compression::decompress(&mut rom, *address)?;
            fs::write(output, &data).map_err(|source| RomError::Io { path: output.clone(), source })?;
            log_write(format!("Decompressed 0x{:X} bytes to '{}'", data.len(), output.display()), LogLevel::Log);
        }
        Command::Palette { address, count, json } => {
            let palette = PaletteTable::from_rom(&mut rom, *address, *count)?;
            if *json {
                let colors: Vec<serde_json::Value> = palette.words().iter().zip(palette.colors()).map(|(word, color)| {
                    json!({ "word": word, "rgb": [color.r(), color.g(), color.b()] })
                }).collect();
                let out = json!({
                    "address": palette.address(),
                    "compressed": palette.is_compressed(),
                    "colors": colors,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{palette}");
                for (i, (word, color)) in palette.words().iter().zip(palette.colors()).enumerate() {
                    println!("{i:>3}: 0x{word:04X} -> ({:>3}, {:>3}, {:>3})", color.r(), color.g(), color.b());
                }
            }
        }
        Command::Render { image, output } => {
            let tiled = load_image(&mut rom, image)?;
            save_png(tiled.surface(), output)?;
        }
        Command::Tile { image, id, flip_x, flip_y, output } => {
            let mut tiled = load_image(&mut rom, image)?;
            let tile = tiled.tile_flipped(*id, *flip_x, *flip_y)?;
            save_png(&tile, output)?;
        }
    }
    Ok(())
}

fn load_image(rom: &mut RomBuffer, args: &ImageArgs) -> Result<TiledImage, RomError> {
    let compressed = compression::is_compressed(rom, args.pixels)?;
    let length = pixel_byte_count(args, compressed, rom.len())?;
    let plane = PixelPlane::from_rom(rom, args.pixels, args.depth, length)?;
    let palette = PaletteTable::from_rom(rom, args.palette, args.colors)?;
    TiledImage::new(&plane, &palette, args.width, args.height)
}

/// Enough bytes for the requested size when the data is not compressed
fn pixel_byte_count(args: &ImageArgs, compressed: bool, rom_len: usize) -> Result<usize, RomError> {
    if let Some(bytes) = args.pixel_bytes {
        return Ok(bytes);
    }
    if args.height.is_none() && !compressed {
        log_write(format!("No --height or --pixel-bytes for uncompressed data at 0x{:X}, assuming a square {}x{} image",
            args.pixels, args.width, args.width), LogLevel::Warn);
    }
    let height = args.height.unwrap_or(args.width);
    args.width.checked_mul(height)
        .map(|pixels| pixels / args.depth.pixels_per_byte())
        .ok_or(RomError::OutOfBounds { address: args.pixels, width: usize::MAX, len: rom_len })
}

fn save_png(bitmap: &Bitmap, output: &Path) -> Result<(), RomError> {
    bitmap.to_rgba_image().save(output)?;
    log_write(format!("Saved {}x{} image to '{}'", bitmap.width(), bitmap.height(), output.display()), LogLevel::Log);
    Ok(())
}

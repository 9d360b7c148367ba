// Tiled indexed-color images
//
// Pixel data is stored tile by tile: all 64 pixels of the first 8x8 tile,
// then the next tile to its right, wrapping to the next tile row

use std::{collections::HashMap, fmt};

use egui::{Color32, ColorImage};

use crate::{error::RomError, utils::{log_write, LogLevel}};

use super::{palette::PaletteTable, pixels::PixelPlane, types::{Rgba, TILE_SIZE}};

/// Anything that can receive decoded RGBA pixels
pub trait PixelSink {
    /// `[width, height]`
    fn size(&self) -> [usize; 2];
    /// Callers stay within `size()`
    fn set_pixel(&mut self, x: usize, y: usize, rgba: Rgba);
}

/// Plain owned RGBA surface, starts fully transparent
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![[0; 4]; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Caller guarantees the region is inside the bitmap
    fn sub_image(&self, x: usize, y: usize, width: usize, height: usize) -> Bitmap {
        let mut sub = Bitmap::new(width, height);
        for row in 0..height {
            let start = (y + row) * self.width + x;
            sub.pixels[row * width..(row + 1) * width].copy_from_slice(&self.pixels[start..start + width]);
        }
        sub
    }

    /// Mirrored horizontally, column order reversed
    pub fn flipped_x(&self) -> Bitmap {
        let mut flipped = self.clone();
        for row in flipped.pixels.chunks_exact_mut(self.width.max(1)) {
            row.reverse();
        }
        flipped
    }

    /// Mirrored vertically, row order reversed
    pub fn flipped_y(&self) -> Bitmap {
        let mut flipped = Bitmap::new(self.width, self.height);
        for row in 0..self.height {
            let src = (self.height - 1 - row) * self.width;
            flipped.pixels[row * self.width..(row + 1) * self.width].copy_from_slice(&self.pixels[src..src + self.width]);
        }
        flipped
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width as u32, self.height as u32);
        self.copy_into(&mut out);
        out
    }

    pub fn copy_into<S: PixelSink + ?Sized>(&self, sink: &mut S) {
        for y in 0..self.height {
            for x in 0..self.width {
                sink.set_pixel(x, y, self.pixels[y * self.width + x]);
            }
        }
    }
}

impl PixelSink for Bitmap {
    fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgba: Rgba) {
        self.pixels[y * self.width + x] = rgba;
    }
}

impl PixelSink for image::RgbaImage {
    fn size(&self) -> [usize; 2] {
        [self.width() as usize, self.height() as usize]
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgba: Rgba) {
        self.put_pixel(x as u32, y as u32, image::Rgba(rgba));
    }
}

impl PixelSink for ColorImage {
    fn size(&self) -> [usize; 2] {
        self.size
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgba: Rgba) {
        let [r, g, b, a] = rgba;
        self.pixels[y * self.size[0] + x] = Color32::from_rgba_unmultiplied(r, g, b, a);
    }
}

/// A decoded image plus its lazily cut 8x8 tiles
#[derive(Debug, Clone)]
pub struct TiledImage {
    surface: Bitmap,
    tiles: HashMap<usize, Bitmap>,
}

impl fmt::Display for TiledImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TiledImage [ {}x{}, tiles={}, cached={} ]", self.width(), self.height(), self.tile_count(), self.tiles.len())
    }
}

impl TiledImage {
    /// Without a `height`, it is derived from how many bytes the plane holds
    pub fn new(plane: &PixelPlane, palette: &PaletteTable, width: usize, height: Option<usize>) -> Result<Self, RomError> {
        let height = resolve_height(plane, width, height)?;
        let mut surface = Bitmap::new(width, height);
        draw_tiles(plane, palette, &mut surface)?;
        let image = Self { surface, tiles: HashMap::new() };
        log_write(format!("Built {image}"), LogLevel::Debug);
        Ok(image)
    }

    pub fn width(&self) -> usize {
        self.surface.width
    }

    pub fn height(&self) -> usize {
        self.surface.height
    }

    pub fn surface(&self) -> &Bitmap {
        &self.surface
    }

    pub fn tiles_per_row(&self) -> usize {
        self.width() / TILE_SIZE
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_per_row() * (self.height() / TILE_SIZE)
    }

    /// Top-left pixel of tile `id`
    pub fn tile_origin(&self, id: usize) -> (usize, usize) {
        let per_row = self.tiles_per_row();
        ((id % per_row) * TILE_SIZE, (id / per_row) * TILE_SIZE)
    }

    /// Cut on first access, cached afterwards
    pub fn tile(&mut self, id: usize) -> Result<&Bitmap, RomError> {
        if id >= self.tile_count() {
            return Err(RomError::OutOfBounds { address: id, width: 1, len: self.tile_count() });
        }
        if !self.tiles.contains_key(&id) {
            let (x, y) = self.tile_origin(id);
            let tile = self.surface.sub_image(x, y, TILE_SIZE, TILE_SIZE);
            self.tiles.insert(id, tile);
        }
        Ok(&self.tiles[&id])
    }

    /// Mirrored copies are built fresh every call
    pub fn tile_flipped(&mut self, id: usize, flip_x: bool, flip_y: bool) -> Result<Bitmap, RomError> {
        let mut tile = self.tile(id)?.clone();
        if flip_x {
            tile = tile.flipped_x();
        }
        if flip_y {
            tile = tile.flipped_y();
        }
        Ok(tile)
    }

    pub fn cached_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn draw_into<S: PixelSink + ?Sized>(&self, sink: &mut S) -> Result<(), RomError> {
        let [sink_width, sink_height] = sink.size();
        if sink_width < self.width() || sink_height < self.height() {
            return Err(RomError::InvalidDimensions { width: sink_width, height: sink_height });
        }
        self.surface.copy_into(sink);
        Ok(())
    }
}

/// Decodes straight into `sink`. The image is fully built before the sink
/// is touched, so a failure leaves it unchanged
pub fn render<S: PixelSink + ?Sized>(plane: &PixelPlane, palette: &PaletteTable, width: usize, height: Option<usize>, sink: &mut S) -> Result<(), RomError> {
    TiledImage::new(plane, palette, width, height)?.draw_into(sink)
}

pub fn resolve_height(plane: &PixelPlane, width: usize, height: Option<usize>) -> Result<usize, RomError> {
    if width == 0 || width % TILE_SIZE != 0 {
        return Err(RomError::InvalidDimensions { width, height: height.unwrap_or(0) });
    }
    let height = height.unwrap_or(plane.bytes().len() / width * plane.depth().pixels_per_byte());
    if height % TILE_SIZE != 0 {
        return Err(RomError::InvalidDimensions { width, height });
    }
    // Checked before the surface is allocated
    let available = plane.pixel_count();
    match width.checked_mul(height) {
        Some(needed) if needed <= available => Ok(height),
        needed => Err(RomError::OutOfBounds { address: 0, width: needed.unwrap_or(usize::MAX), len: available }),
    }
}

fn draw_tiles<S: PixelSink + ?Sized>(plane: &PixelPlane, palette: &PaletteTable, sink: &mut S) -> Result<(), RomError> {
    puffin::profile_function!();
    let [width, height] = sink.size();
    let mut index: usize = 0;
    for y_tile in 0..(height / TILE_SIZE) {
        for x_tile in 0..(width / TILE_SIZE) {
            for y_pixel in 0..TILE_SIZE {
                for x_pixel in 0..TILE_SIZE {
                    let color_index = plane.pixel(index)?;
                    let color = palette.color(color_index as usize)?;
                    let alpha = if color_index == 0 { 0 } else { 255 };
                    sink.set_pixel(x_tile * TILE_SIZE + x_pixel, y_tile * TILE_SIZE + y_pixel,
                        [color.r(), color.g(), color.b(), alpha]);
                    index += 1;
                }
            }
        }
    }
    Ok(())
}

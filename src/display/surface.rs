use serde::{Deserialize, Serialize};

use crate::color::Color;

// ============================================================================
// Pixel Format
// ============================================================================

/// Packed pixel layout: bytes per pixel, channel masks and optional colorkey.
///
/// Packed values are stored little-endian, so `rgba8888` lands in memory as
/// `[A, B, G, R]`, which is what an SDL `RGBA8888` streaming texture expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelFormat {
    pub bytes_per_pixel: u8,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
    /// Packed value treated as "empty" by `blend_pixel` and compositing
    #[serde(default)]
    pub colorkey: Option<u32>,
}

impl PixelFormat {
    /// Whether pixels of this format can be packed (1 to 4 bytes wide)
    pub const fn is_supported(&self) -> bool {
        self.bytes_per_pixel >= 1 && self.bytes_per_pixel <= 4
    }

    /// 32-bit RGBA, 8 bits per channel
    pub const fn rgba8888() -> Self {
        Self {
            bytes_per_pixel: 4,
            r_mask: 0xFF000000,
            g_mask: 0x00FF0000,
            b_mask: 0x0000FF00,
            a_mask: 0x000000FF,
            colorkey: None,
        }
    }

    /// 24-bit RGB, no alpha
    pub const fn rgb888() -> Self {
        Self {
            bytes_per_pixel: 3,
            r_mask: 0xFF0000,
            g_mask: 0x00FF00,
            b_mask: 0x0000FF,
            a_mask: 0,
            colorkey: None,
        }
    }

    /// 16-bit RGB 5-6-5
    pub const fn rgb565() -> Self {
        Self {
            bytes_per_pixel: 2,
            r_mask: 0xF800,
            g_mask: 0x07E0,
            b_mask: 0x001F,
            a_mask: 0,
            colorkey: None,
        }
    }

    /// 8-bit RGB 3-3-2
    pub const fn rgb332() -> Self {
        Self {
            bytes_per_pixel: 1,
            r_mask: 0xE0,
            g_mask: 0x1C,
            b_mask: 0x03,
            a_mask: 0,
            colorkey: None,
        }
    }

    pub const fn with_colorkey(mut self, key: u32) -> Self {
        self.colorkey = Some(key);
        self
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.a_mask != 0
    }

    /// Pack a color into this format
    #[inline]
    pub fn map_rgba(&self, c: Color) -> u32 {
        let mut v = pack_channel(c.r, self.r_mask)
            | pack_channel(c.g, self.g_mask)
            | pack_channel(c.b, self.b_mask);
        if self.has_alpha() {
            v |= pack_channel(c.a, self.a_mask);
        }
        v
    }

    /// Unpack a pixel value; formats without alpha report opaque pixels
    #[inline]
    pub fn get_rgba(&self, pixel: u32) -> Color {
        Color {
            r: unpack_channel(pixel, self.r_mask),
            g: unpack_channel(pixel, self.g_mask),
            b: unpack_channel(pixel, self.b_mask),
            a: if self.has_alpha() {
                unpack_channel(pixel, self.a_mask)
            } else {
                255
            },
        }
    }

    #[inline]
    pub fn is_colorkey(&self, pixel: u32) -> bool {
        self.colorkey == Some(pixel)
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::rgba8888()
    }
}

/// Scale an 8-bit channel down to the mask's width and shift it into place
#[inline]
fn pack_channel(c: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let bits = mask.count_ones().min(8);
    ((u32::from(c) >> (8 - bits)) << shift) & mask
}

/// Extract a channel and expand it back to 8 bits by bit replication
#[inline]
fn unpack_channel(pixel: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let bits = mask.count_ones().min(8);
    let v = (pixel & mask) >> shift;
    if bits == 8 {
        return v as u8;
    }
    // Replicate high bits into the vacated low bits: 5-bit 31 -> 255
    let mut out = v << (8 - bits);
    let mut filled = bits;
    while filled < 8 {
        out |= out >> filled;
        filled *= 2;
    }
    (out & 0xFF) as u8
}

// ============================================================================
// Surface
// ============================================================================

/// A 2D pixel buffer in an arbitrary packed format.
///
/// Invariant: `pixels.len() == height * pitch` and `pitch >= width * bpp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Surface {
    /// Allocate a zero-filled surface with a tightly packed pitch
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let pitch = width as usize * format.bytes_per_pixel as usize;
        Self {
            width,
            height,
            pitch,
            format,
            pixels: vec![0; pitch * height as usize],
        }
    }

    /// Allocate an RGBA8888 surface (the format tiles and pixmaps default to)
    pub fn rgba(width: u32, height: u32) -> Self {
        Self::new(width, height, PixelFormat::rgba8888())
    }

    /// Allocate with rows padded to a multiple of `align` bytes
    pub fn with_alignment(width: u32, height: u32, format: PixelFormat, align: usize) -> Self {
        let align = align.max(1);
        let row = width as usize * format.bytes_per_pixel as usize;
        let pitch = row.div_ceil(align) * align;
        Self {
            width,
            height,
            pitch,
            format,
            pixels: vec![0; pitch * height as usize],
        }
    }

    /// Wrap existing bytes; `None` if the buffer violates the size invariant
    pub fn from_bytes(
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Option<Self> {
        let row = width as usize * format.bytes_per_pixel as usize;
        if pitch < row || pixels.len() != pitch * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pitch,
            format,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    #[inline]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    pub fn set_colorkey(&mut self, key: Option<u32>) {
        self.format.colorkey = key;
    }

    /// Check if coordinates are within bounds
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Byte offset of pixel (x, y)
    #[inline]
    pub(crate) fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.pitch + x as usize * self.format.bytes_per_pixel as usize
    }

    /// Read the packed value at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> u32 {
        debug_assert!(x < self.width && y < self.height);
        let idx = self.pixel_index(x, y);
        read_packed(&self.pixels[idx..], self.format.bytes_per_pixel)
    }

    /// Read and decode the pixel at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn get_color(&self, x: u32, y: u32) -> Color {
        self.format.get_rgba(self.get_pixel(x, y))
    }

    /// Bounds-checked read
    #[inline]
    pub fn try_get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.in_bounds(x, y)
            .then(|| self.get_pixel(x as u32, y as u32))
    }

    /// Pack a color in this surface's format
    #[inline]
    pub fn map(&self, c: Color) -> u32 {
        self.format.map_rgba(c)
    }

    #[inline]
    pub(crate) fn write_packed_at(&mut self, idx: usize, value: u32) {
        write_packed(&mut self.pixels[idx..], self.format.bytes_per_pixel, value);
    }

    /// Fill the whole surface with a packed value
    pub fn fill(&mut self, value: u32) {
        for y in 0..self.height as i32 {
            self.hline(0, self.width as i32 - 1, y, value);
        }
    }

    /// Fill the whole surface with a color
    pub fn clear(&mut self, c: Color) {
        let v = self.map(c);
        self.fill(v);
    }

    /// Fill a rectangle (clipped to the surface). A zero-sized rectangle
    /// paints nothing.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, c: Color) {
        if w == 0 || h == 0 {
            return;
        }
        let v = self.map(c);
        let right = (i64::from(x) + i64::from(w) - 1).min(i64::from(i32::MAX)) as i32;
        let top = i64::from(y).max(0);
        let bottom = (i64::from(y) + i64::from(h) - 1).min(i64::from(self.height) - 1);
        for row in top..=bottom {
            self.hline(x, right, row as i32, v);
        }
    }

    /// Copy another surface onto this one at position (x, y), converting
    /// formats when they differ. Source colorkey pixels are skipped.
    pub fn blit(&mut self, src: &Surface, x: i32, y: i32) {
        let same_format = src.format.bytes_per_pixel == self.format.bytes_per_pixel
            && src.format.r_mask == self.format.r_mask
            && src.format.g_mask == self.format.g_mask
            && src.format.b_mask == self.format.b_mask
            && src.format.a_mask == self.format.a_mask;

        for sy in 0..src.height as i32 {
            let dy = y + sy;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width as i32 {
                let dx = x + sx;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let p = src.get_pixel(sx as u32, sy as u32);
                if src.format.is_colorkey(p) {
                    continue;
                }
                let v = if same_format {
                    p
                } else {
                    self.map(src.format.get_rgba(p))
                };
                let idx = self.pixel_index(dx as u32, dy as u32);
                self.write_packed_at(idx, v);
            }
        }
    }

    /// Raw bytes, e.g. for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to raw pixels
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Convert to a tightly packed RGBA8888 surface
    pub fn to_rgba8888(&self) -> Surface {
        let mut out = Surface::rgba(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.get_color(x, y);
                let idx = out.pixel_index(x, y);
                let v = out.map(c);
                out.write_packed_at(idx, v);
            }
        }
        out
    }
}

#[inline]
fn read_packed(bytes: &[u8], bpp: u8) -> u32 {
    match bpp {
        1 => u32::from(bytes[0]),
        2 => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        3 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]),
        _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

#[inline]
fn write_packed(bytes: &mut [u8], bpp: u8, value: u32) {
    let le = value.to_le_bytes();
    let n = (bpp as usize).clamp(1, 4);
    bytes[..n].copy_from_slice(&le[..n]);
}

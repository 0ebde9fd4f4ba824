//! Frame targets the overlay draws into

/// Pixel position, may lie off screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// RGBA color, straight alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// External frame buffer collaborator
pub trait FrameTarget {
    /// Width and height in pixels
    fn size(&self) -> (u32, u32);

    /// Blend a filled rectangle onto the frame, clipped to its bounds
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw a line of text with its top-left corner at `at`
    fn draw_text(&mut self, text: &str, at: Point, color: Color);
}

/// Text drawn onto a [`Framebuffer`]; glyph rasterisation is left to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub at: Point,
    pub color: Color,
}

/// Software RGBA8 frame target
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    text: Vec<TextRun>,
    writes: u64,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
            text: Vec::new(),
            writes: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixels, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Text runs drawn since the last clear
    pub fn text_runs(&self) -> &[TextRun] {
        &self.text
    }

    /// Number of draw calls received since creation
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Overwrite every pixel and forget recorded text
    pub fn clear(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        self.text.clear();
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}

impl FrameTarget for Framebuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.writes += 1;
        if rect.is_empty() {
            return;
        }

        let x0 = rect.x.max(0) as i64;
        let y0 = rect.y.max(0) as i64;
        let x1 = (rect.x as i64 + rect.w as i64).min(self.width as i64);
        let y1 = (rect.y as i64 + rect.h as i64).min(self.height as i64);

        for y in y0..y1 {
            for x in x0..x1 {
                let i = self.index(x as u32, y as u32);
                let px = &mut self.pixels[i..i + 4];
                px[0] = blend(color.r, px[0], color.a);
                px[1] = blend(color.g, px[1], color.a);
                px[2] = blend(color.b, px[2], color.a);
                px[3] = blend(255, px[3], color.a);
            }
        }
    }

    fn draw_text(&mut self, text: &str, at: Point, color: Color) {
        self.writes += 1;
        self.text.push(TextRun {
            text: text.to_string(),
            at,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_framebuffer_is_blank() {
        let fb = Framebuffer::new(4, 3);
        assert_eq!(fb.size(), (4, 3));
        assert_eq!(fb.pixels().len(), 4 * 3 * 4);
        assert!(fb.pixels().iter().all(|&b| b == 0));
        assert_eq!(fb.write_count(), 0);
    }

    #[test]
    fn test_fill_opaque() {
        let mut fb = Framebuffer::new(4, 4);
        fb.fill_rect(Rect::new(1, 1, 2, 2), Color::WHITE);

        assert_eq!(fb.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(fb.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(fb.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(fb.pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_fill_blends() {
        let mut fb = Framebuffer::new(1, 1);
        fb.clear(Color::WHITE);
        fb.fill_rect(Rect::new(0, 0, 1, 1), Color::BLACK.with_alpha(150));

        // 255 * 105 / 255
        assert_eq!(fb.pixel(0, 0), Some([105, 105, 105, 255]));
    }

    #[test]
    fn test_fill_clips() {
        let mut fb = Framebuffer::new(2, 2);
        fb.fill_rect(Rect::new(-5, -5, 100, 100), Color::WHITE);
        assert!(fb.pixels().iter().all(|&b| b == 255));

        fb.fill_rect(Rect::new(10, 10, 5, 5), Color::BLACK);
        assert!(fb.pixels().iter().all(|&b| b == 255));
        assert_eq!(fb.pixel(2, 0), None);
    }

    #[test]
    fn test_text_is_recorded() {
        let mut fb = Framebuffer::new(8, 8);
        fb.draw_text("hi", Point::new(1, 2), Color::WHITE);

        assert_eq!(fb.text_runs().len(), 1);
        assert_eq!(fb.text_runs()[0].text, "hi");
        assert_eq!(fb.text_runs()[0].at, Point::new(1, 2));
        assert_eq!(fb.write_count(), 1);

        fb.clear(Color::BLACK);
        assert!(fb.text_runs().is_empty());
    }
}

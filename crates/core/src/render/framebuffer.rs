use super::{Color, DrawSurface, Point};

/// CPU pixel buffer used for offline rendering and exports.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    background: Color,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background.0; width as usize * height as usize],
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(Color(self.pixels[y as usize * self.width as usize + x as usize]))
        } else {
            None
        }
    }

    /// Packed 8-bit RGB, row major.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&pixel| Color(pixel).components())
            .collect()
    }

    fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && x < i64::from(self.width) && y >= 0 && y < i64::from(self.height) {
            self.pixels[y as usize * self.width as usize + x as usize] = color.0;
        }
    }

    fn fill_disc(&mut self, cx: i64, cy: i64, radius: i64, color: Color) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Clips `from -> to` to the buffer grown by `margin` on every side
    /// (Liang-Barsky) and returns the visible endpoints. `None` when nothing
    /// of the segment is visible.
    fn clip(&self, from: Point, to: Point, margin: f64) -> Option<((f64, f64), (f64, f64))> {
        let (x0, y0) = (f64::from(from.x), f64::from(from.y));
        let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
        if ![x0, y0, dx, dy].iter().all(|v| v.is_finite()) {
            return None;
        }
        let max_x = f64::from(self.width) - 1.0 + margin;
        let max_y = f64::from(self.height) - 1.0 + margin;

        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        for (p, q) in [
            (-dx, x0 + margin),
            (dx, max_x - x0),
            (-dy, y0 + margin),
            (dy, max_y - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
    }
}

impl DrawSurface for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.pixels.fill(self.background.0);
    }

    /// Bresenham over the visible part of the segment, stamped with a disc
    /// when wider than one pixel.
    fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        let stamp = ((width - 1.0) / 2.0).round().clamp(0.0, self.width.max(self.height) as f32);
        let Some(((fx, fy), (tx, ty))) = self.clip(from, to, f64::from(stamp)) else {
            return;
        };
        let stamp = stamp as i64;
        let (x0, y0) = (fx.round() as i64, fy.round() as i64);
        let (x1, y1) = (tx.round() as i64, ty.round() as i64);

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if stamp == 0 {
                self.set_pixel(x, y, color);
            } else {
                self.fill_disc(x, y, stamp, color);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn circle(&mut self, center: Point, radius: f32, color: Color) {
        let radius = radius.round().clamp(0.0, self.width.max(self.height) as f32);
        let (w, h) = (self.width as f32, self.height as f32);
        let visible = center.x.is_finite()
            && center.y.is_finite()
            && center.x >= -radius - 1.0
            && center.x <= w + radius
            && center.y >= -radius - 1.0
            && center.y <= h + radius;
        if !visible {
            return;
        }
        self.fill_disc(
            center.x.round() as i64,
            center.y.round() as i64,
            radius as i64,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Color = Color(0x000000);
    const WHITE: Color = Color(0xffffff);

    #[test]
    fn draws_line_endpoints() {
        let mut buffer = FrameBuffer::new(10, 10, BLACK);
        buffer.line(Point::new(1.0, 1.0), Point::new(8.0, 5.0), WHITE, 1.0);

        assert_eq!(buffer.pixel(1, 1), Some(WHITE));
        assert_eq!(buffer.pixel(8, 5), Some(WHITE));
        assert_eq!(buffer.pixel(1, 8), Some(BLACK));
    }

    #[test]
    fn clips_shapes_outside_the_buffer() {
        let mut buffer = FrameBuffer::new(4, 4, BLACK);
        buffer.circle(Point::new(-3.0, 2.0), 4.0, WHITE);
        buffer.line(Point::new(-20.0, -20.0), Point::new(30.0, 30.0), WHITE, 3.0);

        assert_eq!(buffer.pixel(0, 2), Some(WHITE));
        assert_eq!(buffer.pixel(2, 2), Some(WHITE));
        assert_eq!(buffer.pixel(4, 4), None);
    }

    #[test]
    fn clear_restores_background_and_exports_rgb() {
        let mut buffer = FrameBuffer::new(2, 1, Color(0x102030));
        buffer.circle(Point::new(0.0, 0.0), 0.0, WHITE);
        assert_eq!(buffer.pixel(0, 0), Some(WHITE));

        buffer.clear();
        assert_eq!(buffer.to_rgb8(), vec![0x10, 0x20, 0x30, 0x10, 0x20, 0x30]);
    }

    #[test]
    fn far_off_surface_segments_are_clipped() {
        let mut buffer = FrameBuffer::new(10, 10, BLACK);
        buffer.line(Point::new(-1.0e9, 5.0), Point::new(1.0e9, 5.0), WHITE, 1.0);
        buffer.line(Point::new(-3.0e38, 0.0), Point::new(3.0e38, 9.0), WHITE, 3.0);
        buffer.line(Point::new(f32::MIN, 2.0), Point::new(f32::NAN, 2.0), WHITE, 1.0);
        buffer.line(Point::new(50.0, -4.0e9), Point::new(60.0, 4.0e9), WHITE, 5.0);
        buffer.circle(Point::new(1.0e9, 1.0e9), 4.0, WHITE);

        assert!((0..10).all(|x| buffer.pixel(x, 5) == Some(WHITE)));
        assert_eq!(buffer.pixel(9, 9), Some(BLACK));
    }
}

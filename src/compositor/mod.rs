//! Output surface compositing
//!
//! Full clear-and-redraw of the output surface on every detector result:
//! the camera frame scaled to the surface, then per-hand connector
//! skeletons and landmark markers, mirrored horizontally when the
//! active camera is user-facing.

use crate::capture::Frame;
use crate::detector::HandResult;
use tiny_skia::{
    FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Landmark index pairs forming the hand skeleton
/// (MediaPipe 21-point hand topology).
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // Thumb
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    // Index finger
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    // Middle finger
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    // Ring finger
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    // Pinky and palm
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// Connector/marker colors per detected handedness, as (r, g, b)
const GREEN: (u8, u8, u8) = (0x00, 0xFF, 0x00);
const RED: (u8, u8, u8) = (0xFF, 0x00, 0x00);

const MARKER_RADIUS: f32 = 5.0;
const CONNECTOR_WIDTH: f32 = 2.0;

/// The output surface.
///
/// The camera frame is always drawn unflipped; the mirror transform
/// applies to the landmark overlay only, matching a front camera feed
/// that behaves like a mirror.
pub struct Compositor {
    pixmap: Pixmap,
    mirrored: bool,
}

impl Compositor {
    /// Create a surface of the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        let pixmap = Pixmap::new(width.max(1), height.max(1))
            .or_else(|| Pixmap::new(1, 1))
            .expect("surface allocation");
        Self {
            pixmap,
            mirrored: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Whether the overlay mirror transform is active
    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Enable or disable the horizontal mirror for the overlay
    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    /// Resize the surface, re-applying the current mirror state.
    /// Contents are cleared until the next render.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width() && height == self.height() {
            return;
        }
        if let Some(pixmap) = Pixmap::new(width.max(1), height.max(1)) {
            self.pixmap = pixmap;
        }
        tracing::debug!(
            "Surface resized to {}x{} (mirrored: {})",
            self.width(),
            self.height(),
            self.mirrored
        );
    }

    /// Transform applied to the landmark overlay
    fn overlay_transform(&self) -> Transform {
        if self.mirrored {
            // Horizontal flip about the surface's vertical center line
            Transform::from_row(-1.0, 0.0, 0.0, 1.0, self.width() as f32, 0.0)
        } else {
            Transform::identity()
        }
    }

    /// Clear the surface and draw the frame plus one overlay per hand
    pub fn render(&mut self, frame: &Frame, hands: &[HandResult]) {
        self.pixmap.fill(tiny_skia::Color::BLACK);
        self.draw_frame(frame);
        for hand in hands {
            self.draw_hand(hand);
        }
    }

    /// Draw the camera frame scaled to the surface dimensions
    fn draw_frame(&mut self, frame: &Frame) {
        let size = match IntSize::from_wh(frame.width, frame.height) {
            Some(size) => size,
            None => return,
        };
        let source = match Pixmap::from_vec(frame.data.clone(), size) {
            Some(source) => source,
            None => {
                tracing::debug!(
                    "Skipping frame with unexpected buffer size: {} bytes for {}x{}",
                    frame.data.len(),
                    frame.width,
                    frame.height
                );
                return;
            }
        };

        let sx = self.width() as f32 / frame.width as f32;
        let sy = self.height() as f32 / frame.height as f32;

        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
    }

    /// Draw the connector skeleton and landmark markers for one hand
    fn draw_hand(&mut self, hand: &HandResult) {
        let (stroke_color, fill_color) = if hand.is_right() {
            (GREEN, RED)
        } else {
            (RED, GREEN)
        };

        let w = self.width() as f32;
        let h = self.height() as f32;
        let transform = self.overlay_transform();

        // Connectors
        let mut pb = PathBuilder::new();
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (Some(from), Some(to)) = (hand.landmarks.get(a), hand.landmarks.get(b)) else {
                continue;
            };
            pb.move_to(from.x * w, from.y * h);
            pb.line_to(to.x * w, to.y * h);
        }
        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color_rgba8(stroke_color.0, stroke_color.1, stroke_color.2, 0xFF);
            paint.anti_alias = true;

            let stroke = Stroke {
                width: CONNECTOR_WIDTH,
                line_cap: tiny_skia::LineCap::Round,
                line_join: tiny_skia::LineJoin::Round,
                ..Default::default()
            };
            self.pixmap
                .stroke_path(&path, &paint, &stroke, transform, None);
        }

        // Markers: filled circle with an outline in the connector color
        for landmark in &hand.landmarks {
            let Some(circle) = PathBuilder::from_circle(landmark.x * w, landmark.y * h, MARKER_RADIUS)
            else {
                continue;
            };

            let mut fill = Paint::default();
            fill.set_color_rgba8(fill_color.0, fill_color.1, fill_color.2, 0xFF);
            fill.anti_alias = true;
            self.pixmap
                .fill_path(&circle, &fill, FillRule::Winding, transform, None);

            let mut outline = Paint::default();
            outline.set_color_rgba8(stroke_color.0, stroke_color.1, stroke_color.2, 0xFF);
            outline.anti_alias = true;
            let stroke = Stroke {
                width: 1.0,
                ..Default::default()
            };
            self.pixmap
                .stroke_path(&circle, &outline, &stroke, transform, None);
        }
    }

    /// Raw premultiplied RGBA bytes of the surface
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{HandResult, Handedness, Landmark};

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> Frame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Frame {
            width,
            height,
            data,
        }
    }

    fn one_hand(handedness: Handedness) -> HandResult {
        // A fist-sized blob in the left half of the frame
        let landmarks = (0..21)
            .map(|i| Landmark {
                x: 0.15 + (i % 5) as f32 * 0.02,
                y: 0.40 + (i / 5) as f32 * 0.03,
                z: 0.0,
            })
            .collect();
        HandResult {
            handedness,
            score: 0.95,
            landmarks,
        }
    }

    fn pixel(c: &Compositor, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * c.width() + x) * 4) as usize;
        c.data()[idx..idx + 4].try_into().unwrap()
    }

    #[test]
    fn test_connection_indices_in_range() {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            assert!(a < 21 && b < 21);
        }
    }

    #[test]
    fn test_resize_keeps_mirror_state() {
        let mut compositor = Compositor::new(640, 480);
        compositor.set_mirrored(true);
        compositor.resize(1280, 720);
        assert_eq!(compositor.width(), 1280);
        assert_eq!(compositor.height(), 720);
        assert!(compositor.is_mirrored());
    }

    #[test]
    fn test_no_hands_draws_only_frame() {
        let mut compositor = Compositor::new(64, 64);
        compositor.set_mirrored(false);
        compositor.render(&solid_frame(64, 64, [10, 20, 30, 255]), &[]);
        assert_eq!(pixel(&compositor, 32, 32), [10, 20, 30, 255]);
        assert_eq!(pixel(&compositor, 5, 5), [10, 20, 30, 255]);
    }

    #[test]
    fn test_right_hand_draws_green_connectors_red_markers() {
        let mut compositor = Compositor::new(200, 200);
        compositor.set_mirrored(false);
        let hand = one_hand(Handedness::Right);
        compositor.render(&solid_frame(200, 200, [0, 0, 0, 255]), &[hand.clone()]);

        // Marker center is filled red
        let landmark = hand.landmarks[0];
        let (cx, cy) = ((landmark.x * 200.0) as u32, (landmark.y * 200.0) as u32);
        assert_eq!(pixel(&compositor, cx, cy), [255, 0, 0, 255]);
    }

    #[test]
    fn test_left_hand_markers_filled_green() {
        let mut compositor = Compositor::new(200, 200);
        let hand = one_hand(Handedness::Left);
        compositor.render(&solid_frame(200, 200, [0, 0, 0, 255]), &[hand.clone()]);

        let landmark = hand.landmarks[0];
        let (cx, cy) = ((landmark.x * 200.0) as u32, (landmark.y * 200.0) as u32);
        assert_eq!(pixel(&compositor, cx, cy), [0, 255, 0, 255]);
    }

    #[test]
    fn test_mirror_flips_overlay_not_frame() {
        let mut mirrored = Compositor::new(200, 200);
        mirrored.set_mirrored(true);
        let hand = one_hand(Handedness::Right);
        mirrored.render(&solid_frame(200, 200, [0, 0, 0, 255]), &[hand.clone()]);

        // Landmarks sit in the left half; mirrored they land on the right
        let landmark = hand.landmarks[0];
        let (cx, cy) = ((landmark.x * 200.0) as u32, (landmark.y * 200.0) as u32);
        let flipped_x = 200 - cx;
        assert_eq!(pixel(&mirrored, flipped_x, cy), [255, 0, 0, 255]);
        assert_eq!(pixel(&mirrored, cx, cy), [0, 0, 0, 255]);
    }
}

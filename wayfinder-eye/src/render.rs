//! Declarative overlay drawing

use crate::processing::detection::BoundingBox;
use crate::scene::EnrichedDetection;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const BOX_COLOR: Rgba = Rgba([0, 255, 0, 255]);
pub const LABEL_BACKGROUND: Rgba = Rgba([0, 0, 0, 160]);
pub const LABEL_TEXT: Rgba = Rgba([255, 255, 255, 255]);

const LINE_WIDTH: f32 = 2.0;
const FONT_PX: f32 = 16.0;
const LABEL_PADDING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

/// One drawing instruction in frame pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// Wipe the previous frame's overlay
    Clear,
    StrokeRect { rect: BoundingBox, color: Rgba, line_width: f32 },
    FillRect { rect: BoundingBox, color: Rgba },
    Text { x: f32, y: f32, text: String, color: Rgba, font_px: f32 },
}

/// Drawing surface collaborator
pub trait Renderer: Send {
    fn render(&mut self, frame_size: (u32, u32), commands: &[DrawCommand]);
}

/// Overlay for one frame: a clear, then box + caption per detection.
pub fn overlay_commands(detections: &[EnrichedDetection]) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(1 + detections.len() * 3);
    commands.push(DrawCommand::Clear);

    for d in detections {
        let rect = d.detection.bbox;
        commands.push(DrawCommand::StrokeRect {
            rect,
            color: BOX_COLOR,
            line_width: LINE_WIDTH,
        });

        let caption = caption(d);
        let caption_w = caption.chars().count() as f32 * FONT_PX * 0.6 + 2.0 * LABEL_PADDING;
        let caption_h = FONT_PX + 2.0 * LABEL_PADDING;
        // Above the box when there is room, inside it otherwise.
        let caption_y = if rect.y >= caption_h { rect.y - caption_h } else { rect.y.max(0.0) };

        commands.push(DrawCommand::FillRect {
            rect: BoundingBox::new(rect.x, caption_y, caption_w, caption_h),
            color: LABEL_BACKGROUND,
        });
        commands.push(DrawCommand::Text {
            x: rect.x + LABEL_PADDING,
            y: caption_y + LABEL_PADDING + FONT_PX,
            text: caption,
            color: LABEL_TEXT,
            font_px: FONT_PX,
        });
    }

    commands
}

fn caption(d: &EnrichedDetection) -> String {
    if d.distance_meters.is_finite() {
        format!("{} {:.1}m", d.label(), d.distance_meters)
    } else {
        d.label().to_string()
    }
}

/// Renderer that only traces the commands it receives
#[derive(Debug, Default)]
pub struct TracingRenderer {
    frames: u64,
}

impl TracingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for TracingRenderer {
    fn render(&mut self, frame_size: (u32, u32), commands: &[DrawCommand]) {
        self.frames += 1;
        trace!(
            "Overlay {} for {}x{}: {} commands",
            self.frames,
            frame_size.0,
            frame_size.1,
            commands.len()
        );
        for command in commands {
            trace!("  {:?}", command);
        }
    }
}

//! Debug overlay: records what the physics reports each frame and owns the
//! runtime debug toggles.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use slidecap_physics::{DebugColor, DebugFlags, DebugSink, Face};

/// A face to draw this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugFace {
    pub face: Face,
    pub normal: Vec3,
    pub color: DebugColor,
    /// Line width in pixels.
    pub width: u32,
}

/// A line of screen text to draw this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugText {
    pub text: String,
    pub color: DebugColor,
    pub x: f32,
    pub y: f32,
}

/// One of the runtime debug switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugToggle {
    CollisionQuery,
    CollidedFace,
    Status,
    IgnoredFaces,
    DisableDepth,
    LockedMotion,
    StepUp,
}

impl DebugToggle {
    /// All toggles, in legend order.
    pub const ALL: [DebugToggle; 7] = [
        DebugToggle::CollisionQuery,
        DebugToggle::CollidedFace,
        DebugToggle::Status,
        DebugToggle::IgnoredFaces,
        DebugToggle::DisableDepth,
        DebugToggle::LockedMotion,
        DebugToggle::StepUp,
    ];

    /// Key that flips this toggle.
    pub fn key(self) -> char {
        match self {
            DebugToggle::CollisionQuery => '3',
            DebugToggle::CollidedFace => '4',
            DebugToggle::Status => '5',
            DebugToggle::IgnoredFaces => '6',
            DebugToggle::DisableDepth => '7',
            DebugToggle::LockedMotion => '8',
            DebugToggle::StepUp => 'p',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DebugToggle::CollisionQuery => "[3] RENDER COLLISION QUERIES",
            DebugToggle::CollidedFace => "[4] RENDER COLLISION FACE",
            DebugToggle::Status => "[5] SHOW SNAPPING/FALLING STATE",
            DebugToggle::IgnoredFaces => "[6] DRAW IGNORED FACES",
            DebugToggle::DisableDepth => "[7] DISABLE DEPTH TEST DEBUG",
            DebugToggle::LockedMotion => "[8] LOCK DIRECTIONAL MOTION",
            DebugToggle::StepUp => "[P] DRAW STEP UP FACE",
        }
    }

    fn flag(self, flags: &mut DebugFlags) -> &mut bool {
        match self {
            DebugToggle::CollisionQuery => &mut flags.draw_collision_query,
            DebugToggle::CollidedFace => &mut flags.draw_collided_face,
            DebugToggle::Status => &mut flags.draw_status,
            DebugToggle::IgnoredFaces => &mut flags.draw_ignored_faces,
            DebugToggle::DisableDepth => &mut flags.disable_depth_debug,
            DebugToggle::LockedMotion => &mut flags.use_locked_motion,
            DebugToggle::StepUp => &mut flags.draw_step_up,
        }
    }

    pub fn is_on(self, flags: &DebugFlags) -> bool {
        let mut copy = *flags;
        *self.flag(&mut copy)
    }

    pub fn flip(self, flags: &mut DebugFlags) {
        let flag = self.flag(flags);
        *flag = !*flag;
    }
}

/// [`DebugSink`] that keeps everything recorded during a frame.
///
/// Call [`DebugOverlay::begin_frame`] before simulating a frame; a renderer
/// then reads [`DebugOverlay::faces`] and [`DebugOverlay::texts`].
#[derive(Debug, Clone, Default)]
pub struct DebugOverlay {
    flags: DebugFlags,
    faces: Vec<DebugFace>,
    texts: Vec<DebugText>,
}

impl DebugOverlay {
    pub fn new(flags: DebugFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    /// Drop last frame's primitives.
    pub fn begin_frame(&mut self) {
        self.faces.clear();
        self.texts.clear();
    }

    pub fn toggle(&mut self, toggle: DebugToggle) {
        toggle.flip(&mut self.flags);
        log::debug!("{} {}", toggle.label(), if toggle.is_on(&self.flags) { "on" } else { "off" });
    }

    /// Whether debug faces should be depth tested.
    pub fn depth_test(&self) -> bool {
        !self.flags.disable_depth_debug
    }

    /// Add the toggle legend, enabled entries in red.
    pub fn record_legend(&mut self) {
        let mut y = 150.0;
        for toggle in DebugToggle::ALL {
            y += 20.0;
            let color = if toggle.is_on(&self.flags) {
                DebugColor::RED
            } else {
                DebugColor::WHITE
            };
            self.record_text(toggle.label(), color, 0.0, y);
        }
    }

    pub fn faces(&self) -> &[DebugFace] {
        &self.faces
    }

    pub fn texts(&self) -> &[DebugText] {
        &self.texts
    }

    /// First recorded text starting with `prefix`.
    pub fn find_text(&self, prefix: &str) -> Option<&DebugText> {
        self.texts.iter().find(|t| t.text.starts_with(prefix))
    }
}

impl DebugSink for DebugOverlay {
    fn flags(&self) -> &DebugFlags {
        &self.flags
    }

    fn record_face(&mut self, face: &Face, normal: Vec3, color: DebugColor, width: u32) {
        self.faces.push(DebugFace {
            face: *face,
            normal,
            color,
            width,
        });
    }

    fn record_text(&mut self, text: &str, color: DebugColor, x: f32, y: f32) {
        self.texts.push(DebugText {
            text: text.to_string(),
            color,
            x,
            y,
        });
    }
}

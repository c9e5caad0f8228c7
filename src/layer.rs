//! Menu and game-over overlays drawn over the board between rounds.

/// Accent colour flips every this many frames.
const BLINK_FRAMES: f32 = 20.0;
/// Input is ignored until the layer has been shown this long.
const READY_MS: f32 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Menu,
    GameOver { score: u32, best: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: LayerKind,
    shown_ms: f32,
    frames: f32,
}

impl Layer {
    fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            shown_ms: 0.0,
            frames: 0.0,
        }
    }

    pub fn menu() -> Self {
        Self::new(LayerKind::Menu)
    }

    /// `best` is the stored best score; the layer shows at least `score`.
    pub fn game_over(score: u32, best: u32) -> Self {
        Self::new(LayerKind::GameOver {
            score,
            best: best.max(score),
        })
    }

    pub fn update(&mut self, dt_frames: f32, dt_ms: f32) {
        self.frames += dt_frames;
        self.shown_ms += dt_ms;
    }

    pub fn is_ready(&self) -> bool {
        self.shown_ms > READY_MS
    }

    /// Pink on even blink periods, blue on odd ones.
    pub fn is_pink(&self) -> bool {
        (self.frames / BLINK_FRAMES) as u32 % 2 == 0
    }
}

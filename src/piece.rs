//! Piece instances and polarity.

use crate::board::BOARD_WIDTH;
use crate::shapes::{PieceKind, Shape};
use rand::Rng;

/// Spawn column for new pieces.
pub const SPAWN_X: i32 = 4;
/// Spawn row for new pieces; above the visible board.
pub const SPAWN_Y: i32 = -5;
/// Highest row a piece may be pushed up to.
pub const MIN_Y: i32 = -4;

/// Pink/blue tag shared by pieces, blocks and particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Pink,
    Blue,
}

impl Polarity {
    pub fn from_pink(pink: bool) -> Self {
        if pink { Self::Pink } else { Self::Blue }
    }

    pub fn is_pink(self) -> bool {
        self == Self::Pink
    }
}

/// Queued pieces wait above the board (drawn faded) until they become active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiecePhase {
    Queued,
    Active,
}

/// A falling piece: kind, rotation (0..4) and board position of its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub x: i32,
    pub y: i32,
    pub phase: PiecePhase,
}

impl Piece {
    pub fn new(kind: PieceKind, rotation: u8) -> Self {
        Self {
            kind,
            rotation: rotation % 4,
            x: SPAWN_X,
            y: SPAWN_Y,
            phase: PiecePhase::Queued,
        }
    }

    /// Random kind and rotation at the spawn point.
    pub fn random(rng: &mut impl Rng) -> Self {
        let kind = PieceKind::ALL[rng.random_range(0..PieceKind::ALL.len())];
        Self::new(kind, rng.random_range(0..4))
    }

    pub fn shape(&self) -> &'static Shape {
        self.kind.shape(self.rotation)
    }

    /// Even rotations are pink, odd rotations blue.
    pub fn polarity(&self) -> Polarity {
        Polarity::from_pink(self.rotation % 2 == 0)
    }

    /// Rotation index after one quarter turn.
    pub fn rotated_index(&self, clockwise: bool) -> u8 {
        if clockwise {
            (self.rotation + 1) % 4
        } else {
            (self.rotation + 3) % 4
        }
    }

    /// Clamp `x` so the shape for `rotation` stays between the walls.
    pub fn clamp_x(kind: PieceKind, rotation: u8, x: i32) -> i32 {
        let info = kind.info();
        x.max(info.left_offset(rotation))
            .min(BOARD_WIDTH - info.width(rotation))
    }

    /// Absolute board cells covered by the piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape().iter().map(move |&(dx, dy)| (self.x + dx, self.y + dy))
    }
}

//! Piece geometry: the seven tetromino kinds and their four rotations.

use std::sync::OnceLock;

/// One rotation of a piece: 4 cells as (dx, dy) offsets from the piece origin.
pub type Shape = [(i32, i32); 4];

/// Tetromino kinds (O, I, S, Z, L, J, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    O,
    I,
    S,
    Z,
    L,
    J,
    T,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::O, Self::I, Self::S, Self::Z, Self::L, Self::J, Self::T];

    fn index(self) -> usize {
        match self {
            Self::O => 0,
            Self::I => 1,
            Self::S => 2,
            Self::Z => 3,
            Self::L => 4,
            Self::J => 5,
            Self::T => 6,
        }
    }

    /// Rotation table for this kind (built once per process).
    pub fn info(self) -> &'static PieceInfo {
        &piece_table()[self.index()]
    }

    /// Shape for rotation `rotation` (taken mod 4).
    pub fn shape(self, rotation: u8) -> &'static Shape {
        &self.info().shapes[usize::from(rotation % 4)]
    }
}

/// The four rotations of a kind plus the horizontal extents used for wall clamping.
#[derive(Debug, Clone)]
pub struct PieceInfo {
    pub shapes: [Shape; 4],
    /// `max(0, max dx) + 1` per rotation.
    pub widths: [i32; 4],
    /// `-min(0, min dx)` per rotation.
    pub left_offsets: [i32; 4],
}

impl PieceInfo {
    fn new(shapes: [Shape; 4]) -> Self {
        let widths = shapes.map(|s| shape_width(&s));
        let left_offsets = shapes.map(|s| shape_left_offset(&s));
        Self {
            shapes,
            widths,
            left_offsets,
        }
    }

    pub fn width(&self, rotation: u8) -> i32 {
        self.widths[usize::from(rotation % 4)]
    }

    pub fn left_offset(&self, rotation: u8) -> i32 {
        self.left_offsets[usize::from(rotation % 4)]
    }
}

/// Columns spanned to the right of the origin, counting the origin column.
pub fn shape_width(shape: &Shape) -> i32 {
    shape.iter().fold(0, |m, &(x, _)| m.max(x)) + 1
}

/// Columns reaching left of the origin.
pub fn shape_left_offset(shape: &Shape) -> i32 {
    -shape.iter().fold(0, |m, &(x, _)| m.min(x))
}

fn translate(shape: &Shape, (dx, dy): (f32, f32)) -> Shape {
    shape.map(|(x, y)| {
        (
            (x as f32 + dx).floor() as i32,
            (y as f32 + dy).floor() as i32,
        )
    })
}

/// Builds 4 rotations of `base`: shift by `center` (floored), rotate 90° three
/// times with (x, y) → (-y, x), then shift every rotation by `offset` (floored).
pub fn generate_rotations(
    base: &Shape,
    center: Option<(f32, f32)>,
    offset: Option<(f32, f32)>,
) -> [Shape; 4] {
    let first = center.map_or(*base, |c| translate(base, c));
    let mut shapes = [first; 4];
    for i in 1..4 {
        shapes[i] = shapes[i - 1].map(|(x, y)| (-y, x));
    }
    if let Some(o) = offset {
        for s in &mut shapes {
            *s = translate(s, o);
        }
    }
    shapes
}

fn piece_table() -> &'static [PieceInfo; 7] {
    static TABLE: OnceLock<[PieceInfo; 7]> = OnceLock::new();
    TABLE.get_or_init(|| {
        const O: Shape = [(0, 0), (1, 0), (0, 1), (1, 1)];
        [
            // O
            PieceInfo::new([O; 4]),
            // I
            PieceInfo::new(
                generate_rotations(
                    &[(0, 0), (0, 1), (0, 2), (0, 3)],
                    Some((0.5, -1.5)),
                    Some((0.5, 2.5)),
                ),
            ),
            // S
            PieceInfo::new(
                generate_rotations(
                    &[(1, 0), (2, 0), (0, 1), (1, 1)],
                    Some((-1.0, -0.5)),
                    Some((0.5, 1.5)),
                ),
            ),
            // Z
            PieceInfo::new(
                generate_rotations(
                    &[(0, 0), (1, 0), (1, 1), (2, 1)],
                    Some((-1.0, -0.5)),
                    Some((0.0, 1.5)),
                ),
            ),
            // L
            PieceInfo::new(
                generate_rotations(
                    &[(0, 0), (0, 1), (0, 2), (1, 2)],
                    Some((-1.0, -0.5)),
                    Some((0.5, 1.5)),
                ),
            ),
            // J
            PieceInfo::new(
                generate_rotations(
                    &[(1, 0), (1, 1), (0, 2), (1, 2)],
                    Some((-1.0, -0.5)),
                    Some((0.5, 1.5)),
                ),
            ),
            // T
            PieceInfo::new(
                generate_rotations(
                    &[(0, 0), (1, 0), (2, 0), (1, 1)],
                    Some((-1.0, -0.5)),
                    Some((0.5, 1.5)),
                ),
            ),
        ]
    })
}

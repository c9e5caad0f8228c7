//! Board: locked blocks, collision test, full-row detection and compaction.

use crate::piece::Polarity;
use crate::shapes::Shape;
use std::collections::BTreeMap;

pub const BOARD_WIDTH: i32 = 10;
pub const BOARD_HEIGHT: i32 = 20;
/// Tile edge in world pixels.
pub const TILE: f32 = 20.0;

/// Completed blocks stay in the trash layer this long before removal.
const COMPLETE_FADE_MS: f32 = 200.0;
/// Visual slide speed toward the logical row after compaction.
const SLIDE_PX_PER_FRAME: f32 = 2.0;

/// A locked cell. `visual_y` is the drawn pixel row, which trails `y` after compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub x: i32,
    pub y: i32,
    pub polarity: Polarity,
    pub visual_y: f32,
    /// Milliseconds since the block's row was completed.
    pub completed_ms: Option<f32>,
}

impl Block {
    fn new(x: i32, y: i32, polarity: Polarity) -> Self {
        Self {
            x,
            y,
            polarity,
            visual_y: y as f32 * TILE,
            completed_ms: None,
        }
    }

    pub fn is_completing(&self) -> bool {
        self.completed_ms.is_some()
    }

    fn fall_to(&mut self, y: i32) {
        self.y = y;
    }

    fn complete(&mut self) {
        self.completed_ms = Some(0.0);
    }

    /// Advance slide and fade; false once the fade is over.
    fn update(&mut self, dt_frames: f32, dt_ms: f32) -> bool {
        let target = self.y as f32 * TILE;
        let step = SLIDE_PX_PER_FRAME * dt_frames;
        if self.visual_y < target {
            self.visual_y = (self.visual_y + step).min(target);
        } else if self.visual_y > target {
            self.visual_y = (self.visual_y - step).max(target);
        }
        match self.completed_ms.as_mut() {
            Some(t) => {
                *t += dt_ms;
                *t <= COMPLETE_FADE_MS
            }
            None => true,
        }
    }
}

/// True if a circle at (px, py) of radius `r` touches the tile whose top-left is (tx, ty).
/// Tiles are treated as circles of radius `TILE / 2`.
pub fn tile_collides_circle(tx: f32, ty: f32, px: f32, py: f32, r: f32) -> bool {
    let half = TILE / 2.0;
    let dx = tx + half - px;
    let dy = ty + half - py;
    let dr = r + half;
    dx * dx + dy * dy < dr * dr
}

/// Result of locking a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockOutcome {
    pub rows_cleared: u32,
    /// Stack no longer fits on the board.
    pub overflow: bool,
}

/// 10x20 grid of locked blocks. y=0 is the top row; rows below `BOARD_HEIGHT` are floor.
#[derive(Debug, Clone, Default)]
pub struct Board {
    blocks: Vec<Block>,
    /// Blocks of cleared rows, kept until their fade completes.
    trash: Vec<Block>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn trash(&self) -> &[Block] {
        &self.trash
    }

    pub fn block_at(&self, x: i32, y: i32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.x == x && b.y == y)
    }

    /// True if any cell of `shape` at (x, y) is below the floor or on a block.
    pub fn collides(&self, x: i32, y: i32, shape: &Shape) -> bool {
        shape.iter().any(|&(dx, dy)| {
            let (cx, cy) = (x + dx, y + dy);
            cy >= BOARD_HEIGHT || self.block_at(cx, cy).is_some()
        })
    }

    /// Number of distinct rows holding at least one block.
    pub fn stack_height(&self) -> usize {
        let mut rows: Vec<i32> = self.blocks.iter().map(|b| b.y).collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len()
    }

    /// Freeze `shape` at (x, y), then clear full rows and compact the rest against the floor.
    pub fn lock_piece(&mut self, x: i32, y: i32, shape: &Shape, polarity: Polarity) -> LockOutcome {
        for &(dx, dy) in shape {
            self.blocks.push(Block::new(x + dx, y + dy, polarity));
        }

        let mut rows: BTreeMap<i32, Vec<Block>> = BTreeMap::new();
        for block in self.blocks.drain(..) {
            rows.entry(block.y).or_default().push(block);
        }
        let (full, kept): (Vec<Vec<Block>>, Vec<Vec<Block>>) = rows
            .into_values()
            .partition(|row| row.len() == BOARD_WIDTH as usize);

        let rows_cleared = full.len() as u32;
        let kept_rows = kept.len() as i32;
        let compact = rows_cleared > 0;
        for (i, row) in kept.into_iter().enumerate() {
            for mut block in row {
                if compact {
                    block.fall_to(BOARD_HEIGHT - kept_rows + i as i32);
                }
                self.blocks.push(block);
            }
        }
        for row in full {
            for mut block in row {
                block.complete();
                self.trash.push(block);
            }
        }
        if rows_cleared > 0 {
            log::debug!("cleared {rows_cleared} row(s), {kept_rows} row(s) left");
        }

        let overflow = kept_rows >= BOARD_HEIGHT || self.blocks.iter().any(|b| b.y < 0);
        LockOutcome {
            rows_cleared,
            overflow,
        }
    }

    /// Advance block slides and completion fades by one tick.
    pub fn update(&mut self, dt_frames: f32, dt_ms: f32) {
        for block in &mut self.blocks {
            block.update(dt_frames, dt_ms);
        }
        self.trash.retain_mut(|b| b.update(dt_frames, dt_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::PieceKind;

    /// Fill row `y` except the columns in `gaps`.
    fn fill_row(board: &mut Board, y: i32, gaps: &[i32]) {
        for x in 0..BOARD_WIDTH {
            if !gaps.contains(&x) {
                board.blocks.push(Block::new(x, y, Polarity::Blue));
            }
        }
    }

    #[test]
    fn test_collides_with_floor() {
        let board = Board::new();
        let o = PieceKind::O.shape(0);
        assert!(!board.collides(4, 18, o));
        assert!(board.collides(4, 19, o));
        assert!(!board.collides(4, -5, o));
    }

    #[test]
    fn test_collides_iff_cell_overlaps_block() {
        let mut board = Board::new();
        board.blocks.push(Block::new(3, 10, Polarity::Pink));
        let o = PieceKind::O.shape(0);
        assert!(board.collides(3, 9, o));
        assert!(board.collides(2, 9, o));
        assert!(!board.collides(4, 9, o));
        assert!(!board.collides(3, 11, o));
    }

    #[test]
    fn test_lock_without_full_row_adds_cells() {
        let mut board = Board::new();
        let outcome = board.lock_piece(4, 18, PieceKind::O.shape(0), Polarity::Pink);
        assert_eq!(outcome, LockOutcome::default());
        assert_eq!(board.blocks().len(), 4);
        assert!(board.block_at(5, 19).is_some());
        assert!(board.trash().is_empty());
    }

    #[test]
    fn test_single_row_clear_compacts_stack() {
        let mut board = Board::new();
        fill_row(&mut board, 19, &[0, 1]);
        fill_row(&mut board, 18, &[0, 1, 2]);
        let before = board.stack_height();
        // O fills (0,18),(1,18),(0,19),(1,19): row 19 is full, row 18 is not.
        let outcome = board.lock_piece(0, 18, PieceKind::O.shape(0), Polarity::Pink);
        assert_eq!(outcome.rows_cleared, 1);
        assert!(!outcome.overflow);
        assert_eq!(board.stack_height(), before - 1);
        assert_eq!(board.trash().len(), 10);
        assert!(board.trash().iter().all(Block::is_completing));
        // The surviving row fell to the floor.
        assert!(board.blocks().iter().all(|b| b.y == 19));
        assert_eq!(board.blocks().len(), 9);
    }

    #[test]
    fn test_multi_row_clear_counts_all_rows() {
        let mut board = Board::new();
        fill_row(&mut board, 19, &[9]);
        fill_row(&mut board, 18, &[9]);
        fill_row(&mut board, 17, &[9]);
        fill_row(&mut board, 16, &[9]);
        fill_row(&mut board, 15, &[0]);
        let outcome = board.lock_piece(9, 16, PieceKind::I.shape(0), Polarity::Blue);
        assert_eq!(outcome.rows_cleared, 4);
        assert_eq!(board.trash().len(), 40);
        assert!(board.blocks().iter().all(|b| b.y == 19));
    }

    #[test]
    fn test_overflow_when_stack_fills_board() {
        let mut board = Board::new();
        for y in 1..BOARD_HEIGHT {
            fill_row(&mut board, y, &[y % BOARD_WIDTH]);
        }
        let outcome = board.lock_piece(0, -1, PieceKind::O.shape(0), Polarity::Pink);
        assert!(outcome.overflow);
    }

    #[test]
    fn test_trash_fades_out() {
        let mut board = Board::new();
        fill_row(&mut board, 19, &[0]);
        let outcome = board.lock_piece(0, 16, PieceKind::I.shape(0), Polarity::Pink);
        assert_eq!(outcome.rows_cleared, 1);
        assert_eq!(board.trash().len(), 10);
        board.update(6.0, 100.0);
        assert_eq!(board.trash().len(), 10);
        board.update(6.0, 150.0);
        assert!(board.trash().is_empty());
    }

    #[test]
    fn test_blocks_slide_to_their_row() {
        let mut board = Board::new();
        fill_row(&mut board, 19, &[0]);
        board.lock_piece(0, 16, PieceKind::I.shape(0), Polarity::Pink);
        // Remaining I cells (rows 16..18) compacted to rows 17..19.
        let top = board.blocks().iter().map(|b| b.y).min();
        assert_eq!(top, Some(17));
        let b = board.blocks().iter().find(|b| b.y == 17).cloned();
        let start = b.map(|b| b.visual_y);
        assert_eq!(start, Some(16.0 * TILE));
        board.update(30.0, 500.0);
        assert!(board.blocks().iter().all(|b| b.visual_y == b.y as f32 * TILE));
    }

    #[test]
    fn test_tile_circle_overlap() {
        assert!(tile_collides_circle(0.0, 0.0, 10.0, 10.0, 4.0));
        assert!(tile_collides_circle(0.0, 0.0, 23.0, 10.0, 4.0));
        assert!(!tile_collides_circle(0.0, 0.0, 24.0, 10.0, 4.0));
    }
}

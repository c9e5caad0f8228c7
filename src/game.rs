//! Game state: board, active/next piece, counters, locking and game over.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board, TILE, tile_collides_circle};
use crate::particles::{PARTICLE_RADIUS, Particle, WORLD_HEIGHT, WORLD_WIDTH};
use crate::piece::{MIN_Y, Piece, PiecePhase, Polarity};
use rand::rngs::StdRng;

/// Board size in world pixels.
pub const BOARD_PX_WIDTH: f32 = BOARD_WIDTH as f32 * TILE;
pub const BOARD_PX_HEIGHT: f32 = BOARD_HEIGHT as f32 * TILE;
/// Top-left corner of the board in world pixels (board centred in the world).
pub const BOARD_ORIGIN_X: f32 = (WORLD_WIDTH - BOARD_PX_WIDTH) / 2.0;
pub const BOARD_ORIGIN_Y: f32 = (WORLD_HEIGHT - BOARD_PX_HEIGHT) / 2.0;

/// One-shot signals produced during a tick, consumed by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Piece rotated.
    Turn,
    /// Piece locked into the board.
    Fall,
    /// One full row cleared.
    Row,
    /// Particle absorbed.
    Melt,
    /// Particle hit a piece of the other colour.
    Explode,
    /// Round ended; emitted once per round.
    GameOver { score: u32 },
}

pub type Events = Vec<GameEvent>;

/// One round: board, falling piece, queued next piece and counters.
#[derive(Debug)]
pub struct Game {
    board: Board,
    piece: Option<Piece>,
    next_piece: Option<Piece>,
    row_count: u32,
    piece_count: u32,
    started: bool,
    over: bool,
    rng: StdRng,
}

impl Game {
    pub fn new(rng: StdRng) -> Self {
        Self {
            board: Board::new(),
            piece: None,
            next_piece: None,
            row_count: 0,
            piece_count: 0,
            started: false,
            over: false,
            rng,
        }
    }

    /// Activate the first piece. No-op if already started.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.activate_next_piece();
        self.started = true;
        log::info!("round started");
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.over
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn piece_count(&self) -> u32 {
        self.piece_count
    }

    /// Flat score: 100 per row, 10 per piece.
    pub fn score(&self) -> u32 {
        self.row_count * 100 + self.piece_count * 10
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn next_piece(&self) -> Option<&Piece> {
        self.next_piece.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn piece_mut(&mut self) -> Option<&mut Piece> {
        self.piece.as_mut()
    }

    #[cfg(test)]
    pub(crate) fn set_next_piece(&mut self, piece: Piece) {
        self.next_piece = Some(piece);
    }

    pub fn player_polarity(&self) -> Option<Polarity> {
        self.piece.as_ref().map(Piece::polarity)
    }

    /// False when there is no active piece.
    pub fn player_is_pink(&self) -> bool {
        self.player_polarity().is_some_and(Polarity::is_pink)
    }

    fn activate_next_piece(&mut self) {
        let mut piece = self
            .next_piece
            .take()
            .unwrap_or_else(|| Piece::random(&mut self.rng));
        piece.phase = PiecePhase::Active;
        self.piece_count += 1;
        self.piece = Some(piece);
    }

    /// Move the piece by (dx, dy). A blocked downward move locks the piece where it was.
    pub fn move_piece(&mut self, dx: i32, dy: i32, events: &mut Events) {
        if self.over {
            return;
        }
        let Some(piece) = self.piece.as_ref() else {
            return;
        };
        let shape = piece.shape();
        let x = Piece::clamp_x(piece.kind, piece.rotation, piece.x + dx);
        let y = piece.y.max(MIN_Y);
        let target_y = (y + dy).max(MIN_Y);
        let collides = self.board.collides(x, target_y, shape);

        if self.next_piece.is_none() && !collides && dy > 0 && y > 0 {
            self.next_piece = Some(Piece::random(&mut self.rng));
        }

        if !collides {
            if let Some(piece) = self.piece.as_mut() {
                piece.x = x;
                piece.y = target_y;
            }
        } else if dy > 0 {
            let (lx, ly) = (piece.x, piece.y);
            self.lock_active(lx, ly, events);
        }
    }

    /// Quarter turn; rejected silently when the rotated shape would collide.
    pub fn rotate(&mut self, clockwise: bool, events: &mut Events) {
        if self.over {
            return;
        }
        let Some(piece) = self.piece.as_ref() else {
            return;
        };
        let rotation = piece.rotated_index(clockwise);
        let x = Piece::clamp_x(piece.kind, rotation, piece.x);
        let y = piece.y.max(MIN_Y);
        if self.board.collides(x, y, piece.kind.shape(rotation)) {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.rotation = rotation;
            piece.x = x;
            piece.y = y;
        }
        events.push(GameEvent::Turn);
    }

    /// Drop straight down and lock immediately.
    pub fn hard_drop(&mut self, events: &mut Events) {
        if self.over {
            return;
        }
        let Some(piece) = self.piece.as_ref() else {
            return;
        };
        let shape = piece.shape();
        let mut y = piece.y;
        while !self.board.collides(piece.x, y, shape) {
            y += 1;
        }
        let x = piece.x;
        self.lock_active(x, y - 1, events);
    }

    fn lock_active(&mut self, x: i32, y: i32, events: &mut Events) {
        let Some(piece) = self.piece.take() else {
            return;
        };
        self.activate_next_piece();
        events.push(GameEvent::Fall);
        let outcome = self
            .board
            .lock_piece(x, y, piece.shape(), piece.polarity());
        self.row_count += outcome.rows_cleared;
        events.extend((0..outcome.rows_cleared).map(|_| GameEvent::Row));
        if outcome.overflow {
            self.game_over(events);
        }
    }

    /// End the round. Only the first call has any effect.
    pub fn game_over(&mut self, events: &mut Events) {
        if self.over {
            return;
        }
        self.over = true;
        self.piece = None;
        self.next_piece = None;
        let score = self.score();
        log::info!(
            "game over: score {score} ({} rows, {} pieces)",
            self.row_count,
            self.piece_count
        );
        events.push(GameEvent::GameOver { score });
    }

    /// Advance block animations.
    pub fn update(&mut self, dt_frames: f32, dt_ms: f32) {
        self.board.update(dt_frames, dt_ms);
    }

    /// Particle is inside the board rectangle.
    pub fn contains_particle(p: &Particle) -> bool {
        let x = p.x - BOARD_ORIGIN_X;
        let y = p.y - BOARD_ORIGIN_Y;
        x >= 0.0 && y >= 0.0 && x <= BOARD_PX_WIDTH && y <= BOARD_PX_HEIGHT
    }

    /// Same colour as the active piece.
    pub fn particle_is_absorbable(&self, p: &Particle) -> bool {
        self.player_polarity() == Some(p.polarity)
    }

    /// Particle touches a cell of the active piece. Particles of the other colour
    /// are ignored while the piece has not entered the board yet.
    pub fn piece_collides_particle(&self, p: &Particle) -> bool {
        let Some(piece) = self.piece.as_ref() else {
            return false;
        };
        if p.polarity != piece.polarity() && piece.y <= 0 {
            return false;
        }
        if !Self::contains_particle(p) {
            return false;
        }
        let px = p.x - BOARD_ORIGIN_X;
        let py = p.y - BOARD_ORIGIN_Y;
        piece.cells().any(|(cx, cy)| {
            tile_collides_circle(cx as f32 * TILE, cy as f32 * TILE, px, py, PARTICLE_RADIUS)
        })
    }
}

//! Layout and drawing: particle field, board, pieces, sidebar, overlays and pause.
//!
//! The world is drawn with half-blocks (▀): one terminal column covers 10 world pixels
//! and each half of a terminal row covers 10 more, so a board tile is 2×2 half-cells.

use crate::board::TILE;
use crate::game::{BOARD_ORIGIN_X, BOARD_ORIGIN_Y, BOARD_PX_HEIGHT, BOARD_PX_WIDTH};
use crate::layer::{Layer, LayerKind};
use crate::orchestrator::Orchestrator;
use crate::particles::{
    PARTICLE_RADIUS, Particle, ParticleState, SPAWN_SLOTS, Spawner, WORLD_HEIGHT, WORLD_WIDTH,
};
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// World pixels per terminal column.
const PX_PER_COL: f32 = 10.0;
/// World pixels per half terminal row.
const PX_PER_HALF_ROW: f32 = 10.0;
const SIDEBAR_WIDTH: u16 = 20;
const SIDEBAR_HEIGHT: u16 = 16;
/// Fade-in of the menu / game-over layers.
const LAYER_FADE_MS: u32 = 400;
/// Completed rows fade from the flash colour over this long.
const COMPLETE_FADE_MS: f32 = 200.0;

/// Everything the renderer reads for one frame.
pub struct DrawContext<'a> {
    pub orchestrator: &'a Orchestrator,
    pub theme: &'a Theme,
    pub best_score: u32,
    pub paused: bool,
}

/// Layer fade-in effect and the clock it is processed with.
#[derive(Default)]
pub struct LayerFx {
    effect: Option<Effect>,
    shown: Option<LayerKind>,
    last_process: Option<Instant>,
}

fn rgb_of(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (255, 0, 0),
        Color::Green => (0, 255, 0),
        Color::Yellow => (255, 255, 0),
        Color::Blue => (0, 0, 255),
        Color::Magenta => (255, 0, 255),
        Color::Cyan => (0, 255, 255),
        Color::Gray => (128, 128, 128),
        Color::DarkGray => (64, 64, 64),
        Color::White => (255, 255, 255),
        _ => (128, 128, 128),
    }
}

/// Linear blend: `t = 0` gives `a`, `t = 1` gives `b`.
fn mix(a: Color, b: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let (ar, ag, ab) = rgb_of(a);
    let (br, bg, bb) = rgb_of(b);
    let lerp = |x: u8, y: u8| (f32::from(x) + (f32::from(y) - f32::from(x)) * t).round() as u8;
    Color::Rgb(lerp(ar, br), lerp(ag, bg), lerp(ab, bb))
}

/// Half-block pixel grid over the part of the world visible in `area`, centred on the board.
struct Canvas {
    cols: u16,
    half_rows: u16,
    /// World position of the top-left half-cell.
    left: f32,
    top: f32,
    px: Vec<Color>,
}

impl Canvas {
    fn new(area: Rect, bg: Color) -> Self {
        let cols = area.width;
        let half_rows = area.height * 2;
        Self {
            cols,
            half_rows,
            left: WORLD_WIDTH / 2.0 - f32::from(cols / 2) * PX_PER_COL,
            top: WORLD_HEIGHT / 2.0 - f32::from(area.height) * PX_PER_HALF_ROW,
            px: vec![bg; usize::from(cols) * usize::from(half_rows)],
        }
    }

    fn cell_of(&self, wx: f32, wy: f32) -> Option<(u16, u16)> {
        let c = ((wx - self.left) / PX_PER_COL).floor();
        let r = ((wy - self.top) / PX_PER_HALF_ROW).floor();
        let in_range = c >= 0.0 && r >= 0.0 && c < f32::from(self.cols) && r < f32::from(self.half_rows);
        in_range.then(|| (c as u16, r as u16))
    }

    fn set(&mut self, c: u16, r: u16, color: Color) {
        if c < self.cols && r < self.half_rows {
            self.px[usize::from(r) * usize::from(self.cols) + usize::from(c)] = color;
        }
    }

    fn get(&self, c: u16, r: u16) -> Option<Color> {
        (c < self.cols && r < self.half_rows)
            .then(|| self.px[usize::from(r) * usize::from(self.cols) + usize::from(c)])
    }

    fn plot(&mut self, wx: f32, wy: f32, color: Color) {
        if let Some((c, r)) = self.cell_of(wx, wy) {
            self.set(c, r, color);
        }
    }

    /// Fill every half-cell overlapping the world rectangle.
    fn fill_rect(&mut self, wx: f32, wy: f32, w: f32, h: f32, color: Color) {
        let c0 = ((wx - self.left) / PX_PER_COL).floor().max(0.0) as i32;
        let c1 = ((wx + w - self.left) / PX_PER_COL).ceil() as i32;
        let r0 = ((wy - self.top) / PX_PER_HALF_ROW).floor().max(0.0) as i32;
        let r1 = ((wy + h - self.top) / PX_PER_HALF_ROW).ceil() as i32;
        let c1 = c1.min(i32::from(self.cols));
        let r1 = r1.min(i32::from(self.half_rows));
        for r in r0..r1 {
            for c in c0..c1 {
                self.set(c as u16, r as u16, color);
            }
        }
    }

    /// Filled disc; anything smaller than a half-cell is a single point.
    fn disc(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        if radius < PX_PER_COL / 2.0 {
            self.plot(cx, cy, color);
            return;
        }
        let mut wy = cy - radius;
        while wy <= cy + radius {
            let mut wx = cx - radius;
            while wx <= cx + radius {
                let (dx, dy) = (wx - cx, wy - cy);
                if dx * dx + dy * dy <= radius * radius {
                    self.plot(wx, wy, color);
                }
                wx += PX_PER_COL;
            }
            wy += PX_PER_HALF_ROW;
        }
    }

    /// Terminal cell covering world point (wx, wy), relative to the canvas area.
    fn terminal_cell(&self, area: Rect, wx: f32, wy: f32) -> (i32, i32) {
        let c = ((wx - self.left) / PX_PER_COL).floor() as i32;
        let r = ((wy - self.top) / PX_PER_HALF_ROW).floor() as i32;
        (i32::from(area.x) + c, i32::from(area.y) + r.div_euclid(2))
    }

    fn blit(&self, buf: &mut Buffer, area: Rect) {
        for row in 0..area.height {
            for c in 0..self.cols {
                let top = self.get(c, row * 2).unwrap_or(Color::Reset);
                let bottom = self.get(c, row * 2 + 1).unwrap_or(Color::Reset);
                buf[(area.x + c, area.y + row)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
}

/// Board rectangle in terminal cells (without border), clipped to `area`.
fn board_rect(canvas: &Canvas, area: Rect) -> Rect {
    let (x0, y0) = canvas.terminal_cell(area, BOARD_ORIGIN_X, BOARD_ORIGIN_Y);
    let (x1, y1) = canvas.terminal_cell(
        area,
        BOARD_ORIGIN_X + BOARD_PX_WIDTH,
        BOARD_ORIGIN_Y + BOARD_PX_HEIGHT,
    );
    let clamp_x = |x: i32| x.clamp(i32::from(area.x), i32::from(area.right())) as u16;
    let clamp_y = |y: i32| y.clamp(i32::from(area.y), i32::from(area.bottom())) as u16;
    let (x0, x1) = (clamp_x(x0), clamp_x(x1));
    let (y0, y1) = (clamp_y(y0), clamp_y(y1));
    Rect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    }
}

fn paint_board(canvas: &mut Canvas, ctx: &DrawContext) {
    let theme = ctx.theme;
    let game = ctx.orchestrator.game();
    let checker = mix(theme.bg, theme.div_line, 0.35);
    for ty in 0..crate::board::BOARD_HEIGHT {
        for tx in 0..crate::board::BOARD_WIDTH {
            let color = if (tx + ty) % 2 == 0 { theme.bg } else { checker };
            canvas.fill_rect(
                BOARD_ORIGIN_X + tx as f32 * TILE,
                BOARD_ORIGIN_Y + ty as f32 * TILE,
                TILE,
                TILE,
                color,
            );
        }
    }
    let board = game.board();
    for block in board.blocks().iter().chain(board.trash()) {
        let color = if block.is_completing() {
            let t = block.completed_ms.unwrap_or(0.0) / COMPLETE_FADE_MS;
            mix(theme.flash, theme.bg, t)
        } else {
            theme.polarity_color(block.polarity)
        };
        canvas.fill_rect(
            BOARD_ORIGIN_X + block.x as f32 * TILE,
            BOARD_ORIGIN_Y + block.visual_y,
            TILE,
            TILE,
            color,
        );
    }
    if let Some(next) = game.next_piece() {
        let color = mix(theme.polarity_color(next.polarity()), theme.bg, 0.7);
        paint_piece(canvas, next, color);
    }
    if let Some(piece) = game.piece() {
        paint_piece(canvas, piece, theme.polarity_color(piece.polarity()));
    }
}

fn paint_piece(canvas: &mut Canvas, piece: &Piece, color: Color) {
    for (cx, cy) in piece.cells() {
        canvas.fill_rect(
            BOARD_ORIGIN_X + cx as f32 * TILE,
            BOARD_ORIGIN_Y + cy as f32 * TILE,
            TILE,
            TILE,
            color,
        );
    }
}

fn particle_color(p: &Particle, theme: &Theme) -> Color {
    let base = theme.polarity_color(p.polarity);
    match p.state {
        ParticleState::Active if p.highlighted => base,
        ParticleState::Active => mix(base, theme.bg, 0.6),
        ParticleState::Melting(t) => mix(base, theme.flash, t),
        ParticleState::Exploding(t) => mix(mix(base, theme.flash, 0.5), theme.bg, t),
    }
}

fn paint_particles(canvas: &mut Canvas, ctx: &DrawContext) {
    for p in ctx.orchestrator.particles().particles() {
        let radius = PARTICLE_RADIUS * p.scale();
        if radius <= 0.0 {
            continue;
        }
        canvas.disc(p.x, p.y, radius, particle_color(p, ctx.theme));
    }
}

/// Draw one frame: world, board frame, sidebar, then the layer or pause overlay.
pub fn draw(frame: &mut Frame, ctx: &DrawContext, layer_fx: &mut LayerFx, now: Instant) {
    let area = frame.area();
    let mut canvas = Canvas::new(area, ctx.theme.bg);
    paint_board(&mut canvas, ctx);
    paint_particles(&mut canvas, ctx);
    canvas.blit(frame.buffer_mut(), area);

    let board = board_rect(&canvas, area);
    draw_board_frame(frame, ctx, board);
    draw_sidebar(frame, ctx, area, board);

    match ctx.orchestrator.layer() {
        Some(layer) => {
            draw_layer(frame, ctx, layer, board);
            apply_layer_effect(frame, ctx, layer, board, layer_fx, now);
        }
        None => {
            layer_fx.effect = None;
            layer_fx.shown = None;
        }
    }
    if ctx.paused {
        draw_pause_overlay(frame, ctx, area);
    }
}

fn draw_board_frame(frame: &mut Frame, ctx: &DrawContext, board: Rect) {
    let outer = Rect {
        x: board.x.saturating_sub(1),
        y: board.y.saturating_sub(1),
        width: board.width + 2,
        height: board.height + 2,
    }
    .intersection(frame.area());
    let game = ctx.orchestrator.game();
    let title = format!(" Tetrikaruga  | Score: {} ", game.score());
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ctx.theme.div_line).bg(ctx.theme.bg))
        .title(Span::styled(title, ctx.theme.title))
        .render(outer, frame.buffer_mut());
}

/// Occupied lanes and the hardest active tier, e.g. `3/6 hard`.
fn lanes_label(spawners: &[Spawner]) -> String {
    let used = format!("{}/{SPAWN_SLOTS}", spawners.len());
    match spawners.iter().map(|s| s.tier).max() {
        Some(tier) => format!("{used} {}", tier.label()),
        None => used,
    }
}

fn draw_sidebar(frame: &mut Frame, ctx: &DrawContext, area: Rect, board: Rect) {
    let x = board.right() + 2;
    if x + SIDEBAR_WIDTH > area.right() {
        return;
    }
    let outer = Rect {
        x,
        y: board.y.saturating_sub(1),
        width: SIDEBAR_WIDTH,
        height: SIDEBAR_HEIGHT.min(area.bottom().saturating_sub(board.y.saturating_sub(1))),
    };
    let theme = ctx.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let game = ctx.orchestrator.game();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    let inner = block.inner(outer);
    block.render(outer, frame.buffer_mut());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // counters
            Constraint::Length(1), // polarity
            Constraint::Length(1), // gap
            Constraint::Length(1), // sound label
            Constraint::Length(1), // volume gauge
            Constraint::Length(1), // melody gauge
        ])
        .split(inner);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let particles = ctx.orchestrator.particles();
    let lines = vec![
        stat("Score:  ", game.score().to_string()),
        stat("Best:   ", ctx.best_score.max(game.score()).to_string()),
        stat("Rows:   ", game.row_count().to_string()),
        stat("Pieces: ", game.piece_count().to_string()),
        stat(
            "Stack:  ",
            format!("{}/{}", game.board().stack_height(), crate::board::BOARD_HEIGHT),
        ),
        stat("Lanes:  ", lanes_label(particles.spawners())),
        stat("Wave:   ", format!("{:.1}s", particles.spawners_rate_ms() / 1000.0)),
        stat("Danger: ", format!("{:.0}%", particles.difficulty().max(0.0) * 100.0)),
    ];
    Paragraph::new(ratatui::text::Text::from(lines)).render(chunks[0], frame.buffer_mut());

    if let Some(polarity) = game.player_polarity() {
        Paragraph::new(Line::from(vec![
            Span::styled("Colour: ", title_style),
            Span::styled(
                format!("{polarity:?}").to_lowercase(),
                Style::default().fg(theme.polarity_color(polarity)).bold(),
            ),
        ]))
        .render(chunks[1], frame.buffer_mut());
    }

    let audio = ctx.orchestrator.audio();
    let sound = if ctx.orchestrator.want_volume() {
        "Sound"
    } else {
        "Sound (muted)"
    };
    Paragraph::new(Line::from(Span::styled(sound, title_style)))
        .render(chunks[3], frame.buffer_mut());
    Gauge::default()
        .ratio(f64::from(audio.volume * audio.music * 2.0).clamp(0.0, 1.0))
        .label("music")
        .gauge_style(Style::default().fg(theme.main_fg))
        .render(chunks[4], frame.buffer_mut());
    let (pink, blue) = audio.melody_gains();
    let melody_color = if pink >= blue { theme.pink } else { theme.blue };
    Gauge::default()
        .ratio(f64::from(pink.max(blue)).clamp(0.0, 1.0))
        .label("melody")
        .gauge_style(Style::default().fg(melody_color))
        .render(chunks[5], frame.buffer_mut());
}

fn layer_lines(ctx: &DrawContext, layer: &Layer) -> Vec<Line<'static>> {
    let theme = ctx.theme;
    let accent = if layer.is_pink() { theme.pink } else { theme.blue };
    let other = if layer.is_pink() { theme.blue } else { theme.pink };
    let footer = if layer.is_ready() {
        Line::from(Span::styled(
            "Press any key to start",
            Style::default().fg(theme.main_fg),
        ))
    } else {
        Line::from("")
    };
    match layer.kind {
        LayerKind::Menu => vec![
            Line::from(""),
            Line::from(Span::styled("TETRIKARUGA", Style::default().fg(accent).bold())),
            Line::from(""),
            Line::from(Span::styled("Tetris vs Ikaruga.", Style::default().fg(other))),
            Line::from(""),
            Line::from(Span::styled(
                "Absorb your colour,",
                Style::default().fg(theme.main_fg),
            )),
            Line::from(Span::styled(
                "dodge the other one.",
                Style::default().fg(theme.main_fg),
            )),
            Line::from(""),
            Line::from(Span::styled("CONTROLS", Style::default().fg(other))),
            Line::from(Span::styled("Arrows/WASD  move", Style::default().fg(other))),
            Line::from(Span::styled("Space / 1    rotate", Style::default().fg(other))),
            Line::from(Span::styled("Enter        drop", Style::default().fg(other))),
            Line::from(Span::styled("P pause   M sound", Style::default().fg(other))),
            Line::from(""),
            footer,
        ],
        LayerKind::GameOver { score, best } => vec![
            Line::from(""),
            Line::from(Span::styled(" Game Over ", Style::default().fg(theme.bg).bg(accent))),
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled(
                format!("Score: {score}"),
                Style::default().fg(theme.main_fg).bold(),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Best: {best}"),
                Style::default().fg(theme.main_fg).bold(),
            )),
            Line::from(""),
            Line::from(""),
            footer,
        ],
    }
}

fn draw_layer(frame: &mut Frame, ctx: &DrawContext, layer: &Layer, board: Rect) {
    let lines = layer_lines(ctx, layer);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(ctx.theme.bg))
        .render(board, frame.buffer_mut());
}

/// Fade the layer in whenever a new one is shown.
fn apply_layer_effect(
    frame: &mut Frame,
    ctx: &DrawContext,
    layer: &Layer,
    board: Rect,
    layer_fx: &mut LayerFx,
    now: Instant,
) {
    if layer_fx.shown != Some(layer.kind) {
        let bg = ctx.theme.bg;
        layer_fx.effect = Some(
            fx::fade_from(bg, bg, (LAYER_FADE_MS, Interpolation::Linear)).with_area(board),
        );
        layer_fx.shown = Some(layer.kind);
        layer_fx.last_process = None;
    }
    let delta = layer_fx
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    layer_fx.last_process = Some(now);
    if let Some(effect) = layer_fx.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_pause_overlay(frame: &mut Frame, ctx: &DrawContext, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(ctx.theme.blue),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Esc: Quit ",
            Style::default().fg(ctx.theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ctx.theme.div_line).bg(ctx.theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    const FULL: Rect = Rect {
        x: 0,
        y: 0,
        width: 120,
        height: 30,
    };

    #[test]
    fn test_canvas_maps_whole_world_at_full_size() {
        let canvas = Canvas::new(FULL, Color::Black);
        assert_eq!((canvas.left, canvas.top), (0.0, 0.0));
        assert_eq!(canvas.cell_of(505.0, 105.0), Some((50, 10)));
        assert_eq!(canvas.cell_of(1199.0, 599.0), Some((119, 59)));
        assert_eq!(canvas.cell_of(1200.0, 10.0), None);
    }

    #[test]
    fn test_small_terminal_stays_centred_on_board() {
        let area = Rect::new(0, 0, 40, 26);
        let canvas = Canvas::new(area, Color::Black);
        let board = board_rect(&canvas, area);
        assert_eq!(board.width, 20);
        assert_eq!(board.height, 20);
        assert_eq!(board.x, 10);
        assert_eq!(board.y, 3);
    }

    #[test]
    fn test_tile_fills_two_by_two_half_cells() {
        let mut canvas = Canvas::new(FULL, Color::Black);
        canvas.fill_rect(BOARD_ORIGIN_X, BOARD_ORIGIN_Y, TILE, TILE, Color::White);
        let lit = canvas.px.iter().filter(|c| **c == Color::White).count();
        assert_eq!(lit, 4);
        assert_eq!(canvas.get(50, 10), Some(Color::White));
        assert_eq!(canvas.get(51, 11), Some(Color::White));
        assert_eq!(canvas.get(52, 10), Some(Color::Black));
    }

    #[test]
    fn test_disc_grows_with_radius() {
        let mut canvas = Canvas::new(FULL, Color::Black);
        canvas.disc(305.0, 305.0, 4.0, Color::White);
        assert_eq!(canvas.px.iter().filter(|c| **c == Color::White).count(), 1);
        canvas.disc(605.0, 305.0, 16.0, Color::Red);
        assert!(canvas.px.iter().filter(|c| **c == Color::Red).count() > 4);
    }

    #[test]
    fn test_lanes_label_shows_hardest_tier() {
        assert_eq!(lanes_label(&[]), "0/6");
        let mut orch = Orchestrator::new(Some(2));
        orch.tick(1.0, crate::orchestrator::InputDeltas::default());
        let spawners = orch.particles().spawners();
        assert_eq!(spawners.len(), 1);
        let expected = format!("1/6 {}", spawners[0].tier.label());
        assert_eq!(lanes_label(spawners), expected);
    }

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(mix(Color::Black, Color::White, 0.0), Color::Rgb(0, 0, 0));
        assert_eq!(mix(Color::Black, Color::White, 1.0), Color::Rgb(255, 255, 255));
        assert_eq!(mix(Color::Rgb(0, 0, 0), Color::Rgb(100, 200, 50), 0.5), Color::Rgb(50, 100, 25));
    }

    #[test]
    fn test_draw_menu_smoke() {
        let orchestrator = Orchestrator::new(Some(1));
        let theme = Theme::default();
        let ctx = DrawContext {
            orchestrator: &orchestrator,
            theme: &theme,
            best_score: 42,
            paused: true,
        };
        let mut layer_fx = LayerFx::default();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal
            .draw(|f| draw(f, &ctx, &mut layer_fx, Instant::now()))
            .unwrap();
        assert_eq!(layer_fx.shown, Some(LayerKind::Menu));
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Paused"));
        assert!(text.contains("Best:"));
    }
}

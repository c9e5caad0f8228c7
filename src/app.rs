//! App: terminal init, main loop, tick and key handling.

use crate::GameConfig;
use crate::highscores::BestScore;
use crate::input::{Action, Controls};
use crate::orchestrator::{FRAME_MS, Orchestrator, TickReport};
use crate::theme::Theme;
use crate::ui::{self, DrawContext, LayerFx};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};

/// Longest simulated step after a stall, in reference frames.
const MAX_TICK_FRAMES: f32 = 4.0;

pub struct App {
    config: GameConfig,
    theme: Theme,
    orchestrator: Orchestrator,
    controls: Controls,
    best: BestScore,
    best_score: u32,
    paused: bool,
    /// Paused because the terminal lost focus; focus coming back resumes.
    focus_paused: bool,
    layer_fx: LayerFx,
    last_tick: Instant,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let best = BestScore::at_default_location();
        let best_score = best.load().unwrap_or_else(|e| {
            log::warn!("cannot read best score from {}: {e}", best.path().display());
            0
        });
        let mut orchestrator = Orchestrator::new(config.seed);
        orchestrator.set_want_volume(!config.mute);
        orchestrator.set_best_score(best_score);
        if config.no_menu {
            orchestrator.start();
        }
        Self {
            config,
            theme,
            orchestrator,
            controls: Controls::default(),
            best,
            best_score,
            paused: false,
            focus_paused: false,
            layer_fx: LayerFx::default(),
            last_tick: Instant::now(),
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        self.controls.clear();
        if paused {
            self.orchestrator.pause();
            log::debug!("paused");
        } else {
            // Do not replay the time spent paused.
            self.last_tick = Instant::now();
            log::debug!("resumed");
        }
    }

    /// Returns false when the player asked to quit.
    fn handle_event(&mut self, ev: Event, now: Instant) -> bool {
        match ev {
            Event::Key(key) => {
                let action = self.controls.handle_key(key, now);
                if key.kind != KeyEventKind::Press {
                    return true;
                }
                match action {
                    Action::Quit => return false,
                    Action::Pause => {
                        self.focus_paused = false;
                        self.set_paused(!self.paused);
                    }
                    Action::ToggleSound => {
                        let want = !self.orchestrator.want_volume();
                        self.orchestrator.set_want_volume(want);
                    }
                    _ => {}
                }
            }
            Event::FocusLost if !self.paused => {
                self.focus_paused = true;
                self.set_paused(true);
            }
            Event::FocusGained if self.focus_paused => {
                self.focus_paused = false;
                self.set_paused(false);
            }
            _ => {}
        }
        true
    }

    fn on_tick(&mut self, report: &TickReport) {
        if let Some(score) = report.game_over_score() {
            match self.best.record(score) {
                Ok(best) => self.best_score = best,
                Err(e) => {
                    log::warn!("cannot save best score to {}: {e}", self.best.path().display());
                    self.best_score = self.best_score.max(score);
                }
            }
            self.orchestrator.set_best_score(self.best_score);
        }
        let cues = report.cues;
        if cues.is_empty() {
            return;
        }
        log::trace!("cues: {cues:?}");
        if self.config.bell && self.orchestrator.want_volume() && (cues.row > 0 || cues.explode > 0) {
            let mut out = std::io::stdout();
            if let Err(e) = out.write_all(b"\x07").and_then(|()| out.flush()) {
                log::debug!("bell failed: {e}");
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableFocusChange, EnableFocusChange, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;

        // Release events let held keys stop exactly; without them holds time out.
        let release_events = supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        self.controls = Controls::new(release_events);
        log::info!("terminal release events: {release_events}");

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        // Restore
        if release_events {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), DisableFocusChange, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            let ctx = DrawContext {
                orchestrator: &self.orchestrator,
                theme: &self.theme,
                best_score: self.best_score,
                paused: self.paused,
            };
            let layer_fx = &mut self.layer_fx;
            terminal.draw(|f| ui::draw(f, &ctx, layer_fx, now))?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if !self.handle_event(event::read()?, Instant::now()) {
                        return Ok(());
                    }
                }
            }

            if self.paused {
                continue;
            }
            let now = Instant::now();
            let elapsed_ms = now.duration_since(self.last_tick).as_secs_f32() * 1000.0;
            self.last_tick = now;
            let dt = (elapsed_ms / FRAME_MS).min(MAX_TICK_FRAMES);
            let input = self.controls.deltas(now);
            let report = self.orchestrator.tick(dt, input);
            self.on_tick(&report);
        }
    }
}

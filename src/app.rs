//! App: terminal init, main loop, fall timer, key handling, chain pacing.

use crate::GameConfig;
use crate::color_source::RandomColors;
use crate::game::{ChainReport, ChainStep, GameState};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, Scene};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::{debug, info};
use ratatui::DefaultTerminal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before a held move starts repeating.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Render cadence.
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    last_fall: Instant,
    /// Held key and when it was pressed; only tracked when the terminal reports releases.
    held: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    track_releases: bool,
    /// Chain passes still to show, front = on screen now.
    chain_queue: VecDeque<ChainStep>,
    step_started: Option<Instant>,
    clear_effect: Option<Effect>,
    clear_effect_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let colors = RandomColors::new(config.seed);
        info!(
            "new game {}x{}, colour seed {}",
            config.width,
            config.height,
            colors.seed()
        );
        let state = GameState::new(config.width, config.height, Box::new(colors));
        Self::with_state(config, theme, state)
    }

    fn with_state(config: GameConfig, theme: Theme, state: GameState) -> Self {
        Self {
            config,
            theme,
            state,
            screen: Screen::Playing,
            paused: false,
            last_fall: Instant::now(),
            held: None,
            last_repeat_fire: None,
            track_releases: false,
            chain_queue: VecDeque::new(),
            step_started: None,
            clear_effect: None,
            clear_effect_time: None,
        }
    }

    fn reset_game(&mut self) {
        self.state.restart();
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_fall = Instant::now();
        self.held = None;
        self.last_repeat_fire = None;
        self.chain_queue.clear();
        self.step_started = None;
        self.clear_effect = None;
        self.clear_effect_time = None;
    }

    fn is_animating(&self) -> bool {
        !self.chain_queue.is_empty()
    }

    fn accepts_moves(&self) -> bool {
        !self.paused && !self.is_animating() && self.state.accepts_input()
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        if !self.accepts_moves() {
            return;
        }
        match action {
            Action::MoveLeft => {
                self.state.try_move(-1, 0);
            }
            Action::MoveRight => {
                self.state.try_move(1, 0);
            }
            Action::RotateCw => {
                self.state.try_rotate(true);
            }
            Action::RotateCcw => {
                self.state.try_rotate(false);
            }
            Action::SoftDrop => {
                self.state.soft_drop();
            }
            Action::HardDrop => {
                if let Some(report) = self.state.hard_drop() {
                    self.on_landed(report, now);
                }
            }
            Action::Restart | Action::Pause | Action::Quit | Action::None => {}
        }
    }

    /// Queue the chain passes for display and drop any held key.
    fn on_landed(&mut self, report: ChainReport, now: Instant) {
        if !report.is_empty() {
            debug!(
                "{} chain for {} points, now {:?}",
                report.chain(),
                report.score,
                self.state.phase()
            );
        }
        self.held = None;
        self.last_repeat_fire = None;
        self.last_fall = now;
        if self.config.animate && !report.is_empty() {
            self.chain_queue.extend(report.steps);
            self.step_started = Some(now);
            self.clear_effect = None;
            self.clear_effect_time = None;
        }
    }

    /// Move to the next chain pass once the current one has been shown long enough.
    fn advance_chain(&mut self, now: Instant) {
        let Some(started) = self.step_started else {
            return;
        };
        if now.saturating_duration_since(started) < self.config.chain_delay {
            return;
        }
        self.chain_queue.pop_front();
        self.clear_effect = None;
        self.clear_effect_time = None;
        self.step_started = (!self.chain_queue.is_empty()).then_some(now);
        if self.step_started.is_none() {
            // pair waits a full interval after the chain finishes
            self.last_fall = now;
        }
    }

    fn update_screen(&mut self) {
        if self.screen == Screen::Playing && self.state.is_game_over() && !self.is_animating() {
            info!("game over with score {}", self.state.score());
            self.screen = Screen::GameOver;
        }
    }

    fn fall_interval(&self) -> Duration {
        match self.held {
            Some((Action::SoftDrop, _)) => self.config.soft_drop,
            _ => self.config.fall,
        }
    }

    fn tick_fall(&mut self, now: Instant) {
        if !self.accepts_moves() || now.saturating_duration_since(self.last_fall) < self.fall_interval() {
            return;
        }
        self.last_fall = now;
        if let Some(report) = self.state.tick_fall() {
            self.on_landed(report, now);
        }
    }

    /// Auto-repeat held moves. Soft drop is handled by the faster fall interval instead.
    fn tick_repeat(&mut self, now: Instant) {
        let Some((action, first)) = self.held else {
            return;
        };
        if !matches!(action, Action::MoveLeft | Action::MoveRight) {
            return;
        }
        if now.saturating_duration_since(first) < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.apply_action(action, now);
            self.last_repeat_fire = Some(now);
        }
    }

    /// Handle one key press. Returns false when the user asked to quit.
    fn handle_press(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return false,
            Action::Pause if self.screen == Screen::Playing => {
                self.paused = !self.paused;
                self.held = None;
                debug!("paused: {}", self.paused);
            }
            Action::Restart => self.reset_game(),
            _ => {
                self.apply_action(action, now);
                if self.track_releases && action.repeats() && self.accepts_moves() {
                    self.held = Some((action, now));
                    self.last_repeat_fire = None;
                }
            }
        }
        true
    }

    fn handle_release(&mut self, action: Action) {
        if self.held.map(|(a, _)| a) == Some(action) {
            self.held = None;
            self.last_repeat_fire = None;
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held soft drop / DAS possible; without them we rely on OS key repeat.
        self.track_releases = supports_keyboard_enhancement().unwrap_or(false);
        if self.track_releases {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!("key release events: {}", self.track_releases);

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        if self.track_releases {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let fade_ms = self.config.chain_delay.as_millis().min(u128::from(u32::MAX)) as u32;
        loop {
            let now = Instant::now();
            if !self.paused {
                self.advance_chain(now);
            }
            self.update_screen();

            terminal.draw(|f| {
                let step = self.chain_queue.front();
                let scene = Scene {
                    state: &self.state,
                    theme: &self.theme,
                    board: step.map_or(self.state.board(), |s| &s.before),
                    clearing: step.map_or(&[][..], |s| s.cells.as_slice()),
                    chain_shown: step.map(|s| s.chain),
                    show_pair: step.is_none() && self.screen == Screen::Playing,
                    paused: self.paused,
                    game_over: self.screen == Screen::GameOver,
                    fade_ms,
                };
                ui::draw(f, &scene, &mut self.clear_effect, &mut self.clear_effect_time, now);
            })?;

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    let action = key_to_action(key);
                    match key.kind {
                        KeyEventKind::Press => {
                            // OS repeats of a key we already repeat ourselves
                            if self.held.map(|(a, _)| a) == Some(action) {
                                continue;
                            }
                            if !self.handle_press(action, Instant::now()) {
                                return Ok(());
                            }
                        }
                        KeyEventKind::Release => self.handle_release(action),
                        KeyEventKind::Repeat => {}
                    }
                }
            }

            let now = Instant::now();
            self.tick_repeat(now);
            self.tick_fall(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, PuyoColor};
    use crate::color_source::Scripted;

    fn config(animate: bool) -> GameConfig {
        GameConfig {
            width: 6,
            height: 12,
            fall: Duration::from_millis(500),
            soft_drop: Duration::from_millis(50),
            chain_delay: Duration::from_millis(200),
            animate,
            seed: Some(1),
        }
    }

    fn app(animate: bool) -> App {
        use PuyoColor::{Blue, Red};
        let state = GameState::new(6, 12, Box::new(Scripted::new(&[(Red, Blue)])));
        App::with_state(config(animate), Theme::default(), state)
    }

    fn report(passes: u32) -> ChainReport {
        let steps = (1..=passes)
            .map(|chain| ChainStep {
                chain,
                cleared: 4,
                groups: 1,
                score: 80,
                cells: vec![(0, 11)],
                before: Board::default(),
            })
            .collect();
        ChainReport { steps, score: 80 }
    }

    #[test]
    fn chain_passes_are_shown_one_at_a_time() {
        let mut app = app(true);
        let t0 = Instant::now();
        app.on_landed(report(2), t0);
        assert_eq!(app.chain_queue.len(), 2);
        assert!(!app.accepts_moves());

        app.advance_chain(t0 + Duration::from_millis(100));
        assert_eq!(app.chain_queue.len(), 2);
        app.advance_chain(t0 + Duration::from_millis(200));
        assert_eq!(app.chain_queue.front().map(|s| s.chain), Some(2));
        app.advance_chain(t0 + Duration::from_millis(400));
        assert!(app.chain_queue.is_empty());
        assert!(app.step_started.is_none());
        assert!(app.accepts_moves());
    }

    #[test]
    fn no_animation_skips_queue() {
        let mut app = app(false);
        app.on_landed(report(3), Instant::now());
        assert!(app.chain_queue.is_empty());
        assert!(app.accepts_moves());
    }

    #[test]
    fn fall_timer_drives_the_pair() {
        let mut app = app(true);
        let t0 = app.last_fall;
        app.tick_fall(t0 + Duration::from_millis(100));
        assert_eq!(app.state.current().y, 0);
        app.tick_fall(t0 + Duration::from_millis(500));
        assert_eq!(app.state.current().y, 1);
    }

    #[test]
    fn held_soft_drop_speeds_up_fall() {
        let mut app = app(true);
        app.track_releases = true;
        let t0 = app.last_fall;
        assert!(app.handle_press(Action::SoftDrop, t0));
        assert_eq!(app.state.current().y, 1);
        assert_eq!(app.fall_interval(), Duration::from_millis(50));
        app.tick_fall(t0 + Duration::from_millis(60));
        assert_eq!(app.state.current().y, 2);
        app.handle_release(Action::SoftDrop);
        assert_eq!(app.fall_interval(), Duration::from_millis(500));
    }

    #[test]
    fn pause_freezes_input() {
        let mut app = app(true);
        let now = Instant::now();
        app.handle_press(Action::Pause, now);
        app.handle_press(Action::MoveLeft, now);
        assert_eq!(app.state.current().x, 2);
        app.handle_press(Action::Pause, now);
        app.handle_press(Action::MoveLeft, now);
        assert_eq!(app.state.current().x, 1);
    }

    #[test]
    fn quit_and_restart() {
        let mut app = app(true);
        let now = Instant::now();
        app.handle_press(Action::HardDrop, now);
        assert_eq!(app.state.pairs_placed(), 1);
        assert!(app.handle_press(Action::Restart, now));
        assert_eq!(app.state.pairs_placed(), 0);
        assert_eq!(app.screen, Screen::Playing);
        assert!(!app.handle_press(Action::Quit, now));
    }

    /// App whose spawn columns are stacked to the top without any clears.
    fn stacked_app() -> App {
        use PuyoColor::{Blue, Green, Red, Yellow};
        // no two touching puyos share a colour, so nothing ever clears
        let source = Scripted::new(&[(Red, Blue), (Green, Yellow), (Blue, Red), (Yellow, Green)]);
        let state = GameState::new(6, 12, Box::new(source));
        let mut app = App::with_state(config(true), Theme::default(), state);
        for _ in 0..12 {
            app.handle_press(Action::HardDrop, Instant::now());
        }
        assert!(app.state.is_game_over());
        app
    }

    #[test]
    fn game_over_screen_waits_for_chain_display() {
        let mut app = stacked_app();
        app.chain_queue.extend(report(1).steps);
        app.update_screen();
        assert_eq!(app.screen, Screen::Playing);
        app.chain_queue.clear();
        app.update_screen();
        assert_eq!(app.screen, Screen::GameOver);

        app.handle_press(Action::Restart, Instant::now());
        assert_eq!(app.screen, Screen::Playing);
        assert!(!app.state.is_game_over());
        assert_eq!(app.state.pairs_placed(), 0);
        assert_eq!(app.state.board().occupied(), 0);
    }

    #[test]
    fn moves_are_ignored_after_game_over() {
        let mut app = stacked_app();
        app.update_screen();
        assert!(!app.accepts_moves());
        let pair = *app.state.current();
        let placed = app.state.pairs_placed();
        let now = Instant::now();
        for action in [Action::MoveLeft, Action::RotateCw, Action::SoftDrop, Action::HardDrop] {
            assert!(app.handle_press(action, now));
        }
        app.tick_fall(now + Duration::from_secs(5));
        assert_eq!(app.state.current(), &pair);
        assert_eq!(app.state.pairs_placed(), placed);
        assert_eq!(app.screen, Screen::GameOver);
    }
}

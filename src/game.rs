//! Game state: current and next pair, movement, landing, chain resolution, score.

use crate::board::{Board, Cell, Clear, PuyoColor};
use crate::color_source::ColorSource;
use crate::pair::Pair;
use log::{debug, info};
use std::cmp::Reverse;

/// Base points for every cleared puyo.
const POINTS_PER_PUYO: u64 = 10;

/// Where the controller is in its landing cycle.
///
/// `Landing`, `Resolving` and `Spawning` only hold while `land` runs, which
/// finishes the whole cycle in one call; from outside `phase()` is always
/// `Falling` or `GameOver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Falling,
    Landing,
    Resolving,
    Spawning,
    GameOver,
}

/// One gravity + clear pass of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    /// 1-based chain number of this pass.
    pub chain: u32,
    pub cleared: usize,
    pub groups: usize,
    /// Points awarded for this pass.
    pub score: u64,
    pub cells: Vec<(usize, usize)>,
    /// Board after gravity, before the clear.
    pub before: Board,
}

/// Everything one `process_chains` call resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub steps: Vec<ChainStep>,
    pub score: u64,
}

impl ChainReport {
    pub fn chain(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Points for one pass: cleared * 10 * max(1, 2 * chain) * groups.
pub fn pass_score(cleared: usize, groups: usize, chain: u32) -> u64 {
    let chain_bonus = u64::from(chain.saturating_mul(2).max(1));
    cleared as u64 * POINTS_PER_PUYO * chain_bonus * groups as u64
}

/// Game state: board, falling pair, next pair, score and chain counters.
#[derive(Debug)]
pub struct GameState {
    board: Board,
    current: Pair,
    next: Pair,
    score: u64,
    chain: u32,
    max_chain: u32,
    pairs_placed: u32,
    game_over: bool,
    phase: Phase,
    source: Box<dyn ColorSource>,
}

impl GameState {
    pub fn new(width: usize, height: usize, source: Box<dyn ColorSource>) -> Self {
        Self::from_board(Board::new(width, height), source)
    }

    fn from_board(board: Board, mut source: Box<dyn ColorSource>) -> Self {
        let width = board.width();
        let (m, s) = source.next_colors();
        let current = Pair::spawn(m, s, width);
        let (m, s) = source.next_colors();
        let next = Pair::spawn(m, s, width);
        let mut state = Self {
            board,
            current,
            next,
            score: 0,
            chain: 0,
            max_chain: 0,
            pairs_placed: 0,
            game_over: false,
            phase: Phase::Falling,
            source,
        };
        state.check_spawn();
        state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current(&self) -> &Pair {
        &self.current
    }

    pub fn next(&self) -> &Pair {
        &self.next
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Chain count of the most recent resolution.
    pub fn chain(&self) -> u32 {
        self.chain
    }

    pub fn max_chain(&self) -> u32 {
        self.max_chain
    }

    pub fn pairs_placed(&self) -> u32 {
        self.pairs_placed
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Intents are only honoured while a pair is falling.
    pub fn accepts_input(&self) -> bool {
        !self.game_over && self.phase == Phase::Falling
    }

    /// Translate the pair if the destination is free. Returns false and leaves state alone otherwise.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let moved = self.current.translated(dx, dy);
        if !self.board.can_place_pair(&moved) {
            return false;
        }
        self.current = moved;
        true
    }

    /// Rotate around the main cell. No wall kicks: a blocked rotation just fails.
    pub fn try_rotate(&mut self, clockwise: bool) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let rotated = self.current.rotated(clockwise);
        if !self.board.can_place_pair(&rotated) {
            return false;
        }
        self.current = rotated;
        true
    }

    /// One row down if possible; never lands the pair.
    pub fn soft_drop(&mut self) -> bool {
        self.try_move(0, 1)
    }

    /// Drop as far as possible, then land.
    pub fn hard_drop(&mut self) -> Option<ChainReport> {
        if !self.accepts_input() {
            return None;
        }
        while self.try_move(0, 1) {}
        Some(self.land())
    }

    /// Automatic fall step: move down, or land when blocked.
    pub fn tick_fall(&mut self) -> Option<ChainReport> {
        if !self.accepts_input() {
            return None;
        }
        if self.try_move(0, 1) {
            return None;
        }
        Some(self.land())
    }

    /// commit → chains → spawn, in that order.
    fn land(&mut self) -> ChainReport {
        self.phase = Phase::Landing;
        debug!(
            "landing pair at ({}, {}) rotation {}",
            self.current.x,
            self.current.y,
            self.current.rotation.index()
        );
        self.commit_pair();

        self.phase = Phase::Resolving;
        let report = self.process_chains();

        self.phase = Phase::Spawning;
        let colors = self.source.next_colors();
        self.spawn_next(colors);
        report
    }

    /// Write the pair into the board; each half settles on its own.
    pub fn commit_pair(&mut self) {
        let mut cells = self.current.cells();
        // Lower half first, otherwise the upper one falls into its partner's slot.
        cells.sort_by_key(|&((_, y), _)| Reverse(y));
        for ((x, y), color) in cells {
            let mut rest = y;
            while self.board.is_occupiable(x, rest + 1) {
                rest += 1;
            }
            self.board.place(x, rest, Cell::Puyo(color));
        }
        self.pairs_placed += 1;
    }

    /// Gravity + clear until nothing clears. Accrues score; resets the chain counter first.
    pub fn process_chains(&mut self) -> ChainReport {
        self.chain = 0;
        let mut report = ChainReport::default();

        loop {
            self.board.apply_gravity();
            let before = self.board.clone();
            let clear = self.board.find_and_clear_groups();
            if clear.is_empty() {
                break;
            }
            let Clear {
                cleared,
                groups,
                cells,
            } = clear;

            self.chain += 1;
            let score = pass_score(cleared, groups, self.chain);
            self.score += score;
            report.score += score;
            debug!(
                "chain {}: cleared {} in {} group(s), +{}",
                self.chain, cleared, groups, score
            );
            report.steps.push(ChainStep {
                chain: self.chain,
                cleared,
                groups,
                score,
                cells,
                before,
            });
        }

        self.max_chain = self.max_chain.max(self.chain);
        report
    }

    /// Promote next to current at the spawn point; `colors` become the new next pair.
    pub fn spawn_next(&mut self, colors: (PuyoColor, PuyoColor)) {
        let width = self.board.width();
        let promoted = std::mem::replace(&mut self.next, Pair::spawn(colors.0, colors.1, width));
        self.current = Pair::spawn(promoted.main, promoted.sub, width);
        self.phase = Phase::Falling;
        self.check_spawn();
    }

    fn check_spawn(&mut self) {
        if !self.game_over && !self.board.can_place_pair(&self.current) {
            info!(
                "game over: score {}, {} pairs, best chain {}",
                self.score, self.pairs_placed, self.max_chain
            );
            self.game_over = true;
        }
        if self.game_over {
            self.phase = Phase::GameOver;
        }
    }

    /// Fresh empty board, new pairs, zeroed counters.
    pub fn restart(&mut self) {
        let width = self.board.width();
        self.board.clear();
        let (m, s) = self.source.next_colors();
        self.current = Pair::spawn(m, s, width);
        let (m, s) = self.source.next_colors();
        self.next = Pair::spawn(m, s, width);
        self.score = 0;
        self.chain = 0;
        self.max_chain = 0;
        self.pairs_placed = 0;
        self.game_over = false;
        self.phase = Phase::Falling;
        info!("restart: {}x{} board", width, self.board.height());
    }
}

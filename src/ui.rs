//! Layout and drawing: playfield, falling pair, next preview, score, overlays, clear fade.

use crate::board::{Board, Cell};
use crate::game::GameState;
use crate::pair::Pair;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each puyo is two terminal columns wide so it looks roughly square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;
const SIDEBAR_HEIGHT: u16 = 21;

const PUYO_SYMBOL: &str = "██";
const EMPTY_SYMBOL: &str = " ·";
const SPAWN_SYMBOL: &str = " x";

/// Playfield size in terminal cells, border included.
fn playfield_outer_size(board: &Board) -> (u16, u16) {
    (
        board.width() as u16 * CELL_WIDTH + 2,
        board.height() as u16 * CELL_HEIGHT + 2,
    )
}

/// Smallest terminal that fits board + sidebar.
pub fn required_terminal_size(board: &Board) -> (u16, u16) {
    let (pw, ph) = playfield_outer_size(board);
    (pw + SIDEBAR_WIDTH, ph.max(SIDEBAR_HEIGHT))
}

/// What to draw this frame.
#[derive(Debug)]
pub struct Scene<'a> {
    pub state: &'a GameState,
    pub theme: &'a Theme,
    /// Live board, or a chain snapshot while a chain is being shown.
    pub board: &'a Board,
    /// Cells fading out in the current chain pass.
    pub clearing: &'a [(usize, usize)],
    /// Chain number being shown, if any.
    pub chain_shown: Option<u32>,
    pub show_pair: bool,
    pub paused: bool,
    pub game_over: bool,
    /// Fade length for cleared cells, in ms.
    pub fade_ms: u32,
}

/// Draw the whole screen. Applies the clear fade to `scene.clearing` and updates `effect` / `effect_time`.
pub fn draw(
    frame: &mut Frame,
    scene: &Scene,
    effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let (need_w, need_h) = required_terminal_size(scene.board);
    if area.width < need_w || area.height < need_h {
        draw_too_small(frame, scene.theme, area, need_w, need_h);
        return;
    }

    let board_rect = draw_game(frame, scene, area);
    if !scene.clearing.is_empty() {
        apply_clear_effect(frame, scene, board_rect, effect, effect_time, now);
    }
    if scene.game_over {
        draw_game_over(frame, scene, area);
    } else if scene.paused {
        draw_pause_overlay(frame, scene.theme, area);
    }
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, need_w: u16, need_h: u16) {
    let text = vec![
        Line::from("Terminal too small"),
        Line::from(format!(
            "need {}x{}, have {}x{}",
            need_w, need_h, area.width, area.height
        )),
    ];
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.main_fg))
        .render(area, frame.buffer_mut());
}

/// Buffer positions covered by clearing cells.
fn clearing_buffer_positions(board_rect: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(x, y) in cells {
        let x0 = board_rect.x + x as u16 * CELL_WIDTH;
        let y0 = board_rect.y + y as u16 * CELL_HEIGHT;
        for bx in x0..x0 + CELL_WIDTH {
            for by in y0..y0 + CELL_HEIGHT {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Fade clearing cells to the background (TachyonFX), creating the effect on first use.
fn apply_clear_effect(
    frame: &mut Frame,
    scene: &Scene,
    board_rect: Rect,
    effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *effect_time = Some(now);

    if effect.is_none() {
        let clearing = clearing_buffer_positions(board_rect, scene.clearing);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing.contains(&(pos.x, pos.y))
        }));
        let bg = scene.theme.bg;
        *effect = Some(
            fx::fade_to(bg, bg, (scene.fade_ms, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board_rect),
        );
    }

    if let Some(effect) = effect {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}

/// Playfield + sidebar, centred. Returns the board rect (inside the border).
fn draw_game(frame: &mut Frame, scene: &Scene, area: Rect) -> Rect {
    let (pw, ph) = playfield_outer_size(scene.board);
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(SIDEBAR_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let playfield_area = Rect {
        height: ph,
        ..inner[0]
    };
    let board_rect = draw_playfield(frame, scene, playfield_area);
    draw_sidebar(frame, scene, inner[1]);
    board_rect
}

fn draw_playfield(frame: &mut Frame, scene: &Scene, area: Rect) -> Rect {
    let theme = scene.theme;
    let board = scene.board;
    let title = match scene.chain_shown {
        Some(n) => format!(" {n} chain! "),
        None => " puyotui ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let pair = scene.show_pair.then_some(scene.state.current());
    let spawn = Pair::spawn(scene.state.next().main, scene.state.next().sub, board.width());
    let spawn_cells = spawn.positions();
    let clearing: HashSet<(usize, usize)> = scene.clearing.iter().copied().collect();

    let buf = frame.buffer_mut();
    for y in 0..board.height() {
        for x in 0..board.width() {
            let (symbol, style) = match cell_at(board, pair, x, y) {
                Cell::Puyo(color) => {
                    let fg = if clearing.contains(&(x, y)) {
                        Color::White
                    } else {
                        theme.puyo_color(color.index())
                    };
                    (PUYO_SYMBOL, Style::default().fg(fg).bg(theme.bg))
                }
                Cell::Empty if spawn_cells.contains(&(x as i32, y as i32)) => {
                    (SPAWN_SYMBOL, Style::default().fg(Color::Red).bg(theme.bg))
                }
                Cell::Empty => (EMPTY_SYMBOL, Style::default().fg(theme.div_line).bg(theme.bg)),
            };
            let rx = inner.x + x as u16 * CELL_WIDTH;
            let ry = inner.y + y as u16 * CELL_HEIGHT;
            buf.set_string(rx, ry, symbol, style);
        }
    }

    Rect {
        width: board.width() as u16 * CELL_WIDTH,
        height: board.height() as u16 * CELL_HEIGHT,
        ..inner
    }
}

/// Board cell with the falling pair laid over it.
fn cell_at(board: &Board, pair: Option<&Pair>, x: usize, y: usize) -> Cell {
    if let Some(pair) = pair {
        for ((px, py), color) in pair.cells() {
            if (px, py) == (x as i32, y as i32) {
                return Cell::Puyo(color);
            }
        }
    }
    board.get(x, y).unwrap_or_default()
}

fn draw_sidebar(frame: &mut Frame, scene: &Scene, area: Rect) {
    let theme = scene.theme;
    let state = scene.state;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Next
            Constraint::Length(7), // Stats
            Constraint::Length(10), // Controls
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next = state.next();
    let next_line = Line::from(vec![
        Span::styled(
            PUYO_SYMBOL,
            Style::default().fg(theme.puyo_color(next.main.index())),
        ),
        Span::styled(
            PUYO_SYMBOL,
            Style::default().fg(theme.puyo_color(next.sub.index())),
        ),
    ]);
    Paragraph::new(next_line)
        .alignment(Alignment::Center)
        .render(next_inner, frame.buffer_mut());

    // --- Stats ---
    // red frame while the top row holds puyos
    let stats_border = if scene.board.is_game_over() {
        border_style.fg(theme.puyo_color(0))
    } else {
        border_style
    };
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(stats_border);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let mut stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best chain: ", title_style),
            Span::styled(state.max_chain().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Pairs: ", title_style),
            Span::styled(state.pairs_placed().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Puyos: ", title_style),
            Span::styled(scene.board.occupied().to_string(), fg_style),
        ]),
    ];
    let chain = scene.chain_shown.unwrap_or_else(|| state.chain());
    if chain > 0 {
        stats.push(Line::from(Span::styled(
            format!("Chain: {chain}"),
            Style::default()
                .fg(theme.puyo_color(3))
                .add_modifier(Modifier::BOLD),
        )));
    }
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Controls ---
    let help_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Controls ", title_style));
    let help_inner = help_block.inner(chunks[2]);
    help_block.render(chunks[2], frame.buffer_mut());
    let help: Vec<Line> = [
        ("← →", "Move"),
        ("↓", "Soft drop"),
        ("↑ Space", "Hard drop"),
        ("Z X", "Rotate →"),
        ("C", "Rotate ←"),
        ("P", "Pause"),
        ("R", "Restart"),
        ("Q", "Quit"),
    ]
    .into_iter()
    .map(|(key, what)| {
        Line::from(vec![
            Span::styled(format!("{key:<8}"), title_style),
            Span::styled(what, fg_style),
        ])
    })
    .collect();
    Paragraph::new(help).render(help_inner, frame.buffer_mut());
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(Span::styled(
            " P Resume    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, scene: &Scene, area: Rect) {
    let theme = scene.theme;
    let state = scene.state;
    let popup = centered_popup(area, 30, 9);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("Final Score: {}", state.score()), fg)),
        Line::from(Span::styled(format!("Best chain: {}", state.max_chain()), fg)),
        Line::from(""),
        Line::from(Span::styled("Press R to restart", fg)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_board_needs_modest_terminal() {
        let board = Board::default();
        assert_eq!(playfield_outer_size(&board), (14, 14));
        assert_eq!(required_terminal_size(&board), (38, SIDEBAR_HEIGHT));
    }

    #[test]
    fn clearing_positions_cover_both_columns() {
        let rect = Rect::new(10, 5, 12, 12);
        let set = clearing_buffer_positions(rect, &[(0, 0), (2, 3)]);
        assert_eq!(set.len(), 4);
        assert!(set.contains(&(10, 5)) && set.contains(&(11, 5)));
        assert!(set.contains(&(14, 8)) && set.contains(&(15, 8)));
    }

    #[test]
    fn pair_overrides_board_cells() {
        use crate::board::PuyoColor;
        let board = Board::from_bottom_rows(&["G....."]);
        let pair = Pair::new(PuyoColor::Red, PuyoColor::Blue, 0, 3);
        assert_eq!(cell_at(&board, Some(&pair), 1, 3), Cell::Puyo(PuyoColor::Blue));
        assert_eq!(cell_at(&board, Some(&pair), 0, 11), Cell::Puyo(PuyoColor::Green));
        assert_eq!(cell_at(&board, None, 0, 3), Cell::Empty);
    }

    #[test]
    fn popup_is_centred_and_clamped() {
        let area = Rect::new(0, 0, 40, 20);
        assert_eq!(centered_popup(area, 30, 10), Rect::new(5, 5, 30, 10));
        assert_eq!(centered_popup(area, 50, 30), Rect::new(0, 0, 40, 20));
    }
}

//! Falling pair: anchor ("main") cell plus a sub cell orbiting it.

use crate::board::PuyoColor;

/// Where the sub cell sits relative to main.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Right,
    Down,
    Left,
    Up,
}

impl Rotation {
    const ALL: [Self; 4] = [Self::Right, Self::Down, Self::Left, Self::Up];

    /// Rotation state 0..4.
    pub fn index(self) -> u8 {
        match self {
            Self::Right => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Up => 3,
        }
    }

    fn from_index(i: i8) -> Self {
        Self::ALL[i.rem_euclid(4) as usize]
    }

    pub fn clockwise(self) -> Self {
        Self::from_index(self.index() as i8 + 1)
    }

    pub fn counter_clockwise(self) -> Self {
        Self::from_index(self.index() as i8 - 1)
    }

    /// (dx, dy) from main to sub.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Up => (0, -1),
        }
    }
}

/// Current pair with anchor position and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub main: PuyoColor,
    pub sub: PuyoColor,
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
}

impl Pair {
    pub fn new(main: PuyoColor, sub: PuyoColor, x: i32, y: i32) -> Self {
        Self {
            main,
            sub,
            x,
            y,
            rotation: Rotation::Right,
        }
    }

    /// Spawn anchor for a board of the given width: column width/2 - 1, top row, sub to the right.
    pub fn spawn(main: PuyoColor, sub: PuyoColor, board_width: usize) -> Self {
        let x = (board_width as i32 / 2 - 1).max(0);
        Self::new(main, sub, x, 0)
    }

    pub fn sub_position(&self) -> (i32, i32) {
        let (dx, dy) = self.rotation.offset();
        (self.x + dx, self.y + dy)
    }

    /// [main, sub] positions.
    pub fn positions(&self) -> [(i32, i32); 2] {
        [(self.x, self.y), self.sub_position()]
    }

    /// [main, sub] positions with their colours.
    pub fn cells(&self) -> [((i32, i32), PuyoColor); 2] {
        [((self.x, self.y), self.main), (self.sub_position(), self.sub)]
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Same anchor, rotation advanced one step.
    pub fn rotated(&self, clockwise: bool) -> Self {
        let rotation = if clockwise {
            self.rotation.clockwise()
        } else {
            self.rotation.counter_clockwise()
        };
        Self { rotation, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Pair {
        Pair::new(PuyoColor::Red, PuyoColor::Blue, 2, 5)
    }

    #[test]
    fn sub_is_always_a_neighbour_of_main() {
        let mut p = pair();
        for _ in 0..8 {
            let [(mx, my), (sx, sy)] = p.positions();
            assert_eq!((mx - sx).abs() + (my - sy).abs(), 1);
            p = p.rotated(true);
        }
    }

    #[test]
    fn rotation_keeps_anchor() {
        let p = pair().rotated(true).rotated(false).rotated(false);
        assert_eq!((p.x, p.y), (2, 5));
        assert_eq!(p.rotation, Rotation::Up);
        assert_eq!(p.sub_position(), (2, 4));
    }

    #[test]
    fn counter_clockwise_wraps_from_zero() {
        assert_eq!(Rotation::Right.counter_clockwise(), Rotation::Up);
        assert_eq!(Rotation::Up.clockwise(), Rotation::Right);
        assert_eq!(Rotation::Up.counter_clockwise().index(), 2);
    }

    #[test]
    fn offsets_follow_rotation_order() {
        let offsets: Vec<_> = Rotation::ALL.iter().map(|r| r.offset()).collect();
        assert_eq!(offsets, [(1, 0), (0, 1), (-1, 0), (0, -1)]);
    }

    #[test]
    fn spawn_is_left_of_centre() {
        let p = Pair::spawn(PuyoColor::Green, PuyoColor::Yellow, 6);
        assert_eq!(p.positions(), [(2, 0), (3, 0)]);
        assert_eq!(p.rotation, Rotation::Right);
        assert_eq!(Pair::spawn(PuyoColor::Green, PuyoColor::Yellow, 2).x, 0);
    }

    #[test]
    fn translate_moves_both_cells() {
        let p = pair().rotated(true).translated(-1, 2);
        assert_eq!(p.positions(), [(1, 7), (1, 8)]);
        assert_eq!(p.cells()[1], ((1, 8), PuyoColor::Blue));
    }
}

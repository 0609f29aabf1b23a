use rand::rngs::StdRng;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use thiserror::Error;

const ZOBRIST_SEED: u64 = 0x5255_5348_484f_5552;
const PLACEMENT_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board dimensions must be non-zero")]
    Empty,
    #[error("board has no primary piece")]
    NoPrimary,
    #[error("primary piece must be horizontal")]
    PrimaryNotHorizontal,
    #[error("piece {piece} has size {size}, pieces must be at least 2 cells long")]
    PieceTooSmall { piece: usize, size: usize },
    #[error("piece {piece} does not fit on the board")]
    PieceOutOfBounds { piece: usize },
    #[error("wall at cell {cell} is outside the board")]
    WallOutOfBounds { cell: usize },
    #[error("cell {cell} is covered more than once")]
    Overlap { cell: usize },
}

/// A rigid piece occupying `size` consecutive cells along its orientation,
/// starting at `position` (the top-left cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub position: usize,
    pub size: usize,
    pub orientation: Orientation,
}

impl Piece {
    pub fn new(position: usize, size: usize, orientation: Orientation) -> Self {
        Self {
            position,
            size,
            orientation,
        }
    }

    pub fn stride(&self, width: usize) -> usize {
        match self.orientation {
            Orientation::Horizontal => 1,
            Orientation::Vertical => width,
        }
    }

    pub fn row(&self, width: usize) -> usize {
        self.position / width
    }

    pub fn col(&self, width: usize) -> usize {
        self.position % width
    }

    pub fn cells(&self, width: usize) -> impl Iterator<Item = usize> {
        let stride = self.stride(width);
        let position = self.position;
        (0..self.size).map(move |i| position + i * stride)
    }
}

/// Displaces `piece` by `steps` cells along its axis. Negative steps move
/// left or up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Move {
    pub piece: usize,
    pub steps: i32,
}

impl Move {
    pub fn new(piece: usize, steps: i32) -> Self {
        Self { piece, steps }
    }

    pub fn abs_steps(&self) -> usize {
        self.steps.unsigned_abs() as usize
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:+}", self.piece, self.steps)
    }
}

/// Random keys for every (kind, size, cell) placement a valid board can
/// hold, sizes `2..=max(width, height)`. The primary piece gets its own kind
/// so it never hashes like an identical blocker.
struct Zobrist {
    keys: Vec<u64>,
    sizes: usize,
    cells: usize,
}

impl Zobrist {
    const KINDS: usize = 3;
    const MIN_SIZE: usize = 2;

    fn new(width: usize, height: usize) -> Self {
        let cells = width * height;
        let sizes = (width.max(height) + 1).saturating_sub(Self::MIN_SIZE);
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let keys = (0..Self::KINDS * sizes * cells).map(|_| rng.gen()).collect();
        Self { keys, sizes, cells }
    }

    fn key(&self, index: usize, piece: &Piece) -> u64 {
        let kind = match (index, piece.orientation) {
            (0, _) => 0,
            (_, Orientation::Horizontal) => 1,
            (_, Orientation::Vertical) => 2,
        };
        let size = match piece.size.checked_sub(Self::MIN_SIZE) {
            Some(size) if size < self.sizes && piece.position < self.cells => size,
            _ => return 0,
        };
        self.keys[(kind * self.sizes + size) * self.cells + piece.position]
    }
}

impl fmt::Debug for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zobrist")
            .field("sizes", &self.sizes)
            .field("cells", &self.cells)
            .finish_non_exhaustive()
    }
}

/// A rectangular sliding-block board. `pieces[0]` is the primary piece and
/// must leave through the right edge of its row.
#[derive(Debug, Clone)]
pub struct Board {
    width: usize,
    height: usize,
    pieces: Vec<Piece>,
    walls: Vec<usize>,
    occupied: Vec<bool>,
    key: u64,
    zobrist: Arc<Zobrist>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pieces: Vec::new(),
            walls: Vec::new(),
            occupied: vec![false; width * height],
            key: 0,
            zobrist: Arc::new(Zobrist::new(width, height)),
        }
    }

    /// Generates a random board: a size 2 primary piece at the left edge of
    /// a random row, then up to `pieces` blockers and `walls` walls placed
    /// wherever they fit. Horizontal blockers and walls stay off the
    /// primary row so the result is never trivially impossible.
    pub fn random<R: Rng>(
        rng: &mut R,
        width: usize,
        height: usize,
        pieces: usize,
        walls: usize,
    ) -> Self {
        let mut board = Board::new(width, height);
        if width == 0 || height == 0 {
            return board;
        }

        let primary_row = rng.gen_range(0..height);
        board.add_piece(primary_row * width, 2, Orientation::Horizontal);

        let cells = width * height;
        let mut placed = 0;
        for _ in 0..pieces * PLACEMENT_ATTEMPTS {
            if placed == pieces {
                break;
            }
            let orientation = if rng.gen() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let piece = Piece::new(rng.gen_range(0..cells), rng.gen_range(2..=3), orientation);
            if orientation == Orientation::Horizontal && piece.row(width) == primary_row {
                continue;
            }
            if board.fits(&piece) {
                board.add_piece(piece.position, piece.size, piece.orientation);
                placed += 1;
            }
        }

        placed = 0;
        for _ in 0..walls * PLACEMENT_ATTEMPTS {
            if placed == walls {
                break;
            }
            let cell = rng.gen_range(0..cells);
            if cell / width != primary_row && !board.occupied[cell] {
                board.add_wall(cell);
                placed += 1;
            }
        }

        board
    }

    pub fn add_piece(&mut self, position: usize, size: usize, orientation: Orientation) {
        let piece = Piece::new(position, size, orientation);
        let index = self.pieces.len();
        self.pieces.push(piece);
        for cell in piece.cells(self.width) {
            if let Some(occupied) = self.occupied.get_mut(cell) {
                *occupied = true;
            }
        }
        self.key ^= self.zobrist.key(index, &piece);
    }

    pub fn add_wall(&mut self, cell: usize) {
        self.walls.push(cell);
        if let Some(occupied) = self.occupied.get_mut(cell) {
            *occupied = true;
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn walls(&self) -> &[usize] {
        &self.walls
    }

    /// # Panics
    ///
    /// Panics if the board has no pieces.
    pub fn primary(&self) -> &Piece {
        &self.pieces[0]
    }

    /// # Panics
    ///
    /// Panics if `cell` lies outside the board.
    pub fn is_occupied(&self, cell: usize) -> bool {
        self.occupied[cell]
    }

    /// Position the primary piece has to reach: flush with the right edge
    /// of its row.
    ///
    /// # Panics
    ///
    /// Panics if the board has no pieces or the primary piece is wider than
    /// the board.
    pub fn target(&self) -> usize {
        let primary = self.primary();
        primary.row(self.width) * self.width + self.width - primary.size
    }

    pub fn is_solved(&self) -> bool {
        self.primary().position == self.target()
    }

    pub fn memo_key(&self) -> u64 {
        self.key
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardError::Empty);
        }
        let primary = self.pieces.first().ok_or(BoardError::NoPrimary)?;
        if primary.orientation != Orientation::Horizontal {
            return Err(BoardError::PrimaryNotHorizontal);
        }

        let cells = self.width * self.height;
        let mut covered = vec![false; cells];
        for (index, piece) in self.pieces.iter().enumerate() {
            if piece.size < 2 {
                return Err(BoardError::PieceTooSmall {
                    piece: index,
                    size: piece.size,
                });
            }
            if !self.in_bounds(piece) {
                return Err(BoardError::PieceOutOfBounds { piece: index });
            }
            for cell in piece.cells(self.width) {
                if covered[cell] {
                    return Err(BoardError::Overlap { cell });
                }
                covered[cell] = true;
            }
        }
        for &cell in &self.walls {
            if cell >= cells {
                return Err(BoardError::WallOutOfBounds { cell });
            }
            if covered[cell] {
                return Err(BoardError::Overlap { cell });
            }
            covered[cell] = true;
        }
        Ok(())
    }

    /// Cheap static check: the primary piece can never pass a wall or a
    /// horizontal piece sharing its row.
    pub fn impossible(&self) -> bool {
        let primary = self.primary();
        let row = primary.row(self.width);
        let start = primary.position + primary.size;
        let end = (row + 1) * self.width;

        let walled = self.walls.iter().any(|&cell| cell >= start && cell < end);
        walled
            || self.pieces[1..].iter().any(|piece| {
                piece.orientation == Orientation::Horizontal
                    && piece.row(self.width) == row
                    && piece.position > primary.position
            })
    }

    /// Fills `buf` with every legal move, replacing its previous contents.
    /// For each piece in order: backward slides nearest first, then forward
    /// slides nearest first.
    ///
    /// # Panics
    ///
    /// Panics on a board that does not pass [`Board::validate`], e.g. a
    /// piece longer than the board or one hanging over its edge.
    pub fn moves(&self, buf: &mut Vec<Move>) {
        buf.clear();
        for (index, piece) in self.pieces.iter().enumerate() {
            let stride = piece.stride(self.width);
            let (before, after) = match piece.orientation {
                Orientation::Horizontal => {
                    let x = piece.col(self.width);
                    (x, self.width - piece.size - x)
                }
                Orientation::Vertical => {
                    let y = piece.row(self.width);
                    (y, self.height - piece.size - y)
                }
            };

            let mut cell = piece.position;
            for steps in 1..=before {
                cell -= stride;
                if self.occupied[cell] {
                    break;
                }
                buf.push(Move::new(index, -(steps as i32)));
            }

            let mut cell = piece.position + (piece.size - 1) * stride;
            for steps in 1..=after {
                cell += stride;
                if self.occupied[cell] {
                    break;
                }
                buf.push(Move::new(index, steps as i32));
            }
        }
    }

    pub fn do_move(&mut self, mv: Move) {
        self.shift(mv.piece, mv.steps);
    }

    pub fn undo_move(&mut self, mv: Move) {
        self.shift(mv.piece, -mv.steps);
    }

    /// Applies `mv` for the lifetime of the returned guard; dropping the
    /// guard undoes it.
    pub fn apply(&mut self, mv: Move) -> Applied<'_> {
        self.do_move(mv);
        Applied { board: self, mv }
    }

    /// Applies `count` random legal moves, stopping early on a board with
    /// nothing left to slide.
    pub fn scramble<R: Rng>(&mut self, rng: &mut R, count: usize) {
        let mut buf = Vec::new();
        for _ in 0..count {
            self.moves(&mut buf);
            match buf.choose(rng) {
                Some(&mv) => self.do_move(mv),
                None => break,
            }
        }
    }

    fn shift(&mut self, index: usize, steps: i32) {
        let piece = self.pieces[index];
        self.place(index, &piece, false);

        let offset = steps as isize * piece.stride(self.width) as isize;
        let moved = Piece {
            position: (piece.position as isize + offset) as usize,
            ..piece
        };
        self.pieces[index] = moved;
        self.place(index, &moved, true);
    }

    fn place(&mut self, index: usize, piece: &Piece, occupied: bool) {
        for cell in piece.cells(self.width) {
            self.occupied[cell] = occupied;
        }
        self.key ^= self.zobrist.key(index, piece);
    }

    fn in_bounds(&self, piece: &Piece) -> bool {
        piece.position < self.width * self.height
            && match piece.orientation {
                Orientation::Horizontal => piece.col(self.width) + piece.size <= self.width,
                Orientation::Vertical => piece.row(self.width) + piece.size <= self.height,
            }
    }

    fn fits(&self, piece: &Piece) -> bool {
        self.in_bounds(piece) && piece.cells(self.width).all(|cell| !self.occupied[cell])
    }
}

/// A move held on the board until the guard is dropped.
pub struct Applied<'a> {
    board: &'a mut Board,
    mv: Move,
}

impl Deref for Applied<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for Applied<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for Applied<'_> {
    fn drop(&mut self) {
        self.board.undo_move(self.mv);
    }
}

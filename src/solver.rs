use crate::board::{Board, BoardError, Move};
use crate::memo::Memo;
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a [`Solver::solve`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Solved,
    /// The board failed validation; nothing was searched.
    Invalid(BoardError),
    /// A static check ruled the board out; nothing was searched.
    Impossible,
    /// The reachable state space was exhausted without reaching the target.
    Unsolvable,
    /// The stop flag was raised before the search finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub status: Status,
    pub moves: Vec<Move>,
    pub num_moves: usize,
    pub num_steps: usize,
    pub depth: usize,
    pub memo_size: usize,
    pub memo_hits: u64,
}

impl Solution {
    fn unsearched(status: Status) -> Self {
        Self {
            status,
            moves: Vec::new(),
            num_moves: 0,
            num_steps: 0,
            depth: 0,
            memo_size: 0,
            memo_hits: 0,
        }
    }

    fn searched(status: Status, moves: Vec<Move>, depth: usize, memo: &Memo) -> Self {
        Self {
            status,
            num_moves: moves.len(),
            num_steps: moves.iter().map(Move::abs_steps).sum(),
            moves,
            depth,
            memo_size: memo.len(),
            memo_hits: memo.hits(),
        }
    }

    pub fn solvable(&self) -> bool {
        self.status == Status::Solved
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Status::Solved => write!(
                f,
                "solved in {} moves ({} steps)",
                self.num_moves, self.num_steps
            )?,
            Status::Invalid(err) => return write!(f, "invalid board: {}", err),
            Status::Impossible => return write!(f, "impossible board"),
            Status::Unsolvable => write!(f, "unsolvable")?,
            Status::Cancelled => write!(f, "cancelled")?,
        }
        write!(
            f,
            ", depth {}, memo {}, hits {}",
            self.depth, self.memo_size, self.memo_hits
        )
    }
}

/// Iterative-deepening solver. Borrows the board mutably for the duration
/// of a solve and leaves it exactly as it found it.
pub struct Solver<'a> {
    board: &'a mut Board,
    memo: Memo,
    stop: Option<Arc<AtomicBool>>,
}

impl<'a> Solver<'a> {
    pub fn new(board: &'a mut Board) -> Self {
        Self {
            board,
            memo: Memo::new(),
            stop: None,
        }
    }

    /// Checks `flag` between sibling expansions and abandons the search
    /// once it is set.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn solve(&mut self) -> Solution {
        if let Err(err) = self.board.validate() {
            warn!("rejecting board: {}", err);
            return Solution::unsearched(Status::Invalid(err));
        }
        if self.board.is_solved() {
            return Solution::unsearched(Status::Solved);
        }
        if self.board.impossible() {
            info!("board is statically impossible");
            return Solution::unsearched(Status::Impossible);
        }

        self.memo = Memo::new();
        let target = self.board.target();
        let cutoff = self.board.width() - self.board.primary().size;
        let mut previous_memo_size = 0;
        let mut max_depth = 0;

        loop {
            max_depth += 1;
            if self.stopped() {
                let depth = max_depth - 1;
                return Solution::searched(Status::Cancelled, Vec::new(), depth, &self.memo);
            }

            let stop = self.stop.as_deref();
            let mut search = Search::new(&mut self.memo, target, max_depth, stop);

            if search.run(self.board, 0) {
                let solution =
                    Solution::searched(Status::Solved, search.path, max_depth, &self.memo);
                info!("{}", solution);
                return solution;
            }
            if search.stopped {
                let solution =
                    Solution::searched(Status::Cancelled, Vec::new(), max_depth, &self.memo);
                info!("{}", solution);
                return solution;
            }

            let memo_size = self.memo.len();
            debug!(
                "depth {} exhausted: memo {}, hits {}",
                max_depth,
                memo_size,
                self.memo.hits()
            );
            if max_depth > cutoff && memo_size == previous_memo_size {
                let solution =
                    Solution::searched(Status::Unsolvable, Vec::new(), max_depth, &self.memo);
                info!("{}", solution);
                return solution;
            }
            previous_memo_size = memo_size;
        }
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Solves `board` with a fresh [`Solver`].
pub fn solve(board: &mut Board) -> Solution {
    Solver::new(board).solve()
}

/// Scratch for one deepening iteration: the winning path and one reusable
/// move buffer per depth.
struct Search<'s> {
    memo: &'s mut Memo,
    target: usize,
    max_depth: usize,
    path: Vec<Move>,
    moves: Vec<Vec<Move>>,
    stop: Option<&'s AtomicBool>,
    stopped: bool,
}

impl<'s> Search<'s> {
    fn new(
        memo: &'s mut Memo,
        target: usize,
        max_depth: usize,
        stop: Option<&'s AtomicBool>,
    ) -> Self {
        Self {
            memo,
            target,
            max_depth,
            path: vec![Move::default(); max_depth],
            moves: vec![Vec::new(); max_depth],
            stop,
            stopped: false,
        }
    }

    fn run(&mut self, board: &mut Board, depth: usize) -> bool {
        let height = self.max_depth - depth;
        if height == 0 {
            return board.primary().position == self.target;
        }
        if !self.memo.add(board.memo_key(), height) {
            return false;
        }
        if lower_bound(board, self.target) >= height {
            return false;
        }

        let mut moves = std::mem::take(&mut self.moves[depth]);
        board.moves(&mut moves);

        let mut solved = false;
        for &mv in &moves {
            if self.should_stop() {
                break;
            }
            let mut applied = board.apply(mv);
            if self.run(&mut applied, depth + 1) {
                self.path[depth] = mv;
                solved = true;
                break;
            }
        }

        self.moves[depth] = moves;
        solved
    }

    fn should_stop(&mut self) -> bool {
        if !self.stopped {
            if let Some(flag) = self.stop {
                self.stopped = flag.load(Ordering::Relaxed);
            }
        }
        self.stopped
    }
}

/// Every occupied cell between the primary piece and its target has to be
/// cleared by at least one move.
fn lower_bound(board: &Board, target: usize) -> usize {
    let primary = board.primary();
    (primary.position + primary.size..target + primary.size)
        .filter(|&cell| board.is_occupied(cell))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Orientation;

    fn blocked() -> Board {
        let mut board = Board::new(6, 6);
        board.add_piece(12, 2, Orientation::Horizontal);
        board.add_piece(15, 2, Orientation::Vertical);
        board
    }

    #[test]
    fn already_solved() {
        let mut board = Board::new(6, 6);
        board.add_piece(16, 2, Orientation::Horizontal);
        let solution = solve(&mut board);
        assert!(solution.solvable());
        assert!(solution.moves.is_empty());
        assert_eq!(solution.num_steps, 0);
        assert_eq!(solution.depth, 0);
    }

    #[test]
    fn clears_single_blocker() {
        let mut board = blocked();
        let solution = solve(&mut board);
        assert_eq!(solution.status, Status::Solved);
        assert_eq!(solution.moves, vec![Move::new(1, -2), Move::new(0, 4)]);
        assert_eq!(solution.num_moves, 2);
        assert_eq!(solution.num_steps, 6);
        assert_eq!(solution.depth, 2);
        assert!(solution.memo_size > 0);
    }

    #[test]
    fn leaves_board_untouched() {
        let mut board = blocked();
        let key = board.memo_key();
        let pieces = board.pieces().to_vec();
        solve(&mut board);
        assert_eq!(board.memo_key(), key);
        assert_eq!(board.pieces(), &pieces[..]);
    }

    #[test]
    fn invalid_board_is_not_searched() {
        let mut board = Board::new(6, 6);
        let solution = solve(&mut board);
        assert_eq!(solution.status, Status::Invalid(BoardError::NoPrimary));
        assert_eq!(solution.depth, 0);
        assert_eq!(solution.memo_size, 0);
    }

    #[test]
    fn impossible_board_is_not_searched() {
        let mut board = blocked();
        board.add_wall(17);
        let solution = solve(&mut board);
        assert_eq!(solution.status, Status::Impossible);
        assert_eq!(solution.memo_size, 0);
    }

    #[test]
    fn immovable_wall_of_pieces_terminates() {
        let mut board = Board::new(6, 6);
        board.add_piece(12, 2, Orientation::Horizontal);
        board.add_piece(4, 6, Orientation::Vertical);
        let solution = solve(&mut board);
        assert_eq!(solution.status, Status::Unsolvable);
        assert!(!solution.solvable());
        assert!(solution.depth > board.width() - 2);
        assert!(solution.memo_size > 0);
    }

    #[test]
    fn raised_stop_flag_cancels() {
        let mut board = blocked();
        let flag = Arc::new(AtomicBool::new(true));
        let solution = Solver::new(&mut board).with_stop_flag(flag).solve();
        assert_eq!(solution.status, Status::Cancelled);
        assert_eq!(solution.depth, 0);
        assert_eq!(solution.memo_size, 0);
    }

    #[test]
    fn lower_bound_counts_cells_in_the_lane() {
        let board = blocked();
        assert_eq!(lower_bound(&board, board.target()), 1);

        let mut open = Board::new(6, 6);
        open.add_piece(12, 2, Orientation::Horizontal);
        assert_eq!(lower_bound(&open, open.target()), 0);
    }

    #[test]
    fn display_summarises_outcome() {
        let mut board = blocked();
        let solution = solve(&mut board);
        assert!(solution.to_string().starts_with("solved in 2 moves (6 steps)"));
        assert_eq!(
            Solution::unsearched(Status::Impossible).to_string(),
            "impossible board"
        );
    }
}

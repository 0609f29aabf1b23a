//! Optimal solver for "Rush Hour" style sliding-block puzzles.
//!
//! [`Solver`] runs an iterative-deepening depth-first search over a
//! mutable [`Board`], pruning with a transposition [`Memo`] and a lower
//! bound on the moves still needed to clear the primary piece's lane.

pub mod board;
pub mod memo;
pub mod solver;

pub use board::{Applied, Board, BoardError, Move, Orientation, Piece};
pub use memo::Memo;
pub use solver::{solve, Solution, Solver, Status};

//! Army Battle - deterministic battle resolution for grid-based strategy games

pub mod battle;
pub mod core;

//! Laneboard core: flat-file lane and task tables plus the board service
//! that keeps them consistent.

pub mod board;
pub mod codec;
pub mod storage;
pub mod types;

// Tune image storage
pub mod byte_arena;

pub use byte_arena::{ArenaError, ByteArena};

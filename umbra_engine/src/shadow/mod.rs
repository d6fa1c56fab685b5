/// Cascaded shadow maps

pub mod cascade;

pub use cascade::*;

/// Screen-space ambient occlusion sampling data

pub mod kernel;

pub use kernel::*;

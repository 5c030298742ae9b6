pub mod plate_generator;

pub use plate_generator::*;

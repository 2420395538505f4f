pub mod path;

mod pointee;
mod types;

pub use types::*;

mod chunk;
mod citation;
mod claim;
mod consistency;
mod input;
mod verdict;

pub use chunk::*;
pub use citation::*;
pub use claim::*;
pub use consistency::*;
pub use input::*;
pub use verdict::*;

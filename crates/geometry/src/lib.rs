pub mod generate;
pub mod merge;
pub mod mesh;
pub mod options;
pub mod ring;
pub mod walker;

pub use generate::*;
pub use merge::*;
pub use mesh::*;
pub use options::*;
pub use ring::*;
pub use walker::*;

pub mod arena;
pub mod checker;
pub mod error;
pub mod export;
pub mod model;
pub mod tree;

pub use error::TreeError;
pub use model::*;
pub use tree::FileTree;

mod block_store;
mod file_manager;

pub use block_store::*;
pub use file_manager::*;

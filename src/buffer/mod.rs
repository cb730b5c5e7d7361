mod buffer_handle;
mod buffer_pool_manager;
mod frame_header;

pub use buffer_handle::*;
pub use buffer_pool_manager::*;
pub use frame_header::*;

mod gc_handle;
mod heap;

pub use gc_handle::GcHandle;
pub use heap::{GcRoots, Heap};

mod lock;
mod priority_mutex;

pub use lock::{Guard, PriorityLock};
pub use priority_mutex::{Priority, PriorityGuard, PriorityMutex};

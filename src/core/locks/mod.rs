//! Library-native lock types: tracked locks usable by host code and tests
//! without going through the interposer.

pub(crate) mod raw;

pub mod mutex;
pub use mutex::Mutex;

pub mod spinlock;
pub use spinlock::SpinLock;

/// Trait for a key-value storage engine.
///
/// Engines must be cloneable (cheaply, via `Arc`) and safe to
/// send across threads: every session works on its own clone,
/// and all clones observe the same map.
///
/// None of the operations can fail. A missing key is a normal
/// outcome, reported through the return value.
pub trait KvsEngine: Clone + Send + 'static {
    /// Sets the value of a string key to a string.
    ///
    /// If the key already exists, the previous value will be overwritten.
    fn set(&self, key: String, value: String);

    /// Gets the string value of a given string key.
    ///
    /// Returns `None` if the key does not exist.
    fn get(&self, key: &str) -> Option<String>;

    /// Removes a given key.
    ///
    /// Returns whether the key was present.
    fn remove(&self, key: &str) -> bool;
}

mod memory;

pub use self::memory::MemStore;

//! The sensor source abstraction and simple fixed/failing implementations.

use crate::error::SensorError;

/// Something that can be polled for a value of type `T`.
///
/// Implementations may be real device drivers, simulations, or test
/// doubles. A read either yields a fresh value or reports why none is
/// available; it never returns a stale value silently.
pub trait SensorSource<T>: Send {
    /// Poll the device for a new value.
    fn read(&mut self) -> Result<T, SensorError>;
}

/// A source that always returns the same value.
#[derive(Debug, Clone)]
pub struct FixedSource<T> {
    value: T,
}

impl<T> FixedSource<T> {
    /// Create a source that always yields `value`.
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send> SensorSource<T> for FixedSource<T> {
    fn read(&mut self) -> Result<T, SensorError> {
        Ok(self.value.clone())
    }
}

/// A source that always fails with [`SensorError::SourceUnavailable`].
#[derive(Debug, Clone)]
pub struct FailingSource {
    name: String,
}

impl FailingSource {
    /// Create a failing source reporting the given sensor name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<T> SensorSource<T> for FailingSource {
    fn read(&mut self) -> Result<T, SensorError> {
        Err(SensorError::unavailable(&self.name, "device offline"))
    }
}

/// Adapts a closure into a [`SensorSource`].
pub struct FnSource<F> {
    read_fn: F,
}

impl<F> FnSource<F> {
    /// Wrap `read_fn`, which is called on every read.
    pub const fn new(read_fn: F) -> Self {
        Self { read_fn }
    }
}

impl<T, F> SensorSource<T> for FnSource<F>
where
    F: FnMut() -> Result<T, SensorError> + Send,
{
    fn read(&mut self) -> Result<T, SensorError> {
        (self.read_fn)()
    }
}

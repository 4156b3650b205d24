//! Release callbacks.
//!
//! A `Release<V>` is the caller's cleanup hook for one stored value. The
//! table runs it exactly once, with the value moved in, when the entry is
//! removed or the table is torn down. Dropping a `Release` without running
//! it simply drops the closure; the hook never fires implicitly.

use core::fmt;

pub struct Release<V> {
    hook: Option<Box<dyn FnOnce(V)>>,
}

impl<V> Release<V> {
    /// Wrap a cleanup closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(V) + 'static,
    {
        Self {
            hook: Some(Box::new(f)),
        }
    }

    /// A release that only drops the value.
    pub const fn noop() -> Self {
        Self { hook: None }
    }

    pub fn is_noop(&self) -> bool {
        self.hook.is_none()
    }

    /// Consume the hook, handing it `value`.
    pub fn run(self, value: V) {
        match self.hook {
            Some(f) => f(value),
            None => drop(value),
        }
    }
}

impl<V> Default for Release<V> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<V> fmt::Debug for Release<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_noop() {
            "Release(noop)"
        } else {
            "Release(hook)"
        })
    }
}

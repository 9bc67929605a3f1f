//! Mapped diagnostic context
//!
//! This module provides:
//! - `Mdc`: per-thread key-value pairs added to every record written from the thread
//! - `MdcGuard`: RAII guard for scoped entries
//!
//! Entries keep insertion order; putting an existing key replaces its value in place.

use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static MDC: RefCell<Vec<(String, String)>> = const { RefCell::new(Vec::new()) };
}

/// Access to the current thread's diagnostic context
///
/// # Example
///
/// ```
/// use rust_json_logger::core::Mdc;
///
/// Mdc::put("request_id", "abc-123");
/// {
///     let _guard = Mdc::scoped("user", "alice");
///     assert_eq!(Mdc::get("user").as_deref(), Some("alice"));
/// }
/// assert_eq!(Mdc::get("user"), None);
/// Mdc::clear();
/// ```
pub struct Mdc;

impl Mdc {
    /// Set a key, replacing any previous value
    pub fn put(key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        MDC.with(|mdc| {
            let mut entries = mdc.borrow_mut();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        });
    }

    pub fn get(key: &str) -> Option<String> {
        MDC.with(|mdc| {
            mdc.borrow()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    /// Remove a key, returning its previous value
    pub fn remove(key: &str) -> Option<String> {
        MDC.with(|mdc| {
            let mut entries = mdc.borrow_mut();
            let index = entries.iter().position(|(k, _)| k == key)?;
            Some(entries.remove(index).1)
        })
    }

    pub fn clear() {
        MDC.with(|mdc| mdc.borrow_mut().clear());
    }

    pub fn is_empty() -> bool {
        MDC.with(|mdc| mdc.borrow().is_empty())
    }

    /// Copy of all entries, in insertion order
    pub fn snapshot() -> Vec<(String, String)> {
        MDC.with(|mdc| mdc.borrow().clone())
    }

    /// Visit entries without copying them.
    ///
    /// Returns `false` without calling `f` when the context is unavailable
    /// (thread teardown).
    pub fn for_each<F>(mut f: F) -> bool
    where
        F: FnMut(&str, &str),
    {
        MDC.try_with(|mdc| match mdc.try_borrow() {
            Ok(entries) => {
                for (key, value) in entries.iter() {
                    f(key, value);
                }
                true
            }
            Err(_) => false,
        })
        .unwrap_or(false)
    }

    /// Put a key for the lifetime of the returned guard.
    ///
    /// On drop, the previous value of the key (if any) is restored.
    pub fn scoped(key: impl Into<String>, value: impl Into<String>) -> MdcGuard {
        let key = key.into();
        let previous = Self::get(&key);
        Self::put(key.clone(), value);
        MdcGuard {
            key,
            previous,
            _not_send: PhantomData,
        }
    }
}

/// RAII guard for a scoped MDC entry
///
/// Not `Send`: it must be dropped on the thread whose context it changed.
pub struct MdcGuard {
    key: String,
    previous: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for MdcGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => Mdc::put(self.key.clone(), previous),
            None => {
                Mdc::remove(&self.key);
            }
        }
    }
}

impl MdcGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

//! Tagged result for best-effort components

/// Result of a component that never raises
///
/// `Fallback` carries the reason the component could not produce a value;
/// the caller decides what safe value to substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    Fallback(String),
}

impl<T> Outcome<T> {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Outcome::Fallback(reason.into())
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Fallback(_) => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.ok().unwrap_or(default)
    }

    /// Substitute a value computed from the fallback reason
    pub fn unwrap_or_else(self, f: impl FnOnce(&str) -> T) -> T {
        match self {
            Outcome::Ok(value) => value,
            Outcome::Fallback(reason) => f(&reason),
        }
    }
}

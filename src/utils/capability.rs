//! Host capability detection
//!
//! Capture, playback and local speech are optional on a given host. Each one
//! is probed once at startup and carried around as a [`Capability`].

/// A host facility that is either present (with a handle to drive it) or not.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Available(T),
    Unavailable,
}

impl<T> Capability<T> {
    /// Wrap the result of a startup probe.
    pub fn from_option(handle: Option<T>) -> Self {
        match handle {
            Some(handle) => Capability::Available(handle),
            None => Capability::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn as_ref(&self) -> Capability<&T> {
        match self {
            Capability::Available(handle) => Capability::Available(handle),
            Capability::Unavailable => Capability::Unavailable,
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Capability::Available(handle) => Some(handle),
            Capability::Unavailable => None,
        }
    }
}

impl<T> Default for Capability<T> {
    fn default() -> Self {
        Capability::Unavailable
    }
}

impl<T> From<Option<T>> for Capability<T> {
    fn from(handle: Option<T>) -> Self {
        Capability::from_option(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        let present: Capability<u8> = Some(3).into();
        let absent: Capability<u8> = None.into();
        assert!(present.is_available());
        assert_eq!(present.available(), Some(&3));
        assert!(!absent.is_available());
        assert!(absent.available().is_none());
    }

    #[test]
    fn test_default_is_unavailable() {
        let cap: Capability<String> = Capability::default();
        assert!(!cap.is_available());
    }
}

use std::{error::Error, fmt};

/// An error raised when a run ends, see
/// [`EventLifecycle::at_sim_end`](crate::runtime::EventLifecycle::at_sim_end).
///
/// Any error type converts into it, so lifecycle hooks can use `?`.
#[derive(Debug)]
pub struct RuntimeError(Box<dyn Error + Send + Sync + 'static>);

impl RuntimeError {
    /// The error raised by the hook, if it is an `E`.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.0
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulation failed: {}", self.0)
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for RuntimeError {
    fn from(err: E) -> Self {
        RuntimeError(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn keeps_the_hook_error() {
        let err = RuntimeError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.to_string(), "simulation failed: disk full");
        assert_eq!(
            err.downcast_ref::<io::Error>().map(io::Error::kind),
            Some(io::ErrorKind::Other)
        );
        assert!(err.downcast_ref::<fmt::Error>().is_none());
    }
}

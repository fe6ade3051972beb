//! ErrorCollector - folds zero or more errors into one optional error

use crate::error::DispatcherError;

/// Accumulates errors from concurrent strategy runs
///
/// `finish` yields `Ok` for no errors, the error itself for exactly one,
/// and `DispatcherError::Multiple` otherwise.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<DispatcherError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error; nested `Multiple` errors are flattened
    pub fn push(&mut self, error: impl Into<DispatcherError>) {
        self.errors.extend(error.into().into_errors());
    }

    /// Keep the value of a result, or collect its error
    pub fn record<T, E>(&mut self, result: Result<T, E>) -> Option<T>
    where
        E: Into<DispatcherError>,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(mut self) -> Result<(), DispatcherError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(DispatcherError::Multiple(self.errors)),
        }
    }
}

impl Extend<DispatcherError> for ErrorCollector {
    fn extend<I: IntoIterator<Item = DispatcherError>>(&mut self, iter: I) {
        for error in iter {
            self.push(error);
        }
    }
}

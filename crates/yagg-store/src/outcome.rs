//! Outcomes of store operations.

use crate::error::StoreError;

/// How a store operation settled.
///
/// A `Failed` error has already been shown to the user; it is returned for
/// inspection only.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    /// Nothing to do: no repository, a load already in flight, or the
    /// response belonged to a view or session that has since changed.
    Skipped,
    /// The user refused the confirmation prompt.
    Declined,
    Failed(StoreError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Done(value) => Outcome::Done(f(value)),
            Self::Skipped => Outcome::Skipped,
            Self::Declined => Outcome::Declined,
            Self::Failed(err) => Outcome::Failed(err),
        }
    }
}

impl<T> From<StoreError> for Outcome<T> {
    fn from(err: StoreError) -> Self {
        Self::Failed(err)
    }
}

//! Marker values that separate "not provided" from "explicitly empty".

/// Value that may have been left out by the caller entirely.
///
/// Client defaults are substituted only for [`NotGivenOr::NotGiven`]. An
/// explicit `Given(0)`, `Given(String::new())` or `Given(None)` is kept as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotGivenOr<T> {
    #[default]
    NotGiven,
    Given(T),
}

impl<T> NotGivenOr<T> {
    pub fn is_given(&self) -> bool {
        matches!(self, Self::Given(_))
    }

    pub fn given(&self) -> Option<&T> {
        match self {
            Self::Given(value) => Some(value),
            Self::NotGiven => None,
        }
    }

    /// Returns the given value, or `default` when nothing was given.
    pub fn or(self, default: T) -> T {
        match self {
            Self::Given(value) => value,
            Self::NotGiven => default,
        }
    }
}

impl<T> From<T> for NotGivenOr<T> {
    fn from(value: T) -> Self {
        Self::Given(value)
    }
}

/// Header or query value that can force removal of a key during merging.
///
/// `Omit` beats both call-level and default values for the same key.
#[derive(Clone, Debug, PartialEq)]
pub enum Omittable<T> {
    Value(T),
    Omit,
}

impl<T> Omittable<T> {
    pub fn is_omit(&self) -> bool {
        matches!(self, Self::Omit)
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Omit => None,
        }
    }
}

impl From<&str> for Omittable<String> {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

impl From<String> for Omittable<String> {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

use std::{fmt, marker::PhantomData, str::FromStr};

/// Generic serde visitor for types that deserialize from their `FromStr` impl.
pub struct FromStrVisitor<T>(PhantomData<T>);

impl<T> FromStrVisitor<T> {
    /// Create a new visitor.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrVisitor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromStr> serde::de::Visitor<'_> for FromStrVisitor<T>
where
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a valid string")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        T::from_str(v).map_err(serde::de::Error::custom)
    }
}

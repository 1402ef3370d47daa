use std::fmt;

/// A chess platform handle in its canonical lookup form.
///
/// Providers treat handles case-insensitively, so two submissions of
/// "MagnusCarlsen" and "magnuscarlsen" must hit the same cache entry and
/// collapse into a single opponent record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChessHandle(String);

impl ChessHandle {
    /// Trims surrounding whitespace and lowercases the handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use storage::models::ChessHandle;
    ///
    /// let a = ChessHandle::new("  Hikaru ");
    /// let b = ChessHandle::new("hikaru");
    ///
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "hikaru");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ChessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChessHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

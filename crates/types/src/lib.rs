//! Validated text primitives shared across the referral crates.

/// Errors from constructing validated text values.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input was empty or contained only whitespace.
    #[error("text cannot be empty")]
    Empty,
}

/// A string guaranteed to hold at least one non-whitespace character.
///
/// Input is trimmed on construction. Used wherever the domain demands a mandatory
/// free-text value, most importantly the refer-back reason: a referred-back
/// appointment must always carry a non-empty note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trim the input and wrap it; empty or whitespace-only input is rejected.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

// Deserialization runs the same validation as `new`, so a wire value can never
// smuggle in an empty reason.
impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_non_empty_input() {
        let text = NonEmptyText::new("  follow-up needed  ").expect("valid text");
        assert_eq!(text.as_str(), "follow-up needed");
    }

    #[test]
    fn rejects_empty_and_whitespace_only_input() {
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new("   \t"), Err(TextError::Empty)));
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: NonEmptyText = serde_json::from_str("\"reason\"").expect("valid");
        assert_eq!(ok.as_str(), "reason");

        let err = serde_json::from_str::<NonEmptyText>("\" \"");
        assert!(err.is_err());
    }
}

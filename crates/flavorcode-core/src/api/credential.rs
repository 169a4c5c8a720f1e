use std::fmt;

/// Bearer token for the Flavortown API. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` when the value is empty after trimming
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_rejected() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new(" \n\t").is_none());
    }

    #[test]
    fn test_value_is_trimmed_and_redacted() {
        let cred = Credential::new("  ft_secret\n").unwrap();
        assert_eq!(cred.expose(), "ft_secret");
        assert_eq!(format!("{:?}", cred), "Credential(***)");
    }
}

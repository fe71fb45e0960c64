//! Named lookups usable inside references
//!
//! `${base64:text}`, `${readFile:/path}` and friends transform their argument
//! instead of asking the secret sources. `${secret:key}` is the explicit form
//! of a plain provider reveal.

use crate::error::{SecretError, SourceError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Built-in lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Reveal the argument through the secret sources
    Secret,
    /// Base64-encode the argument
    Base64,
    /// Base64-decode the argument as UTF-8 text
    DecodeBase64,
    /// Read the file named by the argument
    File,
    /// Read the file named by the argument, base64-encoded
    FileBase64,
    /// Trim surrounding whitespace
    Trim,
}

impl Lookup {
    /// Resolve a lookup by name, case-insensitively
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "secret" => Some(Self::Secret),
            "base64" => Some(Self::Base64),
            "decodebase64" => Some(Self::DecodeBase64),
            "file" | "readfile" => Some(Self::File),
            "filebase64" | "readfilebase64" => Some(Self::FileBase64),
            "trim" => Some(Self::Trim),
            _ => None,
        }
    }

    /// Canonical name for diagnostics
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Base64 => "base64",
            Self::DecodeBase64 => "decodeBase64",
            Self::File => "readFile",
            Self::FileBase64 => "fileBase64",
            Self::Trim => "trim",
        }
    }

    /// Apply a transforming lookup to its argument
    ///
    /// [`Lookup::Secret`] needs the provider chain and is handled by the
    /// resolver; here it is the identity.
    ///
    /// # Errors
    /// - `SecretError::Source` if a file lookup cannot read its file
    /// - `SecretError::Lookup` if base64 decoding fails
    pub fn apply(self, argument: &str, reference: &str) -> Result<String, SecretError> {
        match self {
            Self::Secret => Ok(argument.to_string()),
            Self::Base64 => Ok(STANDARD.encode(argument.as_bytes())),
            Self::DecodeBase64 => {
                let bytes = STANDARD
                    .decode(argument.trim())
                    .map_err(|e| self.failure(e.to_string()))?;
                String::from_utf8(bytes).map_err(|e| self.failure(e.to_string()))
            }
            Self::File => std::fs::read_to_string(argument).map_err(|e| self.io(argument, reference, e)),
            Self::FileBase64 => std::fs::read(argument)
                .map(|bytes| STANDARD.encode(bytes))
                .map_err(|e| self.io(argument, reference, e)),
            Self::Trim => Ok(argument.trim().to_string()),
        }
    }

    fn failure(self, reason: String) -> SecretError {
        SecretError::Lookup {
            lookup: self.name(),
            reason,
        }
    }

    fn io(self, path: &str, reference: &str, source: std::io::Error) -> SecretError {
        SecretError::Source {
            source_name: self.name().to_string(),
            reference: reference.to_string(),
            source: SourceError::io_error(path, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_names_are_case_insensitive() {
        assert_eq!(Lookup::from_name("SECRET"), Some(Lookup::Secret));
        assert_eq!(Lookup::from_name("decodeBase64"), Some(Lookup::DecodeBase64));
        assert_eq!(Lookup::from_name("readFile"), Some(Lookup::File));
        assert_eq!(Lookup::from_name("vault"), None);
    }

    #[test]
    fn base64_roundtrip() {
        let encoded = Lookup::Base64.apply("hunter2", "${base64:hunter2}").unwrap();
        assert_eq!(encoded, "aHVudGVyMg==");
        let decoded = Lookup::DecodeBase64.apply(&encoded, "${decodeBase64:...}").unwrap();
        assert_eq!(decoded, "hunter2");
    }

    #[test]
    fn decode_base64_rejects_garbage() {
        let err = Lookup::DecodeBase64.apply("***", "${decodeBase64:***}").unwrap_err();
        assert!(matches!(err, SecretError::Lookup { lookup: "decodeBase64", .. }));
    }

    #[test]
    fn file_lookup_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        std::fs::write(&path, "-----BEGIN-----").unwrap();
        let path = path.to_string_lossy().into_owned();

        assert_eq!(Lookup::File.apply(&path, "${readFile:...}").unwrap(), "-----BEGIN-----");
        assert_eq!(
            Lookup::FileBase64.apply(&path, "${fileBase64:...}").unwrap(),
            "LS0tLS1CRUdJTi0tLS0t"
        );
    }

    #[test]
    fn file_lookup_missing_file_is_source_failure() {
        let err = Lookup::File
            .apply("/definitely/not/here.pem", "${readFile:/definitely/not/here.pem}")
            .unwrap_err();
        assert!(err.is_source_failure());
        assert_eq!(err.reference(), Some("${readFile:/definitely/not/here.pem}"));
    }

    #[test]
    fn trim_lookup() {
        assert_eq!(Lookup::Trim.apply("  padded \n", "${trim:...}").unwrap(), "padded");
    }
}

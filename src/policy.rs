use serde::{Deserialize, Serialize};

/// Expected bytes at a fixed offset, e.g. the `TFL3` file identifier that
/// FlatBuffers-based TFLite models carry at offset 4.
///
/// In a manifest the bytes are written either as text (`bytes = "TFL3"`) or,
/// for signatures that are not valid UTF-8, as hex (`hex = "89504E47"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MagicSpec", into = "MagicSpec")]
pub struct MagicCheck {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MagicCheck {
    pub fn matches(&self, payload: &[u8]) -> bool {
        let Some(end) = self.offset.checked_add(self.bytes.len()) else { return false };
        payload.get(self.offset..end).is_some_and(|window| window == self.bytes.as_slice())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MagicSpec {
    #[serde(default)]
    offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
}

impl TryFrom<MagicSpec> for MagicCheck {
    type Error = String;

    fn try_from(spec: MagicSpec) -> Result<Self, Self::Error> {
        let bytes = match (spec.bytes, spec.hex) {
            (Some(text), None) => text.into_bytes(),
            (None, Some(digits)) => hex::decode(digits.trim()).map_err(|e| format!("invalid magic hex: {e}"))?,
            (Some(_), Some(_)) => return Err("magic takes either `bytes` or `hex`, not both".into()),
            (None, None) => return Err("magic needs `bytes` or `hex`".into()),
        };
        if bytes.is_empty() {
            return Err("magic bytes must not be empty".into());
        }
        Ok(Self { offset: spec.offset, bytes })
    }
}

impl From<MagicCheck> for MagicSpec {
    fn from(magic: MagicCheck) -> Self {
        Self { offset: magic.offset, bytes: None, hex: Some(hex::encode_upper(magic.bytes)) }
    }
}

/// Decides whether a downloaded payload is a plausible artifact.
///
/// The size rule is strict: a payload of exactly `min_bytes` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub min_bytes: u64,
    /// Allowed `Content-Type` essences. Empty means any; an undeclared type always passes.
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub magic: Option<MagicCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    TooSmall { observed: u64, threshold: u64 },
    ContentType(String),
    MagicMismatch,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool { matches!(self, Verdict::Accepted) }
}

impl Default for AcceptancePolicy {
    fn default() -> Self { Self::min_size(500_000) }
}

impl AcceptancePolicy {
    pub fn min_size(min_bytes: u64) -> Self { Self { min_bytes, content_types: Vec::new(), magic: None } }

    pub fn with_magic(mut self, offset: usize, bytes: impl AsRef<[u8]>) -> Self {
        self.magic = Some(MagicCheck { offset, bytes: bytes.as_ref().to_vec() });
        self
    }

    pub fn with_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn evaluate(&self, payload: &[u8], content_type: Option<&str>) -> Verdict {
        let observed = payload.len() as u64;
        if observed <= self.min_bytes {
            return Verdict::TooSmall { observed, threshold: self.min_bytes };
        }
        if let Some(declared) = content_type {
            // Compare the essence only: "application/octet-stream; charset=binary" -> "application/octet-stream".
            let essence = declared.split(';').next().unwrap_or("").trim();
            if !self.content_types.is_empty() && !self.content_types.iter().any(|t| t.eq_ignore_ascii_case(essence)) {
                return Verdict::ContentType(essence.to_string());
            }
        }
        match &self.magic {
            Some(magic) if !magic.matches(payload) => Verdict::MagicMismatch,
            _ => Verdict::Accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        let policy = AcceptancePolicy::min_size(10);
        assert_eq!(policy.evaluate(&[0u8; 10], None), Verdict::TooSmall { observed: 10, threshold: 10 });
        assert!(policy.evaluate(&[0u8; 11], None).is_accepted());
        assert!(!policy.evaluate(&[], None).is_accepted());
    }

    #[test]
    fn content_type_allow_list_ignores_parameters() {
        let policy = AcceptancePolicy::min_size(0).with_content_types(["application/octet-stream"]);
        assert!(policy.evaluate(b"x", Some("application/octet-stream; charset=binary")).is_accepted());
        assert!(policy.evaluate(b"x", None).is_accepted());
        assert_eq!(policy.evaluate(b"x", Some("text/html")), Verdict::ContentType("text/html".into()));
    }

    #[test]
    fn magic_bytes_at_offset() {
        let policy = AcceptancePolicy::min_size(4).with_magic(4, "TFL3");
        assert!(policy.evaluate(b"\x1c\0\0\0TFL3rest", None).is_accepted());
        assert_eq!(policy.evaluate(b"<html><body>", None), Verdict::MagicMismatch);
        // Too short to hold the identifier at all.
        assert_eq!(AcceptancePolicy::min_size(0).with_magic(4, "TFL3").evaluate(b"abcdTF", None), Verdict::MagicMismatch);
    }

    #[test]
    fn binary_magic_and_extreme_offset() {
        let png = AcceptancePolicy::min_size(0).with_magic(0, b"\x89PNG");
        assert!(png.evaluate(b"\x89PNG\r\n\x1a\n", None).is_accepted());
        assert_eq!(png.evaluate(b"PNG", None), Verdict::MagicMismatch);

        let far = AcceptancePolicy::min_size(0).with_magic(usize::MAX, "x");
        assert_eq!(far.evaluate(b"xxxx", None), Verdict::MagicMismatch);
    }

    #[test]
    fn magic_from_text_or_hex() {
        let text: MagicCheck = toml::from_str("offset = 4\nbytes = \"TFL3\"").unwrap();
        assert_eq!(text, MagicCheck { offset: 4, bytes: b"TFL3".to_vec() });

        let binary: MagicCheck = toml::from_str(r#"hex = "89504e47""#).unwrap();
        assert_eq!(binary, MagicCheck { offset: 0, bytes: vec![0x89, b'P', b'N', b'G'] });

        assert!(toml::from_str::<MagicCheck>(r#"hex = "zz""#).is_err());
        assert!(toml::from_str::<MagicCheck>("bytes = \"a\"\nhex = \"61\"").is_err());
        assert!(toml::from_str::<MagicCheck>("offset = 2").is_err());
    }
}

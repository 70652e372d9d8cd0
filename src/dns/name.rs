use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::WireError;

/// Maximum length of a name in wire form, including the root label.
pub const MAX_NAME_WIRE_LEN: usize = 255;
/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

/// A validated domain name.
///
/// Stored as the ordered label sequence (left to right, root label omitted),
/// with the original case preserved for display. Comparisons, hashing and the
/// canonical wire encoding are case-insensitive per RFC 4034: two names that
/// differ only in ASCII case are equal, and `canonical_cmp` orders names by
/// their case-folded labels starting from the root-most label.
///
/// Invariants: at most 255 octets in wire form, each label 1..=63 octets of
/// printable ASCII. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    /// The root name, `.`.
    pub fn root() -> Self {
        Name { labels: Vec::new() }
    }

    pub(crate) fn from_labels(labels: Vec<String>) -> Result<Self, WireError> {
        let mut wire_len = 1;
        for label in &labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(WireError::InvalidLabel);
            }
            if !label.bytes().all(|b| b.is_ascii_graphic()) {
                return Err(WireError::InvalidLabel);
            }
            wire_len += 1 + label.len();
        }
        if wire_len > MAX_NAME_WIRE_LEN {
            return Err(WireError::InvalidName);
        }
        Ok(Name { labels })
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of labels, not counting the root label.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// The labels left to right, root label omitted.
    pub fn labels(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.labels.iter().map(|l| l.as_str())
    }

    /// The left-most label, if any.
    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(|l| l.as_str())
    }

    /// Length of this name in (uncompressed) wire form.
    pub fn wire_len(&self) -> usize {
        1 + self.labels.iter().map(|l| 1 + l.len()).sum::<usize>()
    }

    /// The name with the left-most label removed; `None` for the root.
    pub fn parent(&self) -> Option<Name> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Name { labels: self.labels[1..].to_vec() })
        }
    }

    /// The right-most `count` labels of this name.
    ///
    /// # Panics
    /// Panics if `count` exceeds the label count.
    pub fn suffix(&self, count: usize) -> Name {
        assert!(count <= self.labels.len());
        Name { labels: self.labels[self.labels.len() - count..].to_vec() }
    }

    /// Whether `other` is equal to this name or lies below it in the tree.
    pub fn encloses(&self, other: &Name) -> bool {
        other.labels.len() >= self.labels.len()
            && self
                .labels
                .iter()
                .rev()
                .zip(other.labels.iter().rev())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Rewrites the `old` suffix of this name to `new`, as DNAME substitution
    /// requires. Fails if the result would exceed the name length limits.
    pub fn replace_suffix(&self, old: &Name, new: &Name) -> Result<Name, WireError> {
        if !old.encloses(self) {
            return Err(WireError::InvalidName);
        }
        let keep = self.labels.len() - old.labels.len();
        let mut labels = self.labels[..keep].to_vec();
        labels.extend(new.labels.iter().cloned());
        Name::from_labels(labels)
    }

    /// DNSSEC canonical ordering (RFC 4034 §6.1): compare label by label from
    /// the root-most label inward, case-folded, with an absent label sorting
    /// before any present one.
    pub fn canonical_cmp(&self, other: &Name) -> Ordering {
        let common = self.labels.len().min(other.labels.len());
        for i in 1..=common {
            let a = self.labels[self.labels.len() - i].as_bytes();
            let b = other.labels[other.labels.len() - i].as_bytes();
            match cmp_label(a, b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }

    /// Appends the canonical (lowercase, uncompressed) wire encoding.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend(label.bytes().map(|b| b.to_ascii_lowercase()));
        }
        out.push(0);
    }
}

fn cmp_label(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    a.len().cmp(&b.len())
}

impl TryFrom<&str> for Name {
    type Error = WireError;

    /// Parses a dotted, fully-qualified name. The trailing dot is required;
    /// `.` is the root.
    fn try_from(s: &str) -> Result<Name, WireError> {
        if s == "." {
            return Ok(Name::root());
        }
        let stripped = s.strip_suffix('.').ok_or(WireError::InvalidName)?;
        if stripped.is_empty() {
            return Err(WireError::InvalidName);
        }
        Name::from_labels(stripped.split('.').map(str::to_owned).collect())
    }
}

impl TryFrom<String> for Name {
    type Error = WireError;
    fn try_from(s: String) -> Result<Name, WireError> {
        Name::try_from(s.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }
        for label in &self.labels {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Name) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}
impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            for b in label.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(0);
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Name) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Name {
    fn cmp(&self, other: &Name) -> Ordering {
        self.canonical_cmp(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::try_from(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(name(".").to_string(), ".");
        assert_eq!(name("example.com.").to_string(), "example.com.");
        assert_eq!(name("Example.COM.").label_count(), 2);
        assert!(Name::try_from("example.com").is_err()); // no trailing dot
        assert!(Name::try_from("a..com.").is_err());
        assert!(Name::try_from("").is_err());
    }

    #[test]
    fn test_length_limits() {
        let long_label = "a".repeat(64);
        assert!(Name::try_from(format!("{long_label}.com.").as_str()).is_err());
        let ok_label = "a".repeat(63);
        assert!(Name::try_from(format!("{ok_label}.com.").as_str()).is_ok());
        // 4 * (63 + 1) + 1 = 257 > 255
        let too_long = format!("{0}.{0}.{0}.{0}.", ok_label);
        assert!(Name::try_from(too_long.as_str()).is_err());
    }

    #[test]
    fn test_case_insensitive_eq() {
        assert_eq!(name("Example.COM."), name("example.com."));
        assert_ne!(name("example.org."), name("example.com."));
    }

    #[test]
    fn test_canonical_ordering() {
        // The ordering example from RFC 4034 §6.1.
        let ordered = [
            name("example."),
            name("a.example."),
            name("yljkjljk.a.example."),
            name("Z.a.example."),
            name("zABC.a.EXAMPLE."),
            name("z.example."),
            name("*.z.example."),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].canonical_cmp(&pair[1]), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_encloses() {
        assert!(name(".").encloses(&name("example.com.")));
        assert!(name("com.").encloses(&name("example.com.")));
        assert!(name("example.com.").encloses(&name("example.com.")));
        assert!(!name("example.com.").encloses(&name("com.")));
        assert!(!name("ample.com.").encloses(&name("example.com.")));
    }

    #[test]
    fn test_suffix_and_replace() {
        let n = name("a.b.example.com.");
        assert_eq!(n.suffix(2), name("example.com."));
        assert_eq!(n.parent().unwrap(), name("b.example.com."));
        let moved = n.replace_suffix(&name("example.com."), &name("example.net.")).unwrap();
        assert_eq!(moved, name("a.b.example.net."));
    }

    #[test]
    fn test_canonical_wire_form() {
        let mut out = Vec::new();
        name("Foo.Example.").write_canonical(&mut out);
        assert_eq!(out, b"\x03foo\x07example\x00");
        out.clear();
        name(".").write_canonical(&mut out);
        assert_eq!(out, b"\x00");
    }
}

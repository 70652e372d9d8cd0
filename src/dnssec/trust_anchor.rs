use crate::dns::name::Name;
use crate::dns::resource::DnsKey;

use super::key_tag::calculate_key_tag;

/// An externally-supplied root of trust: either a DS digest of a zone's key
/// signing key, or the DNSKEY material itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustAnchor {
    Ds {
        zone: Name,
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    Key {
        zone: Name,
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Vec<u8>,
    },
}

impl TrustAnchor {
    pub fn ds(zone: Name, key_tag: u16, algorithm: u8, digest_type: u8, digest: Vec<u8>) -> Self {
        TrustAnchor::Ds { zone, key_tag, algorithm, digest_type, digest }
    }

    pub fn key(zone: Name, flags: u16, protocol: u8, algorithm: u8, public_key: Vec<u8>) -> Self {
        TrustAnchor::Key { zone, flags, protocol, algorithm, public_key }
    }

    pub fn zone(&self) -> &Name {
        match self {
            TrustAnchor::Ds { zone, .. } | TrustAnchor::Key { zone, .. } => zone,
        }
    }

    pub fn key_tag(&self) -> u16 {
        match self {
            TrustAnchor::Ds { key_tag, .. } => *key_tag,
            TrustAnchor::Key { flags, protocol, algorithm, public_key, .. } => {
                calculate_key_tag(*flags, *protocol, *algorithm, public_key)
            }
        }
    }

    /// Whether this anchor directly designates the given DNSKEY RDATA. For
    /// DS anchors the digest comparison happens in the verifier, which has
    /// the canonical owner name in hand; this only covers the `Key` form.
    pub fn is_key(&self, key: &DnsKey) -> bool {
        match self {
            TrustAnchor::Key { flags, protocol, algorithm, public_key, .. } => {
                *flags == key.flags
                    && *protocol == key.protocol
                    && *algorithm == key.algorithm
                    && *public_key == key.public_key
            }
            TrustAnchor::Ds { .. } => false,
        }
    }
}

/// An immutable set of trust anchors, fixed for the verifier's lifetime.
///
/// During key rollovers a zone legitimately has several simultaneously valid
/// anchors; all anchors for a zone are tried until one designates a key that
/// verifies.
#[derive(Debug, Clone)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorSet {
    pub fn new(anchors: Vec<TrustAnchor>) -> Self {
        TrustAnchorSet { anchors }
    }

    /// The published IANA root key-signing-key anchors, DS form, as listed
    /// at <https://data.iana.org/root-anchors/root-anchors.xml>.
    pub fn root() -> Self {
        let anchors = vec![
            TrustAnchor::ds(
                Name::root(),
                19036,
                8,
                2,
                hex::decode("49AAC11D7B6F6446702E54A1607371607A1A41855200FD2CE1CDDE32F24E8FB5")
                    .unwrap(),
            ),
            TrustAnchor::ds(
                Name::root(),
                20326,
                8,
                2,
                hex::decode("E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D")
                    .unwrap(),
            ),
        ];
        TrustAnchorSet { anchors }
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchors(&self) -> &[TrustAnchor] {
        &self.anchors
    }

    /// All anchors for exactly the given zone.
    pub fn anchors_for<'a>(&'a self, zone: &'a Name) -> impl Iterator<Item = &'a TrustAnchor> {
        self.anchors.iter().filter(move |a| a.zone() == zone)
    }

    /// The deepest anchored zone enclosing `name`: where chain traversal for
    /// a query under that name starts.
    pub fn starting_zone(&self, name: &Name) -> Option<&Name> {
        self.anchors
            .iter()
            .map(TrustAnchor::zone)
            .filter(|zone| zone.encloses(name))
            .max_by_key(|zone| zone.label_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::try_from(s).unwrap()
    }

    #[test]
    fn test_root_anchor_set() {
        let set = TrustAnchorSet::root();
        assert_eq!(set.anchors().len(), 2);
        assert_eq!(set.starting_zone(&name("example.com.")), Some(&Name::root()));
        assert_eq!(set.anchors_for(&Name::root()).count(), 2);
        assert_eq!(set.anchors_for(&name("example.com.")).count(), 0);
    }

    #[test]
    fn test_deepest_anchor_wins() {
        let set = TrustAnchorSet::new(vec![
            TrustAnchor::ds(Name::root(), 1, 8, 2, vec![0; 32]),
            TrustAnchor::ds(name("example.com."), 2, 8, 2, vec![0; 32]),
        ]);
        assert_eq!(set.starting_zone(&name("www.example.com.")), Some(&name("example.com.")));
        assert_eq!(set.starting_zone(&name("example.org.")), Some(&Name::root()));
        let none = TrustAnchorSet::new(vec![TrustAnchor::ds(name("example.com."), 2, 8, 2, vec![])]);
        assert_eq!(none.starting_zone(&name("example.org.")), None);
    }

    #[test]
    fn test_key_anchor_matching() {
        let key = DnsKey { flags: 257, protocol: 3, algorithm: 8, public_key: vec![1, 2, 3, 4] };
        let anchor = TrustAnchor::key(Name::root(), 257, 3, 8, vec![1, 2, 3, 4]);
        assert!(anchor.is_key(&key));
        assert_eq!(anchor.key_tag(), key.key_tag());
        let other = DnsKey { public_key: vec![9, 9, 9, 9], ..key };
        assert!(!anchor.is_key(&other));
    }
}

use super::WireError;

/// Resource record type codes, per the IANA DNS parameters registry.
///
/// Codes this crate has no dedicated handling for round-trip through
/// `Unknown` rather than being dropped; an unknown type may well be the
/// record a proof exists to carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Ns,
    CName,
    Soa,
    Txt,
    Aaaa,
    Ds,
    Rrsig,
    Nsec,
    DnsKey,
    Nsec3,
    DName,
    Tlsa,
    Https,
    Unknown(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::CName,
            6 => RecordType::Soa,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            39 => RecordType::DName,
            43 => RecordType::Ds,
            46 => RecordType::Rrsig,
            47 => RecordType::Nsec,
            48 => RecordType::DnsKey,
            50 => RecordType::Nsec3,
            52 => RecordType::Tlsa,
            65 => RecordType::Https,
            other => RecordType::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::CName => 5,
            RecordType::Soa => 6,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::DName => 39,
            RecordType::Ds => 43,
            RecordType::Rrsig => 46,
            RecordType::Nsec => 47,
            RecordType::DnsKey => 48,
            RecordType::Nsec3 => 50,
            RecordType::Tlsa => 52,
            RecordType::Https => 65,
            RecordType::Unknown(code) => code,
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        RecordType::from_u16(value)
    }
}

/// Record classes. Proof streams only ever carry Internet-class records;
/// anything else is rejected at parse time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecordClass {
    #[default]
    In,
}

impl RecordClass {
    pub fn from_u16(value: u16) -> Result<Self, WireError> {
        match value {
            1 => Ok(RecordClass::In),
            other => Err(WireError::UnsupportedClass(other)),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::In => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_round_trip() {
        for code in [1u16, 2, 5, 6, 16, 28, 39, 43, 46, 47, 48, 50, 52, 65, 999, 65280] {
            assert_eq!(RecordType::from_u16(code).to_u16(), code);
        }
    }

    #[test]
    fn test_only_internet_class() {
        assert_eq!(RecordClass::from_u16(1), Ok(RecordClass::In));
        assert_eq!(RecordClass::from_u16(3), Err(WireError::UnsupportedClass(3)));
    }
}

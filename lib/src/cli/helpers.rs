// Copyright (c) 2026 The Chip Auth Authors

use chip_auth_core::xdr::ScAddress;

/// Fixed length hex argument
#[derive(Clone, PartialEq, Debug)]
pub struct HexData<const N: usize = 32>(pub [u8; N]);

impl<const N: usize> std::str::FromStr for HexData<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; N];

        hex::decode_to_slice(s.trim_start_matches("0x"), &mut b)?;

        Ok(HexData(b))
    }
}

impl<const N: usize> AsRef<[u8; N]> for HexData<N> {
    fn as_ref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for HexData<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Variable length hex argument
#[derive(Clone, PartialEq, Debug)]
pub struct HexBytes(pub Vec<u8>);

impl std::str::FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim_start_matches("0x")).map(HexBytes)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Address argument, `C` prefixed hex for contracts, plain hex for accounts
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Address(pub ScAddress);

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (contract, s) = match s.strip_prefix('C') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let HexData(b) = s.parse::<HexData<32>>()?;

        match contract {
            true => Ok(Address(ScAddress::Contract(b))),
            false => Ok(Address(ScAddress::Account(b))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_addresses() {
        let h = "11".repeat(32);

        assert_eq!(
            h.parse::<Address>().unwrap(),
            Address(ScAddress::Account([0x11; 32]))
        );
        assert_eq!(
            format!("C{}", h).parse::<Address>().unwrap(),
            Address(ScAddress::Contract([0x11; 32]))
        );
        assert!("C1122".parse::<Address>().is_err());
    }

    #[test]
    fn parse_hex() {
        assert_eq!("0x0102".parse::<HexBytes>().unwrap(), HexBytes(vec![1, 2]));
        assert_eq!("0102".parse::<HexData<2>>().unwrap(), HexData([1, 2]));
        assert!("010203".parse::<HexData<2>>().is_err());
    }
}

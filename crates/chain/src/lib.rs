use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
    thiserror::Error,
};

/// A chain supported by the filler, identified by its EIP-155 chain id.
///
/// The canonical wire form is `EVM-<chainId>` (e.g. `EVM-97`); this is the
/// form carried in cross-chain messages and used when hashing order
/// commitments.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChainTag {
    Evm(u64),
}

impl ChainTag {
    /// Returns the chain's EIP-155 chain id.
    pub fn id(&self) -> u64 {
        match self {
            Self::Evm(id) => *id,
        }
    }

    /// The canonical wire form, as raw bytes.
    ///
    /// Commitments hash over these bytes, so the representation must stay
    /// stable across versions.
    pub fn wire_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Evm(id) => write!(f, "EVM-{id}"),
        }
    }
}

impl FromStr for ChainTag {
    type Err = ParseChainTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('-')
            .ok_or_else(|| ParseChainTagError::Malformed(s.to_string()))?;
        match kind {
            "EVM" => {
                let id = id
                    .parse::<u64>()
                    .map_err(|_| ParseChainTagError::Malformed(s.to_string()))?;
                Ok(Self::Evm(id))
            }
            other => Err(ParseChainTagError::UnsupportedKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for ChainTag {
    type Error = ParseChainTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChainTag> for String {
    fn from(value: ChainTag) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseChainTagError {
    #[error("malformed chain tag: {0:?}")]
    Malformed(String),
    #[error("unsupported chain kind: {0:?}")]
    UnsupportedKind(String),
}

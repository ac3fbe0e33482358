use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::base32;

use super::{FromStoreDirStr, StoreDir, StoreDirDisplay};

pub const DRV_EXTENSION: &str = ".drv";

const HASH_BYTES: usize = 20;
const HASH_CHARS: usize = base32::encode_len(HASH_BYTES);
const MAX_NAME_LEN: usize = 211;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StorePathError {
    #[error("store path {0:?} is not absolute")]
    NonAbsolute(PathBuf),
    #[error("path {0:?} is not in the store")]
    NotInStore(PathBuf),
    #[error("store path hash must be 32 characters")]
    HashLength,
    #[error("name must be between 1 and 211 characters")]
    NameLength,
    #[error("invalid character {ch:?} at {0}", ch = char::from(*.1))]
    Symbol(u8, u8),
}

impl StorePathError {
    fn offset(self, by: usize) -> StorePathError {
        match self {
            StorePathError::Symbol(idx, ch) => StorePathError::Symbol(idx + by as u8, ch),
            other => other,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("invalid store path '{path}': {error}")]
pub struct ParseStorePathError {
    pub path: String,
    pub error: StorePathError,
}

impl ParseStorePathError {
    pub fn new(path: &str, error: StorePathError) -> ParseStorePathError {
        ParseStorePathError {
            path: path.to_owned(),
            error,
        }
    }
}

/// The 20 byte digest at the start of a store path.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorePathHash([u8; HASH_BYTES]);

impl StorePathHash {
    pub fn decode_digest(data: &[u8]) -> Result<StorePathHash, StorePathError> {
        if data.len() != HASH_CHARS {
            return Err(StorePathError::HashLength);
        }
        let mut digest = [0u8; HASH_BYTES];
        base32::decode_mut(data, &mut digest).map_err(|err| {
            let idx = err.position();
            StorePathError::Symbol(idx as u8, data[idx])
        })?;
        Ok(StorePathHash(digest))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }
}

impl fmt::Display for StorePathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base32::encode_string(&self.0))
    }
}

impl fmt::Debug for StorePathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePathHash({self})")
    }
}

impl FromStr for StorePathHash {
    type Err = StorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePathHash::decode_digest(s.as_bytes())
    }
}

// base-32 rendering starts at the last byte
impl Ord for StorePathHash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for StorePathHash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Checks that `s` is a valid store path name.
///
/// Output names follow the same rules.
pub fn into_name<V: AsRef<[u8]> + ?Sized>(s: &V) -> Result<&str, StorePathError> {
    let s = s.as_ref();
    if s.is_empty() || s.len() > MAX_NAME_LEN {
        return Err(StorePathError::NameLength);
    }
    if let Some(idx) = s.iter().position(|ch| !is_name_char(*ch)) {
        return Err(StorePathError::Symbol(idx as u8, s[idx]));
    }
    // only ASCII is left at this point
    std::str::from_utf8(s).map_err(|err| {
        let idx = err.valid_up_to();
        StorePathError::Symbol(idx as u8, s[idx])
    })
}

const fn is_name_char(ch: u8) -> bool {
    matches!(ch, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'+' | b'-' | b'_' | b'?' | b'=' | b'.')
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePathName(String);

impl FromStr for StorePathName {
    type Err = StorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StorePathName(into_name(s)?.to_owned()))
    }
}

impl fmt::Display for StorePathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for StorePathName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// A store object: `<hash>-<name>` without the store directory.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath {
    hash: StorePathHash,
    name: StorePathName,
}

impl StorePath {
    pub fn hash(&self) -> &StorePathHash {
        &self.hash
    }

    pub fn name(&self) -> &StorePathName {
        &self.name
    }

    pub fn is_derivation(&self) -> bool {
        self.name.ends_with(DRV_EXTENSION)
    }

    fn parse_base(base: &str) -> Result<StorePath, StorePathError> {
        let bytes = base.as_bytes();
        if bytes.len() <= HASH_CHARS {
            return Err(StorePathError::HashLength);
        }
        let hash = StorePathHash::decode_digest(&bytes[..HASH_CHARS])?;
        if bytes[HASH_CHARS] != b'-' {
            return Err(StorePathError::Symbol(HASH_CHARS as u8, bytes[HASH_CHARS]));
        }
        let name = into_name(&bytes[HASH_CHARS + 1..]).map_err(|err| err.offset(HASH_CHARS + 1))?;
        Ok(StorePath {
            hash,
            name: StorePathName(name.to_owned()),
        })
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hash, self.name)
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({self})")
    }
}

impl FromStr for StorePath {
    type Err = ParseStorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::parse_base(s).map_err(|error| ParseStorePathError::new(s, error))
    }
}

impl TryFrom<String> for StorePath {
    type Error = ParseStorePathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StorePath> for String {
    fn from(value: StorePath) -> Self {
        value.to_string()
    }
}

impl FromStoreDirStr for StorePath {
    type Error = ParseStorePathError;

    fn from_store_dir_str(store_dir: &StoreDir, s: &str) -> Result<Self, Self::Error> {
        let path = Path::new(s);
        let err = |error| ParseStorePathError::new(s, error);
        if !path.is_absolute() {
            return Err(err(StorePathError::NonAbsolute(path.to_owned())));
        }
        let base = s
            .strip_prefix(store_dir.to_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| err(StorePathError::NotInStore(path.to_owned())))?;
        StorePath::parse_base(base).map_err(err)
    }
}

impl StoreDirDisplay for StorePath {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", store_dir, self)
    }
}

#[cfg(any(test, feature = "test"))]
pub mod proptest {
    use ::proptest::prelude::*;

    use super::*;

    pub fn arb_output_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,7}"
    }

    pub fn arb_store_path_name(
        extension: Option<&'static str>,
    ) -> impl Strategy<Value = StorePathName> {
        "[a-zA-Z0-9+\\-_?=][a-zA-Z0-9+\\-_?=.]{0,40}".prop_map(move |mut name| {
            if let Some(extension) = extension {
                name.push_str(extension);
            }
            StorePathName(name)
        })
    }

    pub fn arb_store_path(extension: Option<&'static str>) -> impl Strategy<Value = StorePath> {
        (any::<[u8; HASH_BYTES]>(), arb_store_path_name(extension)).prop_map(|(digest, name)| {
            StorePath {
                hash: StorePathHash(digest),
                name,
            }
        })
    }

    pub fn arb_drv_store_path() -> impl Strategy<Value = StorePath> {
        arb_store_path(Some(DRV_EXTENSION))
    }

    impl Arbitrary for StorePath {
        type Parameters = ();
        type Strategy = BoxedStrategy<StorePath>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            arb_store_path(None).boxed()
        }
    }
}

#[cfg(test)]
mod unittests {
    use ::proptest::prelude::*;
    use hex_literal::hex;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::proptest::arb_drv_store_path;
    use super::*;

    #[test]
    fn hash_digest() {
        let hash: StorePathHash = "0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx".parse().unwrap();
        assert_eq!(hash.to_string(), "0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx");
        let other: StorePathHash = "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz".parse().unwrap();
        assert_eq!(other.as_bytes(), &hex!("ffffffffffffffffffffffffffffffffffffffff"));
    }

    #[rstest]
    #[case::short("0c7d2kxxq2rinh12zp4h8qv7dpwhlhd", StorePathError::HashLength)]
    #[case::long("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdxx", StorePathError::HashLength)]
    #[case::excluded_letter("0c7d2kxxq2rinh12zp4h8qv7dpwhlhde", StorePathError::Symbol(31, b'e'))]
    fn hash_errors(#[case] s: &str, #[case] expected: StorePathError) {
        assert_eq!(s.parse::<StorePathHash>().unwrap_err(), expected);
    }

    #[test]
    fn ordered_like_rendering() {
        let mut hashes: Vec<StorePathHash> = [
            "zs498qq1arym4p4z6bkpid3xgrbl29rj",
            "0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx",
            "9hmpxy56lak38d06hwdsihnq2cxdcjk0",
            "0c7d2kxxq2rinh12zp4h8qv7dpwhlhd0",
            "hk60ghp7kcc1a0s2zmglizyhj6hmrbad",
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
        hashes.sort();
        let rendered: Vec<String> = hashes.iter().map(ToString::to_string).collect();
        let mut expected = rendered.clone();
        expected.sort();
        assert_eq!(rendered, expected);
    }

    #[rstest]
    #[case("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-hello-2.12.1", false)]
    #[case("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-hello-2.12.1.drv", true)]
    #[case("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-drv", false)]
    #[case("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-?=_+.", false)]
    fn parse_display(#[case] s: &str, #[case] is_derivation: bool) {
        let path: StorePath = s.parse().unwrap();
        assert_eq!(path.to_string(), s);
        assert_eq!(path.is_derivation(), is_derivation);
        assert_eq!(&s[..32], path.hash().to_string());
        assert_eq!(&s[33..], &**path.name());
    }

    #[rstest]
    #[case::empty("", StorePathError::HashLength)]
    #[case::no_name("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-", StorePathError::NameLength)]
    #[case::no_dash("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx_hello", StorePathError::Symbol(32, b'_'))]
    #[case::bad_name("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-he llo", StorePathError::Symbol(35, b' '))]
    fn parse_errors(#[case] s: &str, #[case] expected: StorePathError) {
        assert_eq!(
            s.parse::<StorePath>().unwrap_err(),
            ParseStorePathError::new(s, expected)
        );
    }

    #[test]
    fn name_too_long() {
        let s = format!("0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-{}", "a".repeat(212));
        assert_eq!(
            s.parse::<StorePath>().unwrap_err().error,
            StorePathError::NameLength
        );
    }

    #[rstest]
    #[case::relative("nix/store/0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a", StorePathError::NonAbsolute("nix/store/0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a".into()))]
    #[case::elsewhere("/gnu/store/0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a", StorePathError::NotInStore("/gnu/store/0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a".into()))]
    #[case::glued("/nix/store0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a", StorePathError::NotInStore("/nix/store0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-a".into()))]
    #[case::store_itself("/nix/store/", StorePathError::HashLength)]
    fn store_dir_errors(#[case] s: &str, #[case] expected: StorePathError) {
        let err = StoreDir::default().parse::<StorePath>(s).unwrap_err();
        assert_eq!(err, ParseStorePathError::new(s, expected));
    }

    #[test]
    fn serde_string() {
        let path: StorePath = "0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-hello".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"0c7d2kxxq2rinh12zp4h8qv7dpwhlhdx-hello\"");
        assert_eq!(serde_json::from_str::<StorePath>(&json).unwrap(), path);
        assert!(serde_json::from_str::<StorePath>("\"hello\"").is_err());
    }

    proptest! {
        #[test]
        fn store_dir_round_trip(store_dir in any::<StoreDir>(), path in any::<StorePath>()) {
            let s = store_dir.display(&path).to_string();
            prop_assert_eq!(store_dir.parse::<StorePath>(&s).unwrap(), path);
        }

        #[test]
        fn drv_paths_are_derivations(path in arb_drv_store_path()) {
            prop_assert!(path.is_derivation());
        }
    }
}

use std::collections::BTreeSet;

mod path;
mod store_dir;

pub use path::{
    DRV_EXTENSION, ParseStorePathError, StorePath, StorePathError, StorePathHash, StorePathName,
    into_name,
};
pub use store_dir::{
    DisplayStorePath, FromStoreDirStr, NIX_STORE_DIR, StoreDir, StoreDirDisplay, StoreDirError,
};

pub type StorePathSet = BTreeSet<StorePath>;

#[cfg(any(test, feature = "test"))]
pub mod proptest {
    pub use super::path::proptest::*;
    pub use super::store_dir::proptest::*;
}

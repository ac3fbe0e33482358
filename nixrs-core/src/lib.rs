// SPDX-FileCopyrightText: 2024 griff
//
// SPDX-License-Identifier: EUPL-1.2 or MIT

//! Pure model of the things an installable can refer to.
//!
//! [`store_path`] holds concrete store objects, [`derived_path`] the requests
//! for outputs of (possibly not yet built) derivations and [`built_path`]
//! their resolved counterparts. [`store`] is the seam to the build executor
//! and the resolution service that turns a derived path into a built one.

extern crate self as nixrs_core;

pub mod base32;
pub mod build_result;
pub mod built_path;
pub mod derived_path;
pub mod log;
pub mod store;
pub mod store_path;

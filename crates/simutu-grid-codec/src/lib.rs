// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Pure bidirectional codec between logical records and physical slot
//! arrays, governed by a checklist item's column mapping set.
//!
//! No I/O lives here. The row store calls [`encode`] on every write and
//! [`decode`] on every read; bulk-import tooling reuses the same pair.
//!
//! Corruption policy: [`decode`] never fails. Stored text that does not
//! parse under its declared type surfaces as an explicit per-field marker
//! in [`DecodedRecord::corrupt`]; callers that want failure semantics use
//! [`DecodedRecord::into_strict`]. Missing optional values are absent from
//! the result, never defaulted or coalesced into placeholder strings.

mod decode;
mod encode;

pub use decode::{decode, CorruptValue, DecodedRecord};
pub use encode::encode;

pub const CRATE_NAME: &str = "simutu-grid-codec";

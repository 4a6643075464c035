//! # Meterlog Core Library
//!
//! This crate implements the core of `meterlog`, a tool that migrates the
//! historical usage logs of an embedded energy-meter display into the
//! circular-buffer databases of a replacement unit. The appliance stores one
//! ring buffer file per metric and resolution tier, each described by a
//! binary schema file; old readings travel between units as plain
//! `timestamp,value` interchange rows.
//!
//! ## Crate Structure
//!
//! - **`schema`**: decoder for the binary schema (".dat") files describing a
//!   device and its ring buffer subsets, including the tolerance paths for
//!   unprovisioned devices and partly corrupted files.
//! - **`ring`**: reconstruction of each physical slot's absolute timestamp
//!   from a subset's geometry, and the rotation-aware binary search the
//!   merge relies on.
//! - **`ringfile`**: reader/writer for the flat ring buffer (".rra") files,
//!   preserving physical slot order and replacing files atomically.
//! - **`interchange`**: reader for `timestamp,value` rows under an import
//!   cutoff, and the export projector producing them from ring contents.
//! - **`merge`**: the merge engine combining ring contents with interchange
//!   samples under the importable-window policy.
//! - **`sample`**: the `Sample` trait abstracting the integer and floating
//!   value kinds, selected once per device.
//! - **`registry`**: display-name resolution from the appliance's device
//!   registry document.
//! - **`cutoff`**: `YYYY-MM-DD` import limit parsing.
//! - **`paths`**: deterministic ring/interchange filename derivation.
//! - **`batch`**: directory-level import and export runs with per-device
//!   error containment.
//! - **`config`**: TOML-backed settings (database locations, upload paths).
//! - **`error`**: the `TransferError` type shared by all of the above.

pub mod batch;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod interchange;
pub mod merge;
pub mod paths;
pub mod registry;
pub mod ring;
pub mod ringfile;
pub mod sample;
pub mod schema;

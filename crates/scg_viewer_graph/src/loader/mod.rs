// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loaders that build scenes from diagram documents.

pub mod gwf;

pub use gwf::{GwfError, GwfLoader};

// SPDX-License-Identifier: Apache-2.0

pub mod merge;
pub mod pipeline;
pub mod types;
pub mod writers;

pub use pipeline::export_all;
pub use types::*;

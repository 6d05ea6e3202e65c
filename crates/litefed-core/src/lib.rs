// SPDX-License-Identifier: Apache-2.0

//! litefed core
//!
//! Types shared by every layer of the federation engine: the closed cell
//! value type, dataframes, identifier sanitizing and the error taxonomy.

pub mod error;
pub mod ident;
pub mod sensitive;
pub mod value;

pub use error::{WorkspaceError, WorkspaceResult};
pub use sensitive::Sensitive;
pub use value::{Dataframe, Record, Value};

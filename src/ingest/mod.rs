// SPDX-License-Identifier: Apache-2.0

pub mod engine;
pub mod sources;

pub use engine::{ingest, infer_schema, IngestOptions, InferredColumn, MissingColumnPolicy, SqlType};
pub use sources::{read_data_file, DataFile, DataFileKind};

//! Datalog file reading: dBASE tables and the directory-level source.

pub mod dbf;
pub mod reader;

pub use dbf::{DbfField, DbfHeader};
pub use reader::{DatDirectory, DatSource, date_from_file_name, is_float_file, tag_file_name};

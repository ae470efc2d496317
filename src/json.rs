/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! This module contains the [`ToJson`] and [`FromJson`] traits that are used
//! in serialisation to/from JSON. The actual (de)serialisation of documents, annotation sets
//! and annotations is implemented alongside the data structures themselves, not here.
//! JSON is only a boundary representation for collaborators, it is not a corpus format.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use crate::config::Config;
use crate::error::PampacError;
use crate::types::*;

/// Auxiliary function to help open files
pub(crate) fn open_file_reader(filename: &str) -> Result<BufReader<File>, PampacError> {
    File::open(filename)
        .map(BufReader::new)
        .map_err(|e| PampacError::IOError(e, filename.to_string(), "Opening file for reading failed"))
}

/// Auxiliary function to help create files
pub(crate) fn open_file_writer(filename: &str) -> Result<BufWriter<File>, PampacError> {
    File::create(filename)
        .map(BufWriter::new)
        .map_err(|e| PampacError::IOError(e, filename.to_string(), "Opening file for writing failed"))
}

pub trait ToJson
where
    Self: TypeInfo + serde::Serialize,
{
    /// Writes a serialisation to any writer
    /// Lower-level function
    fn to_json_writer<W>(&self, writer: W, compact: bool) -> Result<(), PampacError>
    where
        W: std::io::Write,
    {
        match compact {
            false => serde_json::to_writer_pretty(writer, &self).map_err(|e| {
                PampacError::SerializationError(format!(
                    "Writing {} to file: {}",
                    Self::typeinfo(),
                    e
                ))
            }),
            true => serde_json::to_writer(writer, &self).map_err(|e| {
                PampacError::SerializationError(format!(
                    "Writing {} to file: {}",
                    Self::typeinfo(),
                    e
                ))
            }),
        }
    }

    /// Writes this structure to a file
    fn to_json_file(&self, filename: &str, config: &Config) -> Result<(), PampacError> {
        debug(config, || {
            format!("{}.to_json_file: filename={:?}", Self::typeinfo(), filename)
        });
        let writer = open_file_writer(filename)?;
        self.to_json_writer(writer, false)
    }

    /// Serializes this structure to one string.
    fn to_json_string(&self, compact: bool) -> Result<String, PampacError> {
        let result = if compact {
            serde_json::to_string(&self)
        } else {
            serde_json::to_string_pretty(&self)
        };
        result.map_err(|e| {
            PampacError::SerializationError(format!(
                "Writing {} to string: {}",
                Self::typeinfo(),
                e
            ))
        })
    }
}

pub trait FromJson
where
    Self: TypeInfo + Sized,
{
    fn from_json_file(filename: &str, config: Config) -> Result<Self, PampacError>;

    fn from_json_str(string: &str, config: Config) -> Result<Self, PampacError>;
}

//! A named byte stream, the only filesystem contract the engine needs
//! (§6.4: "given a resource name, provide a byte stream").
//!
//! `escr` has no opinion on where bytes come from - a file, a string held
//! in memory, a socket - so [`TextStream`] just pairs a reader with the
//! resource name diagnostics should quote, mirroring how the reference
//! implementation's `TextStream` carries its own `getResourceName()`
//! rather than making every caller thread a name through separately.

use std::io::{self, Read};

pub struct TextStream<R> {
    resource: String,
    reader: R,
}

impl<R: Read> TextStream<R> {
    pub fn new(resource: impl Into<String>, reader: R) -> Self {
        Self { resource: resource.into(), reader }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Reads the stream to completion and decodes it as UTF-8 (§6.3).
    pub fn read_to_string(mut self) -> io::Result<(String, String)> {
        let mut buf = String::new();
        self.reader.read_to_string(&mut buf)?;
        Ok((self.resource, buf))
    }
}

impl TextStream<io::Cursor<Vec<u8>>> {
    /// Convenience constructor for source held as a string, the common case
    /// in tests and for hosts that already have the script text in memory.
    pub fn from_str(resource: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(resource, io::Cursor::new(source.into().into_bytes()))
    }
}

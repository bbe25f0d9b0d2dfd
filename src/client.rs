use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::{KvError, Result};

/// The client of a key-value store.
///
/// Keeps one connection open and sends one request line at a time.
pub struct KvsClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl KvsClient {
    /// Connects to the server at the given address.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let reader_stream = TcpStream::connect(addr)?;
        let writer_stream = reader_stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(reader_stream),
            writer: BufWriter::new(writer_stream),
        })
    }

    /// Sets a key-value pair on the server.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        if value.is_empty() {
            return Err(KvError::InvalidArgument("value must not be empty".to_owned()));
        }
        if value.contains(['\n', '\r']) {
            return Err(KvError::InvalidArgument(
                "value must not contain line breaks".to_owned(),
            ));
        }

        match self.request(&format!("SET {key} {value}"))?.as_str() {
            "OK" => Ok(()),
            other => Err(KvError::UnexpectedResponse(other.to_owned())),
        }
    }

    /// Gets the value for a key from the server.
    ///
    /// A stored value that is literally `NOT_FOUND` reads back as `None`;
    /// the protocol has no way to tell the two apart.
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        // A checked key can't draw a protocol error, so any other line,
        // even one starting with `ERROR: `, is the stored value.
        let line = self.round_trip(&format!("GET {key}"))?;
        if line == "NOT_FOUND" {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    /// Deletes a key on the server, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        check_key(key)?;
        match self.request(&format!("DEL {key}"))?.as_str() {
            "DELETED" => Ok(true),
            "NOT_FOUND" => Ok(false),
            other => Err(KvError::UnexpectedResponse(other.to_owned())),
        }
    }

    /// Sends one request line and reads back one response line, mapping
    /// `ERROR:` replies to `KvError::Server`.
    fn request(&mut self, line: &str) -> Result<String> {
        let response = self.round_trip(line)?;
        match response.strip_prefix("ERROR: ") {
            Some(message) => Err(KvError::Server(message.to_owned())),
            None => Ok(response),
        }
    }

    /// Sends one request line and reads back one response line verbatim.
    fn round_trip(&mut self, line: &str) -> Result<String> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;

        let mut response = String::new();
        if self.reader.read_line(&mut response)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )
            .into());
        }
        if response.ends_with('\n') {
            response.pop();
        }
        Ok(response)
    }
}

/// Keys are a single whitespace-free token on the wire.
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidArgument("key must not be empty".to_owned()));
    }
    if key.contains(|c: char| c.is_ascii_whitespace()) {
        return Err(KvError::InvalidArgument(format!(
            "key {key:?} must not contain whitespace"
        )));
    }
    Ok(())
}

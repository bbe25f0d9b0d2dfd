use std::borrow::Cow;
use std::io::{self, BufWriter, Read, Write};

use log::{debug, trace};

use crate::engines::KvsEngine;
use crate::protocol::{parse, Command, Response};
use crate::Result;

/// Bytes requested from the stream per read.
const READ_CHUNK_SIZE: usize = 1024;

/// Serves one connection from its first byte to its close.
///
/// Bytes are appended to a private buffer as they arrive and every complete
/// line is executed before the next read, so a single read may carry a
/// fragment of a line, one line, or many pipelined lines. Responses go out in
/// the order the lines' terminators arrived.
pub struct Session<E: KvsEngine, R: Read, W: Write> {
    engine: E,
    reader: R,
    writer: BufWriter<W>,
    /// Bytes read but not yet resolved into a complete line.
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no terminator.
    scanned: usize,
}

impl<E: KvsEngine, R: Read, W: Write> Session<E, R, W> {
    /// Creates a session over the two halves of a connection.
    pub fn new(engine: E, reader: R, writer: W) -> Self {
        Self {
            engine,
            reader,
            writer: BufWriter::new(writer),
            buffer: Vec::new(),
            scanned: 0,
        }
    }

    /// Runs the session until the peer closes the stream or an I/O error
    /// occurs. Consumes the session; the streams are dropped on return.
    ///
    /// # Errors
    ///
    /// Returns the read or write error that ended the session. A clean close
    /// by the peer is `Ok`.
    pub fn run(mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = match self.reader.read(&mut chunk) {
                Ok(0) => {
                    if !self.buffer.is_empty() {
                        debug!(
                            "Peer closed with {} bytes of unterminated input",
                            self.buffer.len()
                        );
                    }
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            trace!("Read {} bytes", n);
            self.buffer.extend_from_slice(&chunk[..n]);
            self.drain()?;
        }
    }

    /// Executes every complete line in the buffer and keeps the trailing
    /// partial line, if any, for the next read.
    fn drain(&mut self) -> Result<()> {
        let mut consumed = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            let line = decode_line(&self.buffer[consumed..end]);
            consumed = end + 1;
            self.scanned = consumed;

            if line.is_empty() {
                continue;
            }

            let command = parse(&line);
            debug!("Received {:?}", command);
            let response = execute(&self.engine, command);

            writeln!(self.writer, "{response}")?;
            self.writer.flush()?;
        }

        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();
        Ok(())
    }
}

/// Applies one command to the engine and builds its response.
fn execute<E: KvsEngine>(engine: &E, command: Command) -> Response {
    match command {
        Command::Set { key, value } => {
            engine.set(key, value);
            Response::Ok
        }
        // An empty stored value would render as a blank line. `SET` never
        // accepts an empty value, so this stays unreachable over the wire.
        Command::Get { key } => engine.get(&key).map_or(Response::NotFound, Response::Value),
        Command::Delete { key } => {
            if engine.remove(&key) {
                Response::Deleted
            } else {
                Response::NotFound
            }
        }
        Command::Unknown(_) => Response::unknown_command(),
        Command::Malformed(reason) => reason.into(),
    }
}

/// Decodes a line without its `\n`. A `\r` right before the `\n` is part of
/// the terminator; invalid UTF-8 is replaced rather than rejected.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::engines::MemStore;
    use crate::KvError;

    /// A reader that hands out a fixed script of reads, then end of stream.
    struct ScriptedReader {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn chunks<I, C>(chunks: I) -> Self
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            Self {
                reads: chunks.into_iter().map(|c| Ok(c.as_ref().to_vec())).collect(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_with(store: &MemStore, reader: ScriptedReader) -> String {
        let mut out = Vec::new();
        Session::new(store.clone(), reader, &mut out).run().unwrap();
        String::from_utf8(out).unwrap()
    }

    fn run_chunks<I, C>(chunks: I) -> String
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        run_with(&MemStore::new(), ScriptedReader::chunks(chunks))
    }

    #[test]
    fn single_read_and_byte_by_byte_agree() {
        let input = b"SET a 1\nGET a\n";
        let whole = run_chunks([input]);
        let bytewise = run_chunks(input.iter().map(|b| [*b]));
        assert_eq!(whole, "OK\n1\n");
        assert_eq!(bytewise, whole);
    }

    #[test]
    fn pipelined_commands_answer_in_order() {
        assert_eq!(run_chunks(["SET a 1\nSET a 2\nGET a\n"]), "OK\nOK\n2\n");
    }

    #[test]
    fn random_fragmentation_preserves_responses() {
        let mut input = Vec::new();
        let mut expected = String::new();
        for i in 0..200 {
            let request = format!("SET key{} value {}\nGET key{}\n", i % 7, i, i % 7);
            input.extend_from_slice(request.as_bytes());
            expected.push_str(&format!("OK\nvalue {i}\n"));
        }
        input.extend_from_slice(b"DEL key3\nDEL key3\n");
        expected.push_str("DELETED\nNOT_FOUND\n");

        let mut rng = StdRng::seed_from_u64(7);
        let mut chunks = Vec::new();
        let mut rest = &input[..];
        while !rest.is_empty() {
            let n = rng.gen_range(1..=40).min(rest.len());
            chunks.push(rest[..n].to_vec());
            rest = &rest[n..];
        }

        assert_eq!(run_chunks(chunks), expected);
    }

    #[test]
    fn blank_lines_produce_no_response() {
        assert_eq!(run_chunks(["\n"]), "");
        assert_eq!(run_chunks(["\n\r\n\nGET a\n"]), "NOT_FOUND\n");
    }

    #[test]
    fn protocol_errors_do_not_end_the_session() {
        let out = run_chunks(["SET a\nFOO bar\nGET\nDEL\nSET a 1\nGET a\n"]);
        assert_eq!(
            out,
            "ERROR: SET requires key and value\n\
             ERROR: Unknown command\n\
             ERROR: GET requires key\n\
             ERROR: DEL requires key\n\
             OK\n\
             1\n"
        );
    }

    #[test]
    fn delete_reports_presence() {
        assert_eq!(
            run_chunks(["DEL a\nSET a 1\nDEL a\nGET a\n"]),
            "NOT_FOUND\nOK\nDELETED\nNOT_FOUND\n"
        );
    }

    #[test]
    fn crlf_terminators_are_accepted() {
        assert_eq!(run_chunks(["SET a hello world\r\nGET a\r\n"]), "OK\nhello world\n");
    }

    #[test]
    fn long_line_spanning_many_reads() {
        let value = "x".repeat(5000);
        let input = format!("SET big {value}\nGET big\n");
        let chunks: Vec<_> = input.as_bytes().chunks(333).collect();
        assert_eq!(run_chunks(chunks), format!("OK\n{value}\n"));
    }

    #[test]
    fn unterminated_tail_is_never_executed() {
        let store = MemStore::new();
        let out = run_with(&store, ScriptedReader::chunks(["SET a 1\nSET b 2"]));
        assert_eq!(out, "OK\n");
        assert_eq!(store.get("a"), Some("1".to_owned()));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let reader = ScriptedReader {
            reads: VecDeque::from(vec![
                Ok(b"SET a".to_vec()),
                Err(io::ErrorKind::Interrupted.into()),
                Ok(b" 1\nGET a\n".to_vec()),
            ]),
        };
        assert_eq!(run_with(&MemStore::new(), reader), "OK\n1\n");
    }

    #[test]
    fn read_error_ends_the_session() {
        let reader = ScriptedReader {
            reads: VecDeque::from(vec![
                Ok(b"SET a 1\n".to_vec()),
                Err(io::ErrorKind::ConnectionReset.into()),
                Ok(b"SET b 2\n".to_vec()),
            ]),
        };
        let store = MemStore::new();
        let mut out = Vec::new();
        let result = Session::new(store.clone(), reader, &mut out).run();

        assert!(matches!(
            result,
            Err(KvError::Io(ref e)) if e.kind() == io::ErrorKind::ConnectionReset
        ));
        assert_eq!(out, b"OK\n");
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn write_error_abandons_buffered_lines() {
        let store = MemStore::new();
        let reader = ScriptedReader::chunks(["SET a 1\nSET b 2\n"]);
        let result = Session::new(store.clone(), reader, BrokenPipe).run();

        assert!(matches!(
            result,
            Err(KvError::Io(ref e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert_eq!(store.get("a"), Some("1".to_owned()));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let out = run_chunks([&b"SET k caf\xff\nGET k\n"[..]]);
        assert_eq!(out, "OK\ncaf\u{fffd}\n");
    }
}

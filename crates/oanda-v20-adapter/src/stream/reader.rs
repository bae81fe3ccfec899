/*
[INPUT]:  Byte channel of an open response body (any AsyncRead)
[OUTPUT]: Lazy sequence of non-empty logical lines
[POS]:    Streaming layer - line framing
[UPDATE]: When changing delimiter handling or line limits
*/

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};

use super::StreamError;

/// Splits a byte channel into newline-delimited records.
///
/// Accepts `\n` and `\r\n`, drops blank lines and yields a trailing unterminated
/// line at EOF. Not restartable: after `Ok(None)` or an error the reader is done.
#[derive(Debug)]
pub struct LineReader<R> {
    frames: FramedRead<R, AnyDelimiterCodec>,
    max_line_bytes: usize,
    records: u64,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        let codec = AnyDelimiterCodec::new_with_max_length(vec![b'\n'], Vec::new(), max_line_bytes);
        Self {
            frames: FramedRead::new(reader, codec),
            max_line_bytes,
            records: 0,
        }
    }

    /// Next non-empty line, or `Ok(None)` once the peer closed the body
    pub async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        while let Some(frame) = self.frames.next().await {
            let chunk = match frame {
                Ok(chunk) => chunk,
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    return Err(StreamError::LineTooLong {
                        line: self.records + 1,
                        max: self.max_line_bytes,
                    });
                }
                Err(AnyDelimiterCodecError::Io(err)) => return Err(StreamError::Read(err)),
            };

            let line = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            self.records += 1;
            return match std::str::from_utf8(line) {
                Ok(text) => Ok(Some(text.to_owned())),
                Err(source) => Err(StreamError::InvalidUtf8 {
                    line: self.records,
                    source,
                }),
            };
        }

        Ok(None)
    }
}

impl<R> LineReader<R> {
    /// Number of non-empty lines yielded so far
    pub fn records_read(&self) -> u64 {
        self.records
    }
}

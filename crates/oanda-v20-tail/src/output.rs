/*
[INPUT]:  Serializable stream events
[OUTPUT]: One compact JSON document per line on the wrapped writer
[POS]:    Output layer - stdout sink for the tail binary
[UPDATE]: When changing the output format
*/

use std::io::{self, Write};

use serde::Serialize;

/// Writes each event as a JSON line and flushes it so pipes see it immediately
#[derive(Debug)]
pub struct JsonLineWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> JsonLineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, event)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

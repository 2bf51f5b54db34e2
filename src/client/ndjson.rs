use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

use super::traits::PullStream;
use super::types::PullProgress;
use crate::utils::OllamaError;

/// Incremental decoder for newline-delimited JSON
///
/// Chunks from the network do not respect line boundaries, so partial lines
/// are buffered until their newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every record completed by it
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Result<Vec<T>, serde_json::Error> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(record) = parse_line(&line)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Decode whatever is left once the input has ended
    pub fn finish<T: DeserializeOwned>(&mut self) -> Result<Option<T>, serde_json::Error> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Result<Option<T>, serde_json::Error> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(line).map(Some)
}

struct PullState<S> {
    bytes: S,
    decoder: NdjsonDecoder,
    pending: VecDeque<PullProgress>,
    done: bool,
}

/// Turn a pull response body into a stream of progress records
///
/// A record carrying `error` ends the stream with [`OllamaError::Stream`].
pub fn decode_pull_stream<S>(bytes: S) -> PullStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = PullState {
        bytes,
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(record) = st.pending.pop_front() {
                if let Some(error) = record.error {
                    st.pending.clear();
                    st.done = true;
                    return Some((Err(OllamaError::Stream(error)), st));
                }
                return Some((Ok(record), st));
            }

            if st.done {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => match st.decoder.push::<PullProgress>(&chunk) {
                    Ok(records) => st.pending.extend(records),
                    Err(e) => {
                        st.done = true;
                        return Some((Err(e.into()), st));
                    }
                },
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.done = true;
                    match st.decoder.finish::<PullProgress>() {
                        Ok(Some(record)) => st.pending.push_back(record),
                        Ok(None) => {}
                        Err(e) => return Some((Err(e.into()), st)),
                    }
                }
            }
        }
    })
    .boxed()
}

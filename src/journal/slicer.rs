//! Chunked, delimiter-driven slicing of a byte stream.
//!
//! [`Slicer`] reads its source in chunks of at most `chunk_maximum_length`
//! bytes and hands out the delimiter-separated slices it finds, one at a
//! time. It never holds more than one chunk plus one partial slice in
//! memory, so arbitrarily large journals stream in bounded space.
//!
//! # Straddling delimiters
//!
//! With a two-byte [`LineBreak`] the first byte may be the last byte of a
//! chunk. The slicer then parks that byte at the end of the accumulation
//! buffer and decides on the next chunk: if it starts with the second
//! delimiter byte the slice ends there, otherwise the parked byte was
//! ordinary data.
//!
//! # Lending
//!
//! [`Slicer::next_slice`] lends the slice until the next call. A slice that
//! lies entirely inside the current chunk is lent straight from the chunk
//! buffer; only slices spanning chunks are copied into the accumulation
//! buffer. Use [`Slicer::into_owned`] for a plain [`Iterator`] of owned
//! slices.

use super::error::JournalError;
use super::line_break::LineBreak;
use std::io::{ErrorKind, Read};
use tracing::trace;

/// Where the slice found by one step of the scan lives.
enum Step {
    /// `chunk[start..end]`.
    Chunk(usize, usize),
    /// `accum[..len]`.
    Accum(usize),
}

/// Outcome of scanning the rest of the current chunk.
enum Scan {
    /// A complete delimiter starts at `at` and spans `len` bytes.
    Found { at: usize, len: usize },
    /// The first delimiter byte is the last byte of the chunk.
    Straddle { at: usize },
    /// No delimiter in the rest of the chunk.
    NotFound,
}

/// Splits a chunked byte stream into delimiter-separated slices.
pub struct Slicer<R> {
    source: R,
    line_break: LineBreak,
    slice_maximum_length: usize,
    may_lack_trailing_break: bool,
    /// Buffer of `chunk_maximum_length` bytes receiving each read.
    chunk: Box<[u8]>,
    /// Number of valid bytes in `chunk`.
    chunk_len: usize,
    /// Scan position within `chunk`.
    pos: usize,
    /// Stream offset of `chunk[0]`.
    chunk_offset: u64,
    /// Stream offset where the current slice started.
    slice_start: u64,
    /// Bytes of the in-progress slice that did not fit in one chunk.
    accum: Vec<u8>,
    /// The last byte of `accum` is a parked first delimiter byte.
    pending_first: bool,
    /// `accum` was lent out by the previous call and must be reset.
    reset_accum: bool,
    eof: bool,
    done: bool,
    slices_emitted: u64,
}

impl<R: Read> Slicer<R> {
    /// Creates a slicer over `source`.
    ///
    /// Trailing unterminated bytes are an error unless
    /// [`may_lack_trailing_break`](Self::may_lack_trailing_break) is set.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] if either length is zero.
    pub fn new(
        source: R,
        line_break: LineBreak,
        chunk_maximum_length: usize,
        slice_maximum_length: usize,
    ) -> Result<Self, JournalError> {
        if chunk_maximum_length == 0 {
            return Err(JournalError::invalid_config(
                "chunk_maximum_length must be at least 1",
            ));
        }
        if slice_maximum_length == 0 {
            return Err(JournalError::invalid_config(
                "slice_maximum_length must be at least 1",
            ));
        }

        Ok(Self {
            source,
            line_break,
            slice_maximum_length,
            may_lack_trailing_break: false,
            chunk: vec![0u8; chunk_maximum_length].into_boxed_slice(),
            chunk_len: 0,
            pos: 0,
            chunk_offset: 0,
            slice_start: 0,
            accum: Vec::new(),
            pending_first: false,
            reset_accum: false,
            eof: false,
            done: false,
            slices_emitted: 0,
        })
    }

    /// Accept input whose last slice is not followed by a delimiter.
    #[must_use]
    pub fn may_lack_trailing_break(mut self, value: bool) -> Self {
        self.may_lack_trailing_break = value;
        self
    }

    /// Number of slices handed out so far.
    #[must_use]
    pub fn slices_emitted(&self) -> u64 {
        self.slices_emitted
    }

    /// Returns the next slice, or `None` at the end of input.
    ///
    /// The returned bytes exclude the delimiter and are only valid until the
    /// next call. Once an error has been returned, every later call returns
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`JournalError::SliceTooLong`] when a slice exceeds
    ///   `slice_maximum_length`.
    /// - [`JournalError::UnterminatedSlice`] when the input ends mid-slice
    ///   and trailing breaks are required.
    /// - [`JournalError::Io`] when the source fails.
    pub fn next_slice(&mut self) -> Result<Option<&[u8]>, JournalError> {
        if self.done {
            return Ok(None);
        }
        if self.reset_accum {
            self.accum.clear();
            self.reset_accum = false;
        }

        match self.advance() {
            Ok(Some(Step::Chunk(start, end))) => {
                self.slices_emitted = self.slices_emitted.saturating_add(1);
                Ok(Some(&self.chunk[start..end]))
            }
            Ok(Some(Step::Accum(len))) => {
                self.slices_emitted = self.slices_emitted.saturating_add(1);
                self.reset_accum = true;
                Ok(Some(&self.accum[..len]))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// The underlying byte source.
    pub(crate) fn get_ref(&self) -> &R {
        &self.source
    }

    /// Converts this slicer into an iterator of owned slices.
    #[must_use]
    pub fn into_owned(self) -> OwnedSlices<R> {
        OwnedSlices { slicer: self }
    }

    fn advance(&mut self) -> Result<Option<Step>, JournalError> {
        loop {
            if self.pos >= self.chunk_len {
                if self.eof {
                    return self.finish();
                }
                if !self.fill()? {
                    self.eof = true;
                    continue;
                }
                if self.pending_first {
                    self.pending_first = false;
                    if self.line_break.second() == Some(self.chunk[0]) {
                        // The parked byte plus chunk[0] form the delimiter.
                        let len = self.accum.len().saturating_sub(1);
                        self.pos = 1;
                        self.slice_start = self.chunk_offset.saturating_add(1);
                        return Ok(Some(Step::Accum(len)));
                    }
                }
            }

            match self.scan() {
                Scan::Found { at, len } => {
                    let start = self.pos;
                    let next = at.saturating_add(len);
                    self.pos = next;
                    let step = if self.accum.is_empty() {
                        self.check_length(at - start)?;
                        Step::Chunk(start, at)
                    } else {
                        self.accumulate(start, at)?;
                        Step::Accum(self.accum.len())
                    };
                    self.slice_start = self.chunk_offset.saturating_add(next as u64);
                    return Ok(Some(step));
                }
                Scan::Straddle { at } => {
                    self.accumulate(self.pos, at)?;
                    self.accum.push(self.line_break.first());
                    self.pending_first = true;
                    self.pos = self.chunk_len;
                }
                Scan::NotFound => {
                    self.accumulate(self.pos, self.chunk_len)?;
                    self.pos = self.chunk_len;
                }
            }
        }
    }

    fn scan(&self) -> Scan {
        let first = self.line_break.first();
        let mut from = self.pos;
        while let Some(rel) = self.chunk[from..self.chunk_len]
            .iter()
            .position(|&b| b == first)
        {
            let at = from + rel;
            match self.line_break.second() {
                None => return Scan::Found { at, len: 1 },
                Some(second) => {
                    if at + 1 == self.chunk_len {
                        return Scan::Straddle { at };
                    }
                    if self.chunk[at + 1] == second {
                        return Scan::Found { at, len: 2 };
                    }
                    from = at + 1;
                }
            }
        }
        Scan::NotFound
    }

    /// Copies `chunk[from..to]` into the accumulation buffer, enforcing the
    /// slice length limit.
    fn accumulate(&mut self, from: usize, to: usize) -> Result<(), JournalError> {
        let extra = to.saturating_sub(from);
        self.check_length(self.accum.len().saturating_add(extra))?;
        self.accum.extend_from_slice(&self.chunk[from..to]);
        Ok(())
    }

    #[inline]
    fn check_length(&self, length: usize) -> Result<(), JournalError> {
        if length > self.slice_maximum_length {
            return Err(JournalError::SliceTooLong {
                offset: self.slice_start,
                limit: self.slice_maximum_length,
            });
        }
        Ok(())
    }

    /// Reads the next chunk. Returns `false` at end of input.
    fn fill(&mut self) -> Result<bool, JournalError> {
        let n = loop {
            match self.source.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.chunk_offset = self.chunk_offset.saturating_add(self.chunk_len as u64);
        self.chunk_len = n;
        self.pos = 0;
        trace!(
            offset = self.chunk_offset,
            length = n,
            "slicer read chunk"
        );
        Ok(n > 0)
    }

    /// Handles end of input: whatever is left in the accumulation buffer
    /// is unterminated.
    fn finish(&mut self) -> Result<Option<Step>, JournalError> {
        self.pending_first = false;
        if self.accum.is_empty() {
            return Ok(None);
        }
        let length = self.accum.len();
        if !self.may_lack_trailing_break {
            return Err(JournalError::UnterminatedSlice {
                offset: self.slice_start,
                length,
            });
        }
        self.check_length(length)?;
        Ok(Some(Step::Accum(length)))
    }
}

impl<R> std::fmt::Debug for Slicer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slicer")
            .field("line_break", &self.line_break)
            .field("chunk_maximum_length", &self.chunk.len())
            .field("slice_maximum_length", &self.slice_maximum_length)
            .field("slices_emitted", &self.slices_emitted)
            .finish()
    }
}

/// An [`Iterator`] over owned slices, produced by [`Slicer::into_owned`].
#[derive(Debug)]
pub struct OwnedSlices<R> {
    slicer: Slicer<R>,
}

impl<R: Read> Iterator for OwnedSlices<R> {
    type Item = Result<Vec<u8>, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.slicer.next_slice() {
            Ok(Some(slice)) => Some(Ok(slice.to_vec())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

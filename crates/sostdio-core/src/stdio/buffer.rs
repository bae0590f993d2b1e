//! Single-block stream buffer.
//!
//! One fixed-capacity byte array serves both transfer directions. Which
//! interpretation currently applies is carried by [`BufferState`], so a
//! read cursor can never coexist with pending write data.
//!
//! Invariants:
//! - `Reading { cursor, filled }`: `cursor <= filled <= capacity`
//! - `Writing { pending }`: `pending <= capacity`
//! - capacity is fixed at creation and never zero

/// Default buffer capacity in bytes.
pub const BUFSIZ: usize = 4096;

/// How the buffer contents must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Nothing is buffered in either direction.
    #[default]
    Idle,
    /// `data[cursor..filled]` is read-ahead not yet handed to the caller.
    Reading { cursor: usize, filled: usize },
    /// `data[..pending]` was accepted from the caller but not yet written out.
    Writing { pending: usize },
}

/// Fixed-capacity buffer shared by the read and write paths.
#[derive(Debug)]
pub struct StreamBuffer {
    data: Box<[u8]>,
    state: BufferState,
}

impl StreamBuffer {
    /// Create an idle buffer. A zero capacity is bumped to one byte.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)].into_boxed_slice(),
            state: BufferState::Idle,
        }
    }

    /// Buffer capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current interpretation of the buffer.
    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_writing(&self) -> bool {
        matches!(self.state, BufferState::Writing { .. })
    }

    /// Discard everything and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = BufferState::Idle;
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Hand out the next unread byte, if the buffer holds one.
    pub fn next_byte(&mut self) -> Option<u8> {
        if let BufferState::Reading { cursor, filled } = &mut self.state
            && *cursor < *filled
        {
            let byte = self.data[*cursor];
            *cursor += 1;
            return Some(byte);
        }
        None
    }

    /// Number of read-ahead bytes not yet consumed.
    pub fn unread(&self) -> usize {
        match self.state {
            BufferState::Reading { cursor, filled } => filled - cursor,
            _ => 0,
        }
    }

    /// The whole backing array as the target of a bulk read.
    ///
    /// Whatever was buffered is dropped; call [`mark_filled`](Self::mark_filled)
    /// once the read returns.
    pub fn fill_target(&mut self) -> &mut [u8] {
        self.state = BufferState::Idle;
        &mut self.data
    }

    /// Record that a bulk read stored `count` bytes at the start of the buffer.
    pub fn mark_filled(&mut self, count: usize) {
        self.state = BufferState::Reading {
            cursor: 0,
            filled: count.min(self.data.len()),
        };
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Switch to the write interpretation, dropping any unread read-ahead.
    pub fn begin_write(&mut self) {
        if !self.is_writing() {
            self.state = BufferState::Writing { pending: 0 };
        }
    }

    /// Append one byte. Returns `false` if the buffer is full or not in
    /// the write state.
    pub fn push(&mut self, byte: u8) -> bool {
        match &mut self.state {
            BufferState::Writing { pending } if *pending < self.data.len() => {
                self.data[*pending] = byte;
                *pending += 1;
                true
            }
            _ => false,
        }
    }

    /// True when no more bytes can be appended without a flush.
    pub fn is_full(&self) -> bool {
        matches!(self.state, BufferState::Writing { pending } if pending == self.data.len())
    }

    /// Number of bytes awaiting a flush.
    pub fn pending(&self) -> usize {
        match self.state {
            BufferState::Writing { pending } => pending,
            _ => 0,
        }
    }

    /// Bytes awaiting a flush, oldest first.
    pub fn pending_write_data(&self) -> &[u8] {
        &self.data[..self.pending()]
    }

    /// Drop the first `count` pending bytes after they reached the device,
    /// keeping the unwritten tail at the front of the buffer.
    pub fn consume_flushed(&mut self, count: usize) {
        if let BufferState::Writing { pending } = &mut self.state {
            let count = count.min(*pending);
            self.data.copy_within(count..*pending, 0);
            *pending -= count;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

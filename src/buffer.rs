use std::io::{self, IoSliceMut, Read, Write};

use crate::prelude::EXTRA_READ_SIZE;

/// Growable byte arena with a readable window between `read_pos` and
/// `write_pos`. Appends compact the arena before growing it.
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Buffer {
    pub fn new(init_size: usize) -> Self {
        Buffer {
            data: vec![0; init_size],
            read_pos: 0,
            write_pos: 0,
        }
    }

    pub fn readable_bytes(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn writable_bytes(&self) -> usize {
        self.data.len() - self.write_pos
    }

    pub fn prependable_bytes(&self) -> usize {
        self.read_pos
    }

    /// The unread region.
    pub fn peek(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    pub fn has_read(&mut self, len: usize) {
        assert!(len <= self.readable_bytes());
        self.read_pos += len;
    }

    /// Consumes everything before `offset` into the unread region.
    pub fn has_read_until(&mut self, offset: usize) {
        self.has_read(offset);
    }

    pub fn has_written(&mut self, len: usize) {
        assert!(len <= self.writable_bytes());
        self.write_pos += len;
    }

    pub fn reset(&mut self) {
        self.data.fill(0);
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Returns the unread region as a string and resets the buffer.
    pub fn take_string(&mut self) -> String {
        let s = String::from_utf8_lossy(self.peek()).into_owned();
        self.reset();
        s
    }

    pub fn append(&mut self, data: &[u8]) {
        self.ensure_writable(data.len());
        self.data[self.write_pos..self.write_pos + data.len()].copy_from_slice(data);
        self.write_pos += data.len();
    }

    pub fn append_buffer(&mut self, other: &Buffer) {
        self.append(other.peek());
    }

    pub fn ensure_writable(&mut self, len: usize) {
        if self.writable_bytes() < len {
            self.expand(len);
        }
        assert!(self.writable_bytes() >= len);
    }

    /// Gather-read: one syscall fills the writable region first, then a
    /// stack segment whose contents get appended (growing the arena) when
    /// the kernel returned more than the region held.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let mut extra = [0u8; EXTRA_READ_SIZE];
        let writable = self.writable_bytes();
        let n = {
            let (_, tail) = self.data.split_at_mut(self.write_pos);
            let mut segments = [IoSliceMut::new(tail), IoSliceMut::new(&mut extra)];
            reader.read_vectored(&mut segments)?
        };
        if n <= writable {
            self.write_pos += n;
        } else {
            self.write_pos = self.data.len();
            self.append(&extra[..n - writable]);
        }
        Ok(n)
    }

    /// Writes the unread region out and advances past what was taken.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        let n = writer.write(self.peek())?;
        self.read_pos += n;
        Ok(n)
    }

    /// Shift the unread region to the front if that frees enough room,
    /// otherwise grow the arena.
    fn expand(&mut self, len: usize) {
        if self.data.len() - self.readable_bytes() < len {
            self.data.resize(self.write_pos + len + 1, 0);
        } else {
            let readable = self.readable_bytes();
            self.data.copy_within(self.read_pos..self.write_pos, 0);
            self.read_pos = 0;
            self.write_pos = readable;
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new(1024)
    }
}

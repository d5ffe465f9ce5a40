//! Scoped standard-output capture
//!
//! The runner owns one [`StdoutSlot`]: the sink fragment output currently
//! goes to. A [`Redirect`] swaps an in-memory buffer into the slot and puts
//! the original sink back when dropped, on every exit path. Only one
//! redirect may hold the slot at a time.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::{Error, Result};

/// Cloneable in-memory sink; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The output sink fragments print to
pub struct StdoutSlot {
    sink: RefCell<Box<dyn Write>>,
    redirected: Cell<bool>,
}

impl fmt::Debug for StdoutSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutSlot")
            .field("redirected", &self.redirected.get())
            .finish_non_exhaustive()
    }
}

impl Default for StdoutSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutSlot {
    /// Slot backed by the process's standard output
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(io::stdout())
    }

    /// Slot backed by an arbitrary sink
    #[must_use]
    pub fn with_sink(sink: impl Write + 'static) -> Self {
        Self {
            sink: RefCell::new(Box::new(sink)),
            redirected: Cell::new(false),
        }
    }

    /// Whether a redirect currently holds the slot
    #[must_use]
    pub fn is_redirected(&self) -> bool {
        self.redirected.get()
    }

    /// Divert the slot into a fresh buffer until the guard drops
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if another redirect already holds the slot.
    pub fn redirect(&self) -> Result<Redirect<'_>> {
        if self.redirected.replace(true) {
            return Err(Error::Capture(
                "standard output is already redirected".to_string(),
            ));
        }
        let buffer = SharedBuffer::new();
        let original = self.sink.replace(Box::new(buffer.clone()));
        Ok(Redirect {
            slot: self,
            original: Some(original),
            buffer,
        })
    }

    /// Writer that forwards to whatever sink the slot holds right now
    #[must_use]
    pub fn writer(&self) -> SlotWriter<'_> {
        SlotWriter { slot: self }
    }
}

/// Write handle onto a [`StdoutSlot`]
#[derive(Debug)]
pub struct SlotWriter<'a> {
    slot: &'a StdoutSlot,
}

impl Write for SlotWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.slot.sink.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.slot.sink.borrow_mut().flush()
    }
}

/// Guard holding a [`StdoutSlot`] redirected into a buffer
pub struct Redirect<'a> {
    slot: &'a StdoutSlot,
    original: Option<Box<dyn Write>>,
    buffer: SharedBuffer,
}

impl fmt::Debug for Redirect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redirect")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Redirect<'_> {
    /// Output captured so far
    #[must_use]
    pub fn captured(&self) -> String {
        self.buffer.contents()
    }
}

impl Drop for Redirect<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.slot.sink.replace(original);
        }
        self.slot.redirected.set(false);
    }
}

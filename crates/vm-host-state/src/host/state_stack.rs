//! # State Stack
//!
//! LIFO of saved snapshots, one pushed per nested call entry.
//!
//! Used by the storage context, the output accumulator and the gas meter.
//! Popping an empty stack is a no-op and returns `None`.

/// A last-in-first-out stack of snapshots.
#[derive(Clone, Debug)]
pub struct StateStack<T> {
    frames: Vec<T>,
}

impl<T> Default for StateStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StateStack<T> {
    /// Creates a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: Vec::with_capacity(8),
        }
    }

    /// Returns the number of saved snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no snapshot is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Saves a snapshot.
    pub fn push(&mut self, snapshot: T) {
        self.frames.push(snapshot);
    }

    /// Removes the most recent snapshot.
    pub fn pop(&mut self) -> Option<T> {
        self.frames.pop()
    }

    /// The most recent snapshot.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.frames.last()
    }

    /// Mutable access to the most recent snapshot.
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.frames.last_mut()
    }

    /// Snapshots from newest to oldest.
    pub fn iter_from_top(&self) -> impl Iterator<Item = &T> {
        self.frames.iter().rev()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

use std::fmt::Debug;

use derive_more::{Add, AddAssign};

/// Number of bytes consumed from the input.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default, Add, AddAssign)]
#[repr(transparent)]
pub struct ByteNum(usize);

impl ByteNum {
    pub const ZERO: ByteNum = ByteNum(0);

    #[inline]
    #[must_use]
    pub const fn new(bytes: usize) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Receives progress updates from a [`ReadStream`](crate::stream::ReadStream).
pub trait ProgressNotifier: Debug {
    fn processed_bytes(&self, bytes: ByteNum);

    fn inc_records(&self);
}

impl<T: ProgressNotifier> ProgressNotifier for &T {
    fn processed_bytes(&self, bytes: ByteNum) {
        T::processed_bytes(self, bytes)
    }

    fn inc_records(&self) {
        T::inc_records(self)
    }
}

#[derive(Clone, Debug)]
pub struct DummyProgressNotifier;

impl ProgressNotifier for DummyProgressNotifier {
    fn processed_bytes(&self, _bytes: ByteNum) {
        // do nothing
    }

    fn inc_records(&self) {
        // do nothing
    }
}

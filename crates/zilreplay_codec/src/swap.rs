//! In-place byte-order conversion.

use crate::error::{CodecError, CodecResult};

/// Which way a [`ByteSwapper`] converts.
///
/// Converting a record means swapping fields whose extent depends on counts
/// stored in the same record. The count must be read in host order, so the
/// direction decides whether a field is read after it is swapped (foreign
/// input) or before (host input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// The buffer is in the opposite byte order and is converted to host order.
    ToHost,
    /// The buffer is in host order and is converted to the opposite order.
    ToForeign,
}

/// A cursor that reverses fields in place.
///
/// Each `swap_*` method converts one field, advances past it and returns the
/// field's host-order value regardless of direction, so callers can size the
/// next structure from it.
#[derive(Debug)]
pub struct ByteSwapper<'a> {
    data: &'a mut [u8],
    pos: usize,
    direction: SwapDirection,
}

macro_rules! swap_field {
    ($name:ident, $ty:ty, $len:expr) => {
        #[doc = concat!("Swaps one `", stringify!($ty), "` and returns its host-order value.")]
        pub fn $name(&mut self) -> CodecResult<$ty> {
            let direction = self.direction;
            let field = self.field($len)?;
            let mut bytes = [0u8; $len];
            match direction {
                SwapDirection::ToHost => {
                    field.reverse();
                    bytes.copy_from_slice(field);
                }
                SwapDirection::ToForeign => {
                    bytes.copy_from_slice(field);
                    field.reverse();
                }
            }
            Ok(<$ty>::from_le_bytes(bytes))
        }
    };
}

impl<'a> ByteSwapper<'a> {
    /// Creates a swapper positioned at the start of `data`.
    pub fn new(data: &'a mut [u8], direction: SwapDirection) -> Self {
        Self {
            data,
            pos: 0,
            direction,
        }
    }

    /// Returns the conversion direction.
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    /// Returns the number of bytes visited so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes not yet visited.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn field(&mut self, len: usize) -> CodecResult<&mut [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::truncated(self.pos, len, available));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&mut self.data[start..start + len])
    }

    swap_field!(swap_u16, u16, 2);
    swap_field!(swap_u32, u32, 4);
    swap_field!(swap_u64, u64, 8);

    /// Swaps `count` consecutive `u32` values.
    pub fn swap_u32_array(&mut self, count: usize) -> CodecResult<()> {
        self.ensure(count.saturating_mul(4))?;
        for _ in 0..count {
            self.swap_u32()?;
        }
        Ok(())
    }

    /// Swaps `count` consecutive `u64` words.
    pub fn swap_u64_array(&mut self, count: usize) -> CodecResult<()> {
        self.ensure(count.saturating_mul(8))?;
        for _ in 0..count {
            self.swap_u64()?;
        }
        Ok(())
    }

    /// Swaps `N` consecutive `u64` words and returns their host values.
    pub fn swap_words<const N: usize>(&mut self) -> CodecResult<[u64; N]> {
        self.ensure(N * 8)?;
        let mut words = [0u64; N];
        for word in &mut words {
            *word = self.swap_u64()?;
        }
        Ok(words)
    }

    /// Steps over `len` bytes that are not byte-order sensitive.
    pub fn skip(&mut self, len: usize) -> CodecResult<()> {
        self.field(len).map(|_| ())
    }

    /// Runs `f` over a swapper restricted to the next `len` bytes, then
    /// advances past them.
    pub fn nested<R>(
        &mut self,
        len: usize,
        f: impl FnOnce(&mut ByteSwapper<'_>) -> CodecResult<R>,
    ) -> CodecResult<R> {
        let direction = self.direction;
        let start = self.pos;
        let region = self.field(len)?;
        let mut inner = ByteSwapper::new(region, direction);
        f(&mut inner).map_err(|err| match err {
            CodecError::Truncated {
                offset,
                needed,
                available,
            } => CodecError::truncated(start + offset, needed, available),
            other => other,
        })
    }

    fn ensure(&self, len: usize) -> CodecResult<()> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::truncated(self.pos, len, available));
        }
        Ok(())
    }
}

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::layout::NativeRecord;

/// Bounds-checked view over `len` consecutive native records of type `T`
/// starting at a base address. Offsets are always `index * stride` with
/// `index < len`; nothing past the last slot is ever touched.
pub struct Records<'buf, T: NativeRecord> {
    base: NonNull<u8>,
    len: usize,
    next: usize,
    _buf: PhantomData<&'buf [T]>,
}

impl<'buf, T: NativeRecord> Records<'buf, T> {
    pub const STRIDE: usize = std::mem::size_of::<T>();

    /// Returns `None` for a null or misaligned base.
    ///
    /// # Safety
    ///
    /// A non-null `base` must point at `len` initialised `T` laid out back to
    /// back, valid for reads for the whole of `'buf`.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw(base: *const u8, len: usize) -> Option<Self> {
        let base = NonNull::new(base.cast_mut())?;
        if !base.as_ptr().cast::<T>().is_aligned() {
            tracing::warn!(
                record = std::any::type_name::<T>(),
                "refusing to decode misaligned native buffer"
            );
            return None;
        }
        Some(Self {
            base,
            len,
            next: 0,
            _buf: PhantomData,
        })
    }

    pub fn empty() -> Self {
        Self {
            base: NonNull::<T>::dangling().cast(),
            len: 0,
            next: 0,
            _buf: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stride(&self) -> usize {
        Self::STRIDE
    }

    #[allow(unsafe_code)]
    pub fn get(&self, index: usize) -> Option<&'buf T> {
        if index >= self.len {
            return None;
        }
        let offset = index.checked_mul(Self::STRIDE)?;
        // SAFETY: index < len, and from_raw's contract covers every slot below len.
        Some(unsafe { &*self.base.as_ptr().add(offset).cast::<T>() })
    }
}

impl<'buf, T: NativeRecord> Iterator for Records<'buf, T> {
    type Item = &'buf T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.get(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<T: NativeRecord> ExactSizeIterator for Records<'_, T> {}

impl<T: NativeRecord> FusedIterator for Records<'_, T> {}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::Records;
    use crate::native::layout::{Luid, NativeRecord};

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Slot {
        tag: u32,
        wide: u64,
        short: u16,
    }

    impl NativeRecord for Slot {}

    fn slots(n: u32) -> Vec<Slot> {
        (0..n)
            .map(|i| Slot {
                tag: i,
                wide: (u64::from(i) << 40) | 0xabcd,
                short: u16::try_from(i % 7).unwrap_or(0),
            })
            .collect()
    }

    #[test]
    fn decodes_exactly_n_records_per_slot() {
        for n in [0u32, 1, 2, 17] {
            let written = slots(n);
            let Some(records) =
                (unsafe { Records::<Slot>::from_raw(written.as_ptr().cast(), written.len()) })
            else {
                panic!("non-null base rejected");
            };
            assert_eq!(records.len(), written.len());
            assert_eq!(records.stride(), std::mem::size_of::<Slot>());
            let decoded: Vec<Slot> = records.copied().collect();
            assert_eq!(decoded, written);
        }
    }

    #[test]
    fn get_refuses_indexes_past_count() {
        let written = vec![Luid::new(1, 0), Luid::new(2, 0), Luid::new(3, 0)];
        let Some(records) =
            (unsafe { Records::<Luid>::from_raw(written.as_ptr().cast(), 2) })
        else {
            panic!("non-null base rejected");
        };
        assert_eq!(records.get(1), Some(&Luid::new(2, 0)));
        assert!(records.get(2).is_none());
        assert_eq!(records.count(), 2);
    }

    #[test]
    fn null_base_is_not_a_view() {
        assert!(unsafe { Records::<Luid>::from_raw(std::ptr::null(), 4) }.is_none());
    }

    #[test]
    fn misaligned_base_is_not_a_view() {
        let backing = [0u64; 4];
        let skewed = unsafe { backing.as_ptr().cast::<u8>().add(1) };
        assert!(unsafe { Records::<Luid>::from_raw(skewed, 1) }.is_none());
    }
}

//! Quadratic probing with tombstones.
//!
//! Probe increments follow the triangular numbers (`+1, +2, +3, …`),
//! which visit every slot of a power-of-two table exactly once. Removal
//! leaves a tombstone so later lookups keep probing past the hole;
//! tombstones are reclaimed by an in-place rehash once they outnumber
//! half the table.

use core::mem::MaybeUninit;
use core::ptr;

use super::raw::{max_entries, round_capacity, RawStorage, RehashBitmap};
use crate::fortify_check;

const EMPTY_HASH: u32 = 0;
const TOMBSTONE_HASH: u32 = 1;
const MIN_VALID_HASH: u32 = 2;

/// Open-addressed table with triangular-number quadratic probing; see the
/// module docs.
pub struct QuadraticTable<E> {
    raw: RawStorage<E, u32>,
    capacity: u32,
    /// Capacity whose metadata offset the metadata region currently
    /// occupies; trails `capacity` inside a shrink.
    meta_capacity: u32,
    num_entries: u32,
    num_tombstones: u32,
    max_entries: u32,
    threshold: u32,
}

struct ProbeIter {
    index: u32,
    increment: u32,
    mask: u32,
}

impl ProbeIter {
    #[inline]
    fn start(home: u32, capacity: u32) -> Self {
        Self {
            index: home,
            increment: 0,
            mask: capacity - 1,
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.increment += 1;
        self.index = self.index.wrapping_add(self.increment) & self.mask;
    }
}

impl<E> QuadraticTable<E> {
    /// A table with room for `capacity` slots (rounded up to a power of
    /// two ≥ 8). `threshold` ∈ 5..=9 is the max load factor in tenths.
    pub fn new(capacity: u32, threshold: u32) -> Self {
        fortify_check!((5..=9).contains(&threshold));
        let capacity = round_capacity(capacity);
        let mut table = Self {
            raw: RawStorage::new(capacity),
            capacity,
            meta_capacity: capacity,
            num_entries: 0,
            num_tombstones: 0,
            max_entries: max_entries(capacity, threshold),
            threshold,
        };
        unsafe {
            for i in 0..capacity {
                table.metadata_ptr(i).write(EMPTY_HASH);
            }
        }
        table
    }

    /// Number of live entries.
    #[inline]
    pub fn num_entries(&self) -> u32 {
        self.num_entries
    }

    /// Current slot count.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    unsafe fn metadata_ptr(&self, index: u32) -> *mut u32 {
        self.raw.metadata_ptr(self.meta_capacity, index)
    }

    #[inline]
    unsafe fn stored_hash(&self, index: u32) -> u32 {
        self.metadata_ptr(index).read()
    }

    /// Map the caller's 32-bit hash away from the two metadata sentinels,
    /// preserving collision behavior.
    #[inline]
    fn sanitize_hash(hash: u32) -> u32 {
        if hash < MIN_VALID_HASH {
            hash.wrapping_sub(MIN_VALID_HASH)
        } else {
            hash
        }
    }

    #[inline]
    fn hash_to_index(&self, hash: u32) -> u32 {
        hash & (self.capacity - 1)
    }

    /// Shared access to the entry at a live index.
    pub fn entry(&self, index: u32) -> &E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!(self.stored_hash(index) >= MIN_VALID_HASH);
            &*self.raw.entry_ptr(index)
        }
    }

    /// Exclusive access to the entry at a live index. The caller must not
    /// alter whatever the key-match function inspects.
    pub fn entry_mut(&mut self, index: u32) -> &mut E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!(self.stored_hash(index) >= MIN_VALID_HASH);
            &mut *self.raw.entry_ptr(index)
        }
    }

    /// Index of the live entry with this hash whose entry satisfies
    /// `keys_match`. The probe stops at the first empty slot, skipping
    /// tombstones.
    pub fn lookup<F: Fn(&E) -> bool>(&self, hash: u32, keys_match: F) -> Option<u32> {
        let hash = Self::sanitize_hash(hash);
        let mut iter = ProbeIter::start(self.hash_to_index(hash), self.capacity);
        unsafe {
            loop {
                let index = iter.index;
                let stored = self.stored_hash(index);
                if stored == EMPTY_HASH {
                    return None;
                }
                if stored == hash && keys_match(&*self.raw.entry_ptr(index)) {
                    return Some(index);
                }
                iter.advance();
            }
        }
    }

    /// First live slot at or after `start`, in physical order.
    fn next_live(&self, start: u32) -> Option<u32> {
        (start..self.capacity).find(|&i| unsafe { self.stored_hash(i) } >= MIN_VALID_HASH)
    }

    /// Iterate the live entries in increasing bucket order. Mutating the
    /// table invalidates the iterator (the borrow checker enforces it).
    pub fn iter(&self) -> impl Iterator<Item = (u32, &E)> {
        let mut next = self.next_live(0);
        core::iter::from_fn(move || {
            let index = next?;
            next = self.next_live(index + 1);
            Some((index, unsafe { &*self.raw.entry_ptr(index) }))
        })
    }

    /// Claim a slot for `hash` along the probe sequence (first empty or
    /// tombstone slot).
    unsafe fn do_insert(&mut self, hash: u32) -> u32 {
        let mut iter = ProbeIter::start(self.hash_to_index(hash), self.capacity);
        loop {
            let index = iter.index;
            let m = self.metadata_ptr(index);
            if m.read() < MIN_VALID_HASH {
                if m.read() == TOMBSTONE_HASH {
                    self.num_tombstones -= 1;
                }
                m.write(hash);
                return index;
            }
            iter.advance();
        }
    }

    /// Insert an entry under `hash` and return its slot index.
    ///
    /// The caller must have established (normally by a preceding
    /// [`lookup`](QuadraticTable::lookup)) that no live entry with an
    /// equal key exists.
    pub fn insert(&mut self, hash: u32, entry: E) -> u32 {
        let hash = Self::sanitize_hash(hash);
        self.num_entries += 1;
        if self.num_entries + self.num_tombstones > self.max_entries {
            self.grow(2 * self.capacity);
        }
        unsafe {
            let index = self.do_insert(hash);
            self.raw.entry_ptr(index).write(entry);
            index
        }
    }

    /// Remove and return the entry at a live index. Leaves a tombstone;
    /// shrinks when the table gets sparse, rehashes in place when
    /// tombstones accumulate.
    pub fn remove(&mut self, index: u32) -> E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!(self.stored_hash(index) >= MIN_VALID_HASH);
            let entry = self.raw.entry_ptr(index).read();
            self.metadata_ptr(index).write(TOMBSTONE_HASH);
            self.num_entries -= 1;
            self.num_tombstones += 1;
            if self.num_entries < self.capacity / 8 {
                self.shrink(self.capacity / 4);
            } else if self.num_tombstones > self.capacity / 2 {
                self.grow(self.capacity);
            }
            entry
        }
    }

    /// Drop every entry and reset all slots to empty, keeping the
    /// allocation.
    pub fn clear(&mut self) {
        unsafe {
            for i in 0..self.capacity {
                let m = self.metadata_ptr(i);
                if m.read() >= MIN_VALID_HASH {
                    ptr::drop_in_place(self.raw.entry_ptr(i));
                }
                m.write(EMPTY_HASH);
            }
        }
        self.num_entries = 0;
        self.num_tombstones = 0;
    }

    /// Resize to at least `new_capacity` slots (raised as needed so the
    /// load limit still admits the current entries).
    pub fn resize(&mut self, new_capacity: u32) {
        let mut new_capacity = round_capacity(new_capacity);
        while max_entries(new_capacity, self.threshold) < self.num_entries {
            new_capacity *= 2;
        }
        if new_capacity < self.capacity {
            self.shrink(new_capacity);
        } else {
            self.grow(new_capacity);
        }
    }

    /// Reinsert one displaced entry during an in-place rehash. Returns
    /// `true` when it displaced another not-yet-rehashed entry into
    /// `hash`/`entry`.
    unsafe fn insert_during_resize(
        &mut self,
        hash: &mut u32,
        entry: *mut E,
        bitmap: &mut RehashBitmap,
    ) -> bool {
        let mut iter = ProbeIter::start(self.hash_to_index(*hash), self.capacity);
        loop {
            let index = iter.index;
            let m = self.metadata_ptr(index);
            if m.read() < MIN_VALID_HASH {
                bitmap.mark_rehashed(index);
                m.write(*hash);
                ptr::copy_nonoverlapping(entry, self.raw.entry_ptr(index), 1);
                return false;
            }

            if bitmap.needs_rehash(index) {
                bitmap.mark_rehashed(index);
                // swap: the displaced entry becomes the one to insert
                let tmp_hash = m.read();
                let mut tmp = MaybeUninit::<E>::uninit();
                ptr::copy_nonoverlapping(self.raw.entry_ptr(index), tmp.as_mut_ptr(), 1);

                m.write(*hash);
                ptr::copy_nonoverlapping(entry, self.raw.entry_ptr(index), 1);

                *hash = tmp_hash;
                ptr::copy_nonoverlapping(tmp.as_ptr(), entry, 1);

                return true;
            }
            iter.advance();
        }
    }

    /// Rehash every slot of the old region into the current capacity.
    /// Each displacement chain consumes one not-yet-rehashed slot, so it
    /// terminates.
    unsafe fn resize_common(&mut self, old_capacity: u32) {
        let mut bitmap = RehashBitmap::new(old_capacity.max(self.capacity));
        let mut entry = MaybeUninit::<E>::uninit();
        for index in 0..old_capacity {
            let m = self.metadata_ptr(index);
            if m.read() < MIN_VALID_HASH {
                m.write(EMPTY_HASH);
                continue;
            }
            if !bitmap.needs_rehash(index) {
                continue;
            }
            let mut hash = m.read();
            if self.hash_to_index(hash) == index {
                bitmap.mark_rehashed(index);
                continue;
            }
            m.write(EMPTY_HASH);
            ptr::copy_nonoverlapping(self.raw.entry_ptr(index), entry.as_mut_ptr(), 1);

            while self.insert_during_resize(&mut hash, entry.as_mut_ptr(), &mut bitmap) {}
        }
    }

    fn shrink(&mut self, new_capacity: u32) {
        let new_capacity = new_capacity.max(8);
        if new_capacity >= self.capacity {
            return;
        }
        let old_capacity = self.capacity;
        self.capacity = new_capacity;
        self.num_tombstones = 0;

        unsafe {
            self.resize_common(old_capacity);

            // pull the metadata region back next to the shrunk entries
            // region before giving the memory back
            let old_metadata = self.raw.metadata_ptr(self.meta_capacity, 0);
            let new_metadata = self.raw.metadata_ptr(new_capacity, 0);
            ptr::copy(old_metadata, new_metadata, new_capacity as usize);
        }
        self.meta_capacity = new_capacity;
        self.raw.realloc_to(new_capacity);
        self.max_entries = max_entries(new_capacity, self.threshold);
    }

    fn grow(&mut self, new_capacity: u32) {
        debug_assert!(new_capacity >= self.capacity);
        let old_capacity = self.capacity;
        self.capacity = new_capacity;
        self.num_tombstones = 0;
        self.raw.realloc_to(new_capacity);
        self.max_entries = max_entries(new_capacity, self.threshold);

        unsafe {
            // the entries region expands over the old metadata: move the
            // metadata out to its new offset first (memmove — the regions
            // can overlap when the metadata outweighs the entries)
            let old_metadata = self.raw.metadata_ptr(self.meta_capacity, 0);
            let new_metadata = self.raw.metadata_ptr(new_capacity, 0);
            ptr::copy(old_metadata, new_metadata, old_capacity as usize);
            self.meta_capacity = new_capacity;
            for i in old_capacity..new_capacity {
                self.metadata_ptr(i).write(EMPTY_HASH);
            }

            self.resize_common(old_capacity);
        }
    }
}

impl<E> Drop for QuadraticTable<E> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<E>() {
            unsafe {
                for i in 0..self.capacity {
                    if self.stored_hash(i) >= MIN_VALID_HASH {
                        ptr::drop_in_place(self.raw.entry_ptr(i));
                    }
                }
            }
        }
    }
}

// SAFETY: the table owns its storage exclusively.
unsafe impl<E: Send> Send for QuadraticTable<E> {}
unsafe impl<E: Sync> Sync for QuadraticTable<E> {}

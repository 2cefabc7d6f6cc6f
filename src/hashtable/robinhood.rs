//! Robin Hood probing with backward-shift removal.
//!
//! Probe distances are reconstructed from the stored hashes
//! (`(index − home) mod capacity`), so the metadata is one word per slot
//! and there are no tombstones: on insert a "rich" resident (small probe
//! distance) yields its slot to the "poor" incoming entry (larger
//! distance) and is itself reinserted further along; on removal the
//! following cluster shifts one slot back toward home.
//!
//! `hash_to_index` multiplies by 11 before masking: for identity-hashed
//! integer keys this decorrelates adjacent hashes, which measurably
//! improves the distribution. Do not drop the multiplier.

use core::mem::MaybeUninit;
use core::ptr;

use super::raw::{max_entries, round_capacity, RawStorage, RehashBitmap};
use crate::fortify_check;

const EMPTY_HASH: u32 = 0;
const MIN_VALID_HASH: u32 = 1;

/// Open-addressed table with Robin Hood probing; see the module docs.
pub struct RobinHoodTable<E> {
    raw: RawStorage<E, u32>,
    capacity: u32,
    /// Capacity whose metadata offset the metadata region currently
    /// occupies; trails `capacity` inside a shrink.
    meta_capacity: u32,
    num_entries: u32,
    max_entries: u32,
    threshold: u32,
}

impl<E> RobinHoodTable<E> {
    /// A table with room for `capacity` slots (rounded up to a power of
    /// two ≥ 8). `threshold` ∈ 5..=9 is the max load factor in tenths.
    pub fn new(capacity: u32, threshold: u32) -> Self {
        fortify_check!((5..=9).contains(&threshold));
        let capacity = round_capacity(capacity);
        let table = Self {
            raw: RawStorage::new(capacity),
            capacity,
            meta_capacity: capacity,
            num_entries: 0,
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
        11u32.wrapping_mul(hash) & (self.capacity - 1)
    }

    #[inline]
    fn wrap_add(&self, start: u32, i: u32) -> u32 {
        start.wrapping_add(i) & (self.capacity - 1)
    }

    /// Probe distance of the live entry at `index`.
    #[inline]
    unsafe fn distance(&self, index: u32) -> u32 {
        index.wrapping_sub(self.hash_to_index(self.stored_hash(index))) & (self.capacity - 1)
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
    /// `keys_match`. The probe stops at the first empty slot or at a
    /// resident closer to its home than the probe is long.
    pub fn lookup<F: Fn(&E) -> bool>(&self, hash: u32, keys_match: F) -> Option<u32> {
        let hash = Self::sanitize_hash(hash);
        let start = self.hash_to_index(hash);
        unsafe {
            let mut i = 0u32;
            loop {
                let index = self.wrap_add(start, i);
                let stored = self.stored_hash(index);
                if stored == EMPTY_HASH {
                    return None;
                }
                if self.distance(index) < i {
                    return None;
                }
                if stored == hash && keys_match(&*self.raw.entry_ptr(index)) {
                    return Some(index);
                }
                i += 1;
            }
        }
    }

    fn next_live(&self, start: u32) -> Option<u32> {
        (start..self.capacity).find(|&i| unsafe { self.stored_hash(i) } >= MIN_VALID_HASH)
    }

    /// Iterate the live entries in increasing bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &E)> {
        let mut next = self.next_live(0);
        core::iter::from_fn(move || {
            let index = next?;
            next = self.next_live(index + 1);
            Some((index, unsafe { &*self.raw.entry_ptr(index) }))
        })
    }

    /// Insert `hash`/`entry` starting at `start` with an assumed probe
    /// distance, swapping with any richer resident along the way. With a
    /// rehash bitmap, returns `true` as soon as a not-yet-rehashed
    /// resident was displaced into `hash`/`entry`.
    unsafe fn insert_robin_hood(
        &mut self,
        start: u32,
        mut distance: u32,
        hash: &mut u32,
        entry: *mut E,
        mut bitmap: Option<&mut RehashBitmap>,
    ) -> bool {
        let mut tmp = MaybeUninit::<E>::uninit();
        let mut i = 0u32;
        loop {
            let index = self.wrap_add(start, i);
            let m = self.metadata_ptr(index);
            if m.read() == EMPTY_HASH {
                if let Some(b) = bitmap.as_deref_mut() {
                    b.mark_rehashed(index);
                }
                m.write(*hash);
                ptr::copy_nonoverlapping(entry, self.raw.entry_ptr(index), 1);
                return false;
            }

            let needs = bitmap
                .as_deref()
                .map_or(false, |b| b.needs_rehash(index));
            let d = if needs { 0 } else { self.distance(index) };
            if needs || d < distance {
                // the rich yield to the poor: swap and keep inserting the
                // displaced resident
                let tmp_hash = m.read();
                ptr::copy_nonoverlapping(self.raw.entry_ptr(index), tmp.as_mut_ptr(), 1);

                m.write(*hash);
                ptr::copy_nonoverlapping(entry, self.raw.entry_ptr(index), 1);

                *hash = tmp_hash;
                ptr::copy_nonoverlapping(tmp.as_ptr(), entry, 1);

                if needs {
                    if let Some(b) = bitmap.as_deref_mut() {
                        b.mark_rehashed(index);
                    }
                    return true;
                }

                distance = d;
            }
            i += 1;
            distance += 1;
        }
    }

    /// Claim a slot for `hash` along the probe sequence, displacing a
    /// richer resident if one is met.
    unsafe fn do_insert(&mut self, hash: u32) -> u32 {
        let mut start = self.hash_to_index(hash);
        let mut index;
        let mut i = 0u32;
        loop {
            index = self.wrap_add(start, i);
            let m = self.metadata_ptr(index);
            if m.read() == EMPTY_HASH {
                break;
            }
            let d = self.distance(index);
            if d < i {
                // evict the richer resident and reinsert it downstream;
                // its entry bytes pass through this slot until the caller
                // overwrites it
                let mut h = self.stored_hash(index);
                let entry = self.raw.entry_ptr(index);
                start = self.wrap_add(start, i + 1);
                self.insert_robin_hood(start, d + 1, &mut h, entry, None);
                break;
            }
            i += 1;
        }
        self.metadata_ptr(index).write(hash);
        index
    }

    /// Insert an entry under `hash` and return its slot index.
    ///
    /// The caller must have established (normally by a preceding
    /// [`lookup`](RobinHoodTable::lookup)) that no live entry with an
    /// equal key exists.
    pub fn insert(&mut self, hash: u32, entry: E) -> u32 {
        let hash = Self::sanitize_hash(hash);
        self.num_entries += 1;
        if self.num_entries > self.max_entries {
            self.grow(2 * self.capacity);
        }
        unsafe {
            let index = self.do_insert(hash);
            self.raw.entry_ptr(index).write(entry);
            index
        }
    }

    /// Remove and return the entry at a live index, backward-shifting the
    /// following cluster one slot toward home.
    pub fn remove(&mut self, index: u32) -> E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!(self.stored_hash(index) >= MIN_VALID_HASH);
            let entry = self.raw.entry_ptr(index).read();
            self.metadata_ptr(index).write(EMPTY_HASH);
            self.num_entries -= 1;
            if self.num_entries < self.capacity / 8 {
                self.shrink(self.capacity / 4);
            } else {
                let mut i = 0u32;
                loop {
                    let current = self.wrap_add(index, i);
                    let next = self.wrap_add(index, i + 1);
                    let next_hash = self.stored_hash(next);
                    if next_hash == EMPTY_HASH || self.distance(next) == 0 {
                        self.metadata_ptr(current).write(EMPTY_HASH);
                        break;
                    }
                    self.metadata_ptr(current).write(next_hash);
                    ptr::copy_nonoverlapping(
                        self.raw.entry_ptr(next),
                        self.raw.entry_ptr(current),
                        1,
                    );
                    i += 1;
                }
            }
            entry
        }
    }

    /// Drop every entry and reset all slots, keeping the allocation.
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

    /// Rehash every slot of the old region into the current capacity.
    unsafe fn resize_common(&mut self, old_capacity: u32, bitmap: &mut RehashBitmap) {
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
            let mut optimal_index = self.hash_to_index(hash);
            if optimal_index == index {
                bitmap.mark_rehashed(index);
                continue;
            }
            m.write(EMPTY_HASH);
            ptr::copy_nonoverlapping(self.raw.entry_ptr(index), entry.as_mut_ptr(), 1);

            loop {
                let need_rehash = self.insert_robin_hood(
                    optimal_index,
                    0,
                    &mut hash,
                    entry.as_mut_ptr(),
                    Some(bitmap),
                );
                if !need_rehash {
                    break;
                }
                optimal_index = self.hash_to_index(hash);
            }
        }
    }

    fn shrink(&mut self, new_capacity: u32) {
        let new_capacity = new_capacity.max(8);
        if new_capacity >= self.capacity {
            return;
        }
        let old_capacity = self.capacity;
        self.capacity = new_capacity;

        unsafe {
            let mut bitmap = RehashBitmap::new(old_capacity);
            self.resize_common(old_capacity, &mut bitmap);

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
        self.raw.realloc_to(new_capacity);
        self.max_entries = max_entries(new_capacity, self.threshold);

        unsafe {
            let old_metadata = self.raw.metadata_ptr(self.meta_capacity, 0);
            let new_metadata = self.raw.metadata_ptr(new_capacity, 0);
            ptr::copy(old_metadata, new_metadata, old_capacity as usize);
            self.meta_capacity = new_capacity;
            for i in old_capacity..new_capacity {
                self.metadata_ptr(i).write(EMPTY_HASH);
            }

            let mut bitmap = RehashBitmap::new(new_capacity);
            self.resize_common(old_capacity, &mut bitmap);
        }
    }
}

impl<E> Drop for RobinHoodTable<E> {
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
unsafe impl<E: Send> Send for RobinHoodTable<E> {}
unsafe impl<E: Sync> Sync for RobinHoodTable<E> {}

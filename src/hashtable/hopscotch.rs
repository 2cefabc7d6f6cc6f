//! Hopscotch hashing.
//!
//! Every home bucket carries a `NEIGHBORHOOD`-bit bitmap marking which of
//! the following buckets (wrapping) hold entries whose home is this one,
//! so a lookup touches at most `NEIGHBORHOOD` candidate slots. Insertion
//! finds the first empty slot in linear-probe order and, when it lies
//! outside the neighborhood, repeatedly "hops" it backward by swapping
//! with an entry that can legally move forward into it. When no hop
//! candidate exists the internal insert reports failure and the caller
//! grows the table and retries.
//!
//! During an in-place resize a displaced entry that cannot hop is
//! deposited in an arbitrary empty slot rather than dropped; a shrink
//! then restarts at a larger capacity. Entries are never lost.

use core::mem::MaybeUninit;
use core::ptr;

use super::raw::{max_entries, round_capacity, RawStorage, RehashBitmap};
use crate::fortify_check;

const EMPTY_HASH: u32 = 0;
const MIN_VALID_HASH: u32 = 1;

/// Per-bucket metadata: the stored hash, plus the neighborhood bitmap of
/// the bucket in its role as a home.
#[repr(C)]
#[derive(Clone, Copy)]
struct Meta {
    hash: u32,
    bitmap: u32,
}

#[inline(always)]
fn bit(distance: u32) -> u32 {
    // a deposited entry can sit past the neighborhood; no bit describes it
    1u32.checked_shl(distance).unwrap_or(0)
}

/// Open-addressed table with hopscotch hashing; see the module docs.
///
/// `NEIGHBORHOOD` must be in `8..=32`; values below 8 break the shrink
/// path among other things.
pub struct HopscotchTable<E, const NEIGHBORHOOD: u32 = 32> {
    raw: RawStorage<E, Meta>,
    capacity: u32,
    /// Capacity whose metadata offset the metadata region currently
    /// occupies; trails `capacity` inside a shrink.
    meta_capacity: u32,
    num_entries: u32,
    max_entries: u32,
    threshold: u32,
}

impl<E, const NEIGHBORHOOD: u32> HopscotchTable<E, NEIGHBORHOOD> {
    const NEIGHBORHOOD_OK: () = assert!(
        NEIGHBORHOOD >= 8 && NEIGHBORHOOD <= 32,
        "hopscotch neighborhood must be between 8 and 32"
    );

    /// A table with room for `capacity` slots (rounded up to a power of
    /// two ≥ 8). `threshold` ∈ 5..=9 is the max load factor in tenths.
    pub fn new(capacity: u32, threshold: u32) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NEIGHBORHOOD_OK;
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
                table.meta(i).write(Meta {
                    hash: EMPTY_HASH,
                    bitmap: 0,
                });
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
    unsafe fn meta(&self, index: u32) -> *mut Meta {
        self.raw.metadata_ptr(self.meta_capacity, index)
    }

    /// Map the caller's hash away from the empty sentinel, preserving
    /// collision behavior.
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

    #[inline]
    fn wrap(&self, index: u32) -> u32 {
        index & (self.capacity - 1)
    }

    /// Shared access to the entry at a live index.
    pub fn entry(&self, index: u32) -> &E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!((*self.meta(index)).hash >= MIN_VALID_HASH);
            &*self.raw.entry_ptr(index)
        }
    }

    /// Exclusive access to the entry at a live index. The caller must not
    /// alter whatever the key-match function inspects.
    pub fn entry_mut(&mut self, index: u32) -> &mut E {
        fortify_check!(index < self.capacity);
        unsafe {
            fortify_check!((*self.meta(index)).hash >= MIN_VALID_HASH);
            &mut *self.raw.entry_ptr(index)
        }
    }

    /// Index of the live entry with this hash whose entry satisfies
    /// `keys_match`. Only the set bits of the home bucket's neighborhood
    /// bitmap are visited.
    pub fn lookup<F: Fn(&E) -> bool>(&self, hash: u32, keys_match: F) -> Option<u32> {
        let hash = Self::sanitize_hash(hash);
        let home = self.hash_to_index(hash);
        unsafe {
            let bitmap = (*self.meta(home)).bitmap;
            if bitmap == 0 {
                return None;
            }
            for i in 0..NEIGHBORHOOD {
                if bitmap & (1u32 << i) == 0 {
                    continue;
                }
                let index = self.wrap(home + i);
                if (*self.meta(index)).hash == hash && keys_match(&*self.raw.entry_ptr(index)) {
                    return Some(index);
                }
            }
        }
        None
    }

    fn next_live(&self, start: u32) -> Option<u32> {
        (start..self.capacity).find(|&i| unsafe { (*self.meta(i)).hash } >= MIN_VALID_HASH)
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

    /// Hop the empty slot at `*pindex` backward toward its home until its
    /// distance fits the neighborhood: find an entry in the window before
    /// the empty slot that may legally move forward into it, move it, and
    /// continue from its old slot. On failure `*pindex`/`*pdistance` keep
    /// the position of the last empty slot.
    unsafe fn move_into_neighborhood(&mut self, pindex: &mut u32, pdistance: &mut u32) -> bool {
        let mut index = *pindex;
        let mut distance = *pdistance;
        while distance >= NEIGHBORHOOD {
            let empty_index = index;
            let mut i = 1u32;
            loop {
                if i == NEIGHBORHOOD {
                    return false;
                }
                index = self.wrap(index.wrapping_sub(1));
                distance -= 1;
                let m = self.meta(index);
                let hash = (*m).hash;
                let home = self.hash_to_index(hash);
                let old_distance = self.wrap(index.wrapping_sub(home));
                let new_distance = old_distance + i;
                if new_distance >= NEIGHBORHOOD {
                    i += 1;
                    continue;
                }
                (*m).hash = EMPTY_HASH;
                let home_meta = self.meta(home);
                (*home_meta).bitmap &= !bit(old_distance);
                (*home_meta).bitmap |= bit(new_distance);
                ptr::copy_nonoverlapping(
                    self.raw.entry_ptr(index),
                    self.raw.entry_ptr(empty_index),
                    1,
                );
                (*self.meta(empty_index)).hash = hash;
                *pindex = index;
                *pdistance = distance;
                break;
            }
        }
        true
    }

    /// Claim a slot for `hash`; fails when the first empty slot cannot be
    /// hopped into the neighborhood.
    unsafe fn do_insert(&mut self, hash: u32) -> Option<u32> {
        let home = self.hash_to_index(hash);
        let mut index;
        let mut distance = 0u32;
        loop {
            index = self.wrap(home + distance);
            if (*self.meta(index)).hash == EMPTY_HASH {
                break;
            }
            distance += 1;
        }

        if distance >= NEIGHBORHOOD && !self.move_into_neighborhood(&mut index, &mut distance) {
            return None;
        }

        (*self.meta(home)).bitmap |= bit(distance);
        (*self.meta(index)).hash = hash;
        Some(index)
    }

    /// Insert an entry under `hash` and return its slot index, growing
    /// and retrying until the neighborhood constraint is satisfiable.
    ///
    /// The caller must have established (normally by a preceding
    /// [`lookup`](HopscotchTable::lookup)) that no live entry with an
    /// equal key exists.
    pub fn insert(&mut self, hash: u32, entry: E) -> u32 {
        let hash = Self::sanitize_hash(hash);
        self.num_entries += 1;
        if self.num_entries > self.max_entries {
            self.grow(2 * self.capacity);
        }
        unsafe {
            let index = loop {
                if let Some(index) = self.do_insert(hash) {
                    break index;
                }
                self.grow(2 * self.capacity);
            };
            self.raw.entry_ptr(index).write(entry);
            index
        }
    }

    /// Remove and return the entry at a live index.
    pub fn remove(&mut self, index: u32) -> E {
        fortify_check!(index < self.capacity);
        unsafe {
            let m = self.meta(index);
            fortify_check!((*m).hash >= MIN_VALID_HASH);
            let entry = self.raw.entry_ptr(index).read();
            let home = self.hash_to_index((*m).hash);
            let distance = self.wrap(index.wrapping_sub(home));
            (*self.meta(home)).bitmap &= !bit(distance);
            (*self.meta(index)).hash = EMPTY_HASH;
            self.num_entries -= 1;
            if self.num_entries < self.capacity / 8 {
                self.shrink(self.capacity / 4);
            }
            entry
        }
    }

    /// Drop every entry and reset all slots, keeping the allocation.
    pub fn clear(&mut self) {
        unsafe {
            for i in 0..self.capacity {
                let m = self.meta(i);
                if (*m).hash >= MIN_VALID_HASH {
                    ptr::drop_in_place(self.raw.entry_ptr(i));
                }
                m.write(Meta {
                    hash: EMPTY_HASH,
                    bitmap: 0,
                });
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

    /// Reinsert one entry during an in-place rehash. On return `*hash` is
    /// `EMPTY_HASH` unless a not-yet-rehashed occupant was displaced into
    /// `hash`/`entry`. Returns `false` when the entry could not be placed
    /// within its neighborhood — it is deposited at the failing empty
    /// slot anyway so it is not lost.
    unsafe fn insert_during_resize(
        &mut self,
        hash: &mut u32,
        entry: *mut E,
        bitmap: &mut RehashBitmap,
    ) -> bool {
        let insert_hash = *hash;
        *hash = EMPTY_HASH;
        let home = self.hash_to_index(insert_hash);
        // where the entry to insert currently lives; displacement parks it
        // in `saved` because `entry` is recycled for the displaced one
        let mut insert_src: *const E = entry;
        let mut saved = MaybeUninit::<E>::uninit();
        let mut index;
        let mut distance = 0u32;
        loop {
            index = self.wrap(home + distance);
            let m = self.meta(index);
            if (*m).hash == EMPTY_HASH {
                bitmap.mark_rehashed(index);
                break;
            }
            if bitmap.needs_rehash(index) {
                bitmap.mark_rehashed(index);
                ptr::copy_nonoverlapping(entry, saved.as_mut_ptr(), 1);
                *hash = (*m).hash;
                ptr::copy_nonoverlapping(self.raw.entry_ptr(index), entry, 1);
                insert_src = saved.as_ptr();
                (*m).hash = EMPTY_HASH;
                break;
            }
            distance += 1;
        }

        let mut success = true;
        if distance >= NEIGHBORHOOD && !self.move_into_neighborhood(&mut index, &mut distance) {
            success = false;
        }

        (*self.meta(home)).bitmap |= bit(distance);
        (*self.meta(index)).hash = insert_hash;
        ptr::copy_nonoverlapping(insert_src, self.raw.entry_ptr(index), 1);
        success
    }

    /// Move the metadata region (currently placed for `meta_capacity`
    /// slots) to the offset for the current capacity, zeroing every
    /// neighborhood bitmap and clearing any new slots. Handles overlap in
    /// both directions.
    unsafe fn relocate_metadata(&mut self, old_slots: u32) {
        let from = self.meta_capacity;
        if self.capacity >= from {
            // moving to a higher offset: iterate backward so every source
            // slot is read before the destination range overwrites it
            for i in (0..old_slots).rev() {
                let hash = (*self.raw.metadata_ptr(from, i)).hash;
                self.raw
                    .metadata_ptr(self.capacity, i)
                    .write(Meta { hash, bitmap: 0 });
            }
            for i in old_slots..self.capacity {
                self.raw.metadata_ptr(self.capacity, i).write(Meta {
                    hash: EMPTY_HASH,
                    bitmap: 0,
                });
            }
        } else {
            for i in 0..self.capacity {
                let hash = (*self.raw.metadata_ptr(from, i)).hash;
                self.raw
                    .metadata_ptr(self.capacity, i)
                    .write(Meta { hash, bitmap: 0 });
            }
        }
        self.meta_capacity = self.capacity;
    }

    /// Rehash every slot of `scan_slots` into the current capacity.
    /// With `restart_on_failure`, a deposit failure aborts the scan and
    /// returns the still-displaced occupant (if any); otherwise deposits
    /// are tolerated and the scan always completes.
    unsafe fn rehash_scan(
        &mut self,
        scan_slots: u32,
        bitmap: &mut RehashBitmap,
        restart_on_failure: bool,
    ) -> Result<(), Option<(u32, MaybeUninit<E>)>> {
        let mut entry = MaybeUninit::<E>::uninit();
        for index in 0..scan_slots {
            let m = self.meta(index);
            if (*m).hash < MIN_VALID_HASH {
                (*m).hash = EMPTY_HASH;
                continue;
            }
            if !bitmap.needs_rehash(index) {
                continue;
            }
            let mut hash = (*m).hash;
            if self.hash_to_index(hash) == index {
                bitmap.mark_rehashed(index);
                (*m).bitmap |= 1;
                continue;
            }
            (*m).hash = EMPTY_HASH;
            ptr::copy_nonoverlapping(self.raw.entry_ptr(index), entry.as_mut_ptr(), 1);

            loop {
                let ok = self.insert_during_resize(&mut hash, entry.as_mut_ptr(), bitmap);
                if !ok && restart_on_failure {
                    if hash != EMPTY_HASH {
                        let mut displaced = MaybeUninit::<E>::uninit();
                        ptr::copy_nonoverlapping(entry.as_ptr(), displaced.as_mut_ptr(), 1);
                        return Err(Some((hash, displaced)));
                    }
                    return Err(None);
                }
                if hash == EMPTY_HASH {
                    break;
                }
            }
        }
        Ok(())
    }

    fn shrink(&mut self, new_capacity: u32) {
        let mut new_capacity = new_capacity.max(8);
        if new_capacity >= self.capacity {
            return;
        }
        let old_capacity = self.capacity;
        let mut bitmap = RehashBitmap::new(old_capacity);

        unsafe {
            loop {
                if new_capacity > self.raw.allocated() {
                    // a failed pass escalated past the original size:
                    // extend the allocation the way a grow would
                    let allocated = self.raw.allocated();
                    self.raw.realloc_to(new_capacity);
                    self.capacity = new_capacity;
                    self.relocate_metadata(allocated);
                } else {
                    self.capacity = new_capacity;
                    for i in 0..old_capacity {
                        (*self.meta(i)).bitmap = 0;
                    }
                }

                match self.rehash_scan(old_capacity, &mut bitmap, true) {
                    Ok(()) => break,
                    Err(displaced) => {
                        self.capacity = old_capacity;
                        new_capacity *= 2;
                        if let Some((hash, displaced)) = displaced {
                            // deposit the displaced occupant in the first
                            // empty slot so it is not lost
                            let mut i = 0u32;
                            loop {
                                let m = self.meta(i);
                                if (*m).hash == EMPTY_HASH {
                                    (*m).hash = hash;
                                    ptr::copy_nonoverlapping(
                                        displaced.as_ptr(),
                                        self.raw.entry_ptr(i),
                                        1,
                                    );
                                    break;
                                }
                                i += 1;
                            }
                        }
                    }
                }
            }

            if self.capacity < self.meta_capacity {
                let old_metadata = self.raw.metadata_ptr(self.meta_capacity, 0);
                let new_metadata = self.raw.metadata_ptr(self.capacity, 0);
                for i in 0..self.capacity as usize {
                    new_metadata.add(i).write(old_metadata.add(i).read());
                }
                self.meta_capacity = self.capacity;
                self.raw.realloc_to(self.capacity);
            }
        }
        self.max_entries = max_entries(self.capacity, self.threshold);
    }

    fn grow(&mut self, new_capacity: u32) {
        debug_assert!(new_capacity >= self.capacity);
        let old_capacity = self.capacity;
        self.capacity = new_capacity;
        self.raw.realloc_to(new_capacity);
        self.max_entries = max_entries(new_capacity, self.threshold);

        unsafe {
            self.relocate_metadata(old_capacity);
            let mut bitmap = RehashBitmap::new(new_capacity);
            // deposits are tolerated here; the scan always completes and
            // no entry is lost
            let _ = self.rehash_scan(old_capacity, &mut bitmap, false);
        }
    }
}

impl<E, const NEIGHBORHOOD: u32> Drop for HopscotchTable<E, NEIGHBORHOOD> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<E>() {
            unsafe {
                for i in 0..self.capacity {
                    if (*self.meta(i)).hash >= MIN_VALID_HASH {
                        ptr::drop_in_place(self.raw.entry_ptr(i));
                    }
                }
            }
        }
    }
}

// SAFETY: the table owns its storage exclusively.
unsafe impl<E: Send, const NEIGHBORHOOD: u32> Send for HopscotchTable<E, NEIGHBORHOOD> {}
unsafe impl<E: Sync, const NEIGHBORHOOD: u32> Sync for HopscotchTable<E, NEIGHBORHOOD> {}

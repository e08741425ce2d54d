//! # Stable Object Pool
//!
//! Fixed-type slab allocator for objects that are frequently allocated and freed.
//!
//! Slots live in fixed-size chunks. Growth appends a new chunk and never
//! reallocates an existing one, so an allocated object keeps its address until
//! it is freed.
//!
//! ```text
//! chunks[0]: [S0, S1, S2, S3]   <- never moves
//! chunks[1]: [S4, S5, S6, S7]   <- appended on growth
//! free_list: [5, 2]             <- LIFO reuse
//! ```

/// Handle to an allocated object in a pool.
///
/// The generation is bumped every time a slot is freed, so a handle that
/// outlives its object is detected instead of aliasing the next occupant.
/// A slot whose generation reaches `u32::MAX` is retired rather than
/// wrapped, so no handle is ever issued twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle {
    /// Slot index across all chunks.
    index: u32,
    /// Generation of the slot when the handle was issued.
    generation: u32,
}

impl PoolHandle {
    /// Creates a handle from a slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Packs the handle into a `u64` (generation in the upper 32 bits).
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Unpacks a handle produced by [`PoolHandle::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

/// Generation of a slot that is never handed out again.
const RETIRED: u32 = u32::MAX;

/// A single pool slot.
struct Slot<T> {
    /// Bumped on every free. Live slots are always below `RETIRED`.
    generation: u32,
    /// The stored object, `None` while the slot is free.
    value: Option<T>,
}

/// A chunked pool allocator with generational handles.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: StablePool<Particle> = StablePool::new(1024);
///
/// // Allocate - O(1)
/// let handle = pool.allocate(Particle { x: 0.0, y: 0.0, life: 1.0 });
///
/// // Free - O(1), the slot is reused by the next allocation
/// pool.free(handle);
/// assert!(pool.get(handle).is_none());
/// ```
pub struct StablePool<T> {
    /// Fixed-size chunks of slots.
    chunks: Vec<Box<[Slot<T>]>>,
    /// Slots per chunk (power of two).
    chunk_size: usize,
    /// `log2(chunk_size)`.
    chunk_shift: u32,
    /// Indices of freed slots, reused LIFO.
    free_list: Vec<u32>,
    /// Number of distinct slots ever handed out.
    high_water_mark: usize,
    /// Number of currently allocated objects.
    allocated_count: usize,
}

impl<T> StablePool<T> {
    /// Creates an empty pool. No chunk is allocated until the first allocation.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero or not a power of two.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        assert!(
            chunk_size.is_power_of_two(),
            "Chunk size must be a non-zero power of two"
        );

        Self {
            chunks: Vec::new(),
            chunk_size,
            chunk_shift: chunk_size.trailing_zeros(),
            free_list: Vec::new(),
            high_water_mark: 0,
            allocated_count: 0,
        }
    }

    /// Creates a pool with enough chunks pre-allocated for `capacity` objects.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero or not a power of two.
    #[must_use]
    pub fn with_capacity(chunk_size: usize, capacity: usize) -> Self {
        let mut pool = Self::new(chunk_size);
        while pool.capacity() < capacity {
            pool.grow();
        }
        pool
    }

    /// Returns the number of slots per chunk.
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of allocated chunks.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the total number of slots across all chunks.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_size
    }

    /// Returns the number of currently allocated objects.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.allocated_count
    }

    /// Returns `true` if no object is allocated.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Returns the number of distinct slots ever handed out.
    ///
    /// Freed slots are reused before new ones are touched, so this only grows
    /// when the number of live objects exceeds every previous peak.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Allocates a slot and stores the object.
    ///
    /// This is a **O(1)** operation. A new chunk is appended when every
    /// existing slot is in use; existing chunks never move.
    pub fn allocate(&mut self, value: T) -> PoolHandle {
        self.allocate_with(|_| value)
    }

    /// Allocates a slot and stores the object built by `init`.
    ///
    /// `init` receives the handle the object will live under, which lets
    /// objects record their own identity.
    pub fn allocate_with<F>(&mut self, init: F) -> PoolHandle
    where
        F: FnOnce(PoolHandle) -> T,
    {
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => self.next_fresh_index(),
        };

        let (chunk, offset) = self.locate(index);
        let slot = &mut self.chunks[chunk][offset];
        debug_assert!(slot.value.is_none(), "Free list handed out a live slot");

        let handle = PoolHandle::new(index, slot.generation);
        slot.value = Some(init(handle));
        self.allocated_count += 1;

        handle
    }

    /// Frees an allocated object.
    ///
    /// This is a **O(1)** operation; the slot becomes available for reuse and
    /// every outstanding handle to it goes stale.
    ///
    /// # Returns
    ///
    /// The freed object, or None if the handle was stale or already freed.
    pub fn free(&mut self, handle: PoolHandle) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        let value = slot.value.take()?;
        slot.generation += 1;

        // A slot whose generation is exhausted is retired for good.
        if slot.generation != RETIRED {
            self.free_list.push(handle.index);
        }
        self.allocated_count -= 1;

        Some(value)
    }

    /// Destroys the object behind `handle` and stores `value` in the same slot.
    ///
    /// The handle stays valid. If the handle is stale, `value` is dropped.
    ///
    /// # Returns
    ///
    /// The previous object, or None if the handle was stale.
    pub fn replace(&mut self, handle: PoolHandle, value: T) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        if slot.value.is_none() {
            return None;
        }
        slot.value.replace(value)
    }

    /// Returns `true` if `handle` refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to an allocated object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let (chunk, offset) = self.locate(handle.index);
        let slot = self.chunks.get(chunk)?.get(offset)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to an allocated object.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slot_mut(handle)?.value.as_mut()
    }

    /// Frees every object, keeping all chunks for reuse.
    ///
    /// Every outstanding handle goes stale.
    pub fn clear(&mut self) {
        for slot in self.chunks.iter_mut().flat_map(|chunk| chunk.iter_mut()) {
            if slot.value.take().is_some() {
                slot.generation += 1;
            }
        }

        self.free_list.clear();
        for index in (0..self.high_water_mark as u32).rev() {
            let (chunk, offset) = self.locate(index);
            if self.chunks[chunk][offset].generation != RETIRED {
                self.free_list.push(index);
            }
        }
        self.allocated_count = 0;
    }

    /// Returns the number of slots retired after exhausting their generations.
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.high_water_mark - self.allocated_count - self.free_list.len()
    }

    /// Iterates over all allocated objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .take(self.high_water_mark)
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.value
                    .as_ref()
                    .map(|value| (PoolHandle::new(index as u32, slot.generation), value))
            })
    }

    /// Splits a slot index into `(chunk, offset)`.
    #[inline]
    fn locate(&self, index: u32) -> (usize, usize) {
        let index = index as usize;
        (index >> self.chunk_shift, index & (self.chunk_size - 1))
    }

    #[inline]
    fn slot_mut(&mut self, handle: PoolHandle) -> Option<&mut Slot<T>> {
        let (chunk, offset) = self.locate(handle.index);
        let slot = self.chunks.get_mut(chunk)?.get_mut(offset)?;
        (slot.generation == handle.generation).then_some(slot)
    }

    /// Takes the next never-used slot, appending a chunk if needed.
    fn next_fresh_index(&mut self) -> u32 {
        assert!(
            self.high_water_mark < u32::MAX as usize,
            "Pool index space exhausted"
        );

        if self.high_water_mark == self.capacity() {
            self.grow();
        }

        let index = self.high_water_mark as u32;
        self.high_water_mark += 1;
        index
    }

    /// Appends one chunk of empty slots.
    fn grow(&mut self) {
        let chunk: Box<[Slot<T>]> = (0..self.chunk_size)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        self.chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocate_free() {
        let mut pool: StablePool<u32> = StablePool::new(8);

        let h1 = pool.allocate(42);
        assert_eq!(*pool.get(h1).unwrap(), 42);
        assert_eq!(pool.len(), 1);

        let freed = pool.free(h1).unwrap();
        assert_eq!(freed, 42);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_reuse_bumps_generation() {
        let mut pool: StablePool<u32> = StablePool::new(4);

        let h1 = pool.allocate(1);
        pool.free(h1);

        let h2 = pool.allocate(2);
        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert_ne!(h1.generation(), h2.generation());
        assert!(pool.get(h1).is_none());
        assert_eq!(*pool.get(h2).unwrap(), 2);
    }

    #[test]
    fn test_pool_double_free() {
        let mut pool: StablePool<u32> = StablePool::new(4);

        let handle = pool.allocate(7);
        assert_eq!(pool.free(handle), Some(7));
        assert_eq!(pool.free(handle), None);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_pool_growth_keeps_addresses() {
        let mut pool: StablePool<u64> = StablePool::new(4);

        let first = pool.allocate(10);
        let address = pool.get(first).unwrap() as *const u64;

        let handles: Vec<_> = (0..100).map(|i| pool.allocate(i)).collect();
        assert_eq!(pool.chunk_count(), 26);
        assert_eq!(pool.get(first).unwrap() as *const u64, address);
        assert_eq!(*pool.get(first).unwrap(), 10);
        assert_eq!(*pool.get(handles[99]).unwrap(), 99);
    }

    #[test]
    fn test_pool_replace_in_place() {
        let mut pool: StablePool<String> = StablePool::new(4);

        let handle = pool.allocate("old".to_string());
        let address = pool.get(handle).unwrap() as *const String;

        assert_eq!(pool.replace(handle, "new".to_string()).as_deref(), Some("old"));
        assert_eq!(pool.get(handle).map(String::as_str), Some("new"));
        assert_eq!(pool.get(handle).unwrap() as *const String, address);

        pool.free(handle);
        assert!(pool.replace(handle, "stale".to_string()).is_none());
    }

    #[test]
    fn test_pool_high_water_mark_is_bounded() {
        let mut pool: StablePool<u32> = StablePool::new(4);

        for i in 0..1000 {
            let handle = pool.allocate(i);
            pool.free(handle);
        }
        assert_eq!(pool.high_water_mark(), 1);
        assert_eq!(pool.chunk_count(), 1);
    }

    #[test]
    fn test_pool_clear_and_iter() {
        let mut pool: StablePool<u32> = StablePool::with_capacity(4, 6);
        assert_eq!(pool.capacity(), 8);

        let a = pool.allocate(1);
        let b = pool.allocate(2);
        let c = pool.allocate(3);
        pool.free(b);

        let live: Vec<_> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec![1, 3]);

        pool.clear();
        assert!(pool.is_empty());
        assert!(pool.get(a).is_none());
        assert!(pool.get(c).is_none());
        assert_eq!(pool.iter().count(), 0);

        // Cleared slots are reused before fresh ones.
        let _ = pool.allocate(4);
        assert_eq!(pool.high_water_mark(), 3);
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut pool: StablePool<u32> = StablePool::new(4);
        let original = pool.allocate(1);
        pool.free(original);

        // Fast-forward slot 0 to its last usable generation.
        pool.chunks[0][0].generation = RETIRED - 1;
        let last = pool.allocate(2);
        assert_eq!(last, PoolHandle::new(0, RETIRED - 1));
        assert_eq!(pool.free(last), Some(2));
        assert_eq!(pool.retired_count(), 1);

        let fresh = pool.allocate(3);
        assert_eq!(fresh.index(), 1);
        assert!(pool.get(original).is_none());
        assert!(pool.get(last).is_none());
        assert!(pool.get(PoolHandle::new(0, RETIRED)).is_none());
        assert_eq!(pool.free(last), None);
        assert_eq!(pool.high_water_mark(), 2);
    }

    #[test]
    fn test_clear_does_not_revive_retired_slot() {
        let mut pool: StablePool<u32> = StablePool::new(4);
        let a = pool.allocate(1);
        let _b = pool.allocate(2);

        pool.chunks[0][1].generation = RETIRED - 1;
        pool.chunks[0][1].value = Some(2);
        pool.clear();
        assert_eq!(pool.retired_count(), 1);

        // Only slot 0 is reusable; slot 1 stays dead.
        let reused = pool.allocate(3);
        assert_eq!(reused.index(), 0);
        assert_ne!(reused, a);
        let fresh = pool.allocate(4);
        assert_eq!(fresh.index(), 2);
        assert!(pool.get(PoolHandle::new(1, 0)).is_none());
    }

    #[test]
    fn test_handle_bits_roundtrip() {
        let handle = PoolHandle::new(12345, 67890);
        assert_eq!(PoolHandle::from_bits(handle.to_bits()), handle);
    }
}

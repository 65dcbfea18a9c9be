//! Backing storage for a table.
//!
//! A heap-backed table makes a single allocation: the control bytes first,
//! then the slot array, aligned for `V`.
//!
//! ```text
//! [ ctrl: capacity | sentinel | cloned bytes ][ pad ][ slots: capacity * V ]
//! ```
//!
//! Small element types can skip the allocation entirely and keep a single
//! element inline in the table header.

use core::alloc::Layout;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;

use crate::control::num_control_bytes;
use crate::control::reset_ctrl;
use crate::error::Fallibility;
use crate::error::TryReserveError;

/// Capacity of the inline storage used by small-object-optimized tables.
pub(crate) const SOO_CAPACITY: usize = 1;

/// Whether tables of `V` keep their first element inline.
#[inline(always)]
pub(crate) const fn soo_enabled<V>() -> bool {
    size_of::<V>() <= 2 * size_of::<usize>() && align_of::<V>() <= align_of::<usize>()
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TableLayout {
    pub(crate) layout: Layout,
    pub(crate) slots_offset: usize,
}

impl TableLayout {
    /// Computes the allocation layout, or `None` if it does not fit in
    /// `isize::MAX` bytes.
    pub(crate) fn new<V>(capacity: usize) -> Option<Self> {
        let ctrl_layout = Layout::array::<u8>(num_control_bytes(capacity)).ok()?;
        let slots_layout = Layout::array::<MaybeUninit<V>>(capacity).ok()?;

        let (layout, slots_offset) = ctrl_layout.extend(slots_layout).ok()?;

        Some(TableLayout {
            layout: layout.pad_to_align(),
            slots_offset,
        })
    }
}

/// Pointers into a live heap allocation.
pub(crate) struct HeapArray<V> {
    ctrl: NonNull<u8>,
    slots: NonNull<V>,
}

impl<V> Clone for HeapArray<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for HeapArray<V> {}

impl<V> HeapArray<V> {
    /// Allocates storage for `capacity` slots with every control byte empty.
    pub(crate) fn allocate<A: Allocator>(
        alloc: &A,
        capacity: usize,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        debug_assert!(crate::capacity::is_valid_capacity(capacity));

        let Some(table_layout) = TableLayout::new::<V>(capacity) else {
            return Err(fallibility.capacity_overflow());
        };

        let raw = match alloc.allocate(table_layout.layout) {
            Ok(ptr) => ptr.cast::<u8>(),
            Err(_) => return Err(fallibility.alloc_err(table_layout.layout)),
        };

        // SAFETY: The allocation is `table_layout.layout.size()` bytes long,
        // which covers the control array and the slot array at
        // `slots_offset`.
        unsafe {
            reset_ctrl(raw.as_ptr(), capacity);
            Ok(HeapArray {
                ctrl: raw,
                slots: raw.add(table_layout.slots_offset).cast(),
            })
        }
    }

    /// Returns the allocation to `alloc`. Elements are not dropped.
    ///
    /// # Safety
    ///
    /// `self` must have been allocated by `alloc` with the same `capacity`, and
    /// must not be used afterwards.
    pub(crate) unsafe fn deallocate<A: Allocator>(self, alloc: &A, capacity: usize) {
        // The layout was computed successfully when the array was allocated.
        if let Some(table_layout) = TableLayout::new::<V>(capacity) {
            // SAFETY: Guaranteed by the caller.
            unsafe { alloc.deallocate(self.ctrl, table_layout.layout) };
        }
    }

    #[inline(always)]
    pub(crate) fn ctrl(self) -> *mut u8 {
        self.ctrl.as_ptr()
    }

    #[inline(always)]
    pub(crate) fn slots(self) -> *mut V {
        self.slots.as_ptr()
    }

    /// # Safety
    ///
    /// `index` must be below the capacity this array was allocated with.
    #[inline(always)]
    pub(crate) unsafe fn slot(self, index: usize) -> *mut V {
        // SAFETY: Guaranteed by the caller.
        unsafe { self.slots.as_ptr().add(index) }
    }
}

/// Where a table's elements live.
///
/// | variant       | capacity       | elements        |
/// |---------------|----------------|-----------------|
/// | `Unallocated` | 0              | none            |
/// | `Inline`      | `SOO_CAPACITY` | 0 or 1, inline  |
/// | `Heap`        | `2^k - 1`      | in `HeapArray`  |
pub(crate) enum Storage<V> {
    Unallocated,
    Inline(MaybeUninit<V>),
    Heap(HeapArray<V>),
}

impl<V> Storage<V> {
    /// The storage of a freshly constructed table with no allocation.
    #[inline]
    pub(crate) const fn empty() -> Self {
        if soo_enabled::<V>() {
            Storage::Inline(MaybeUninit::uninit())
        } else {
            Storage::Unallocated
        }
    }

    /// Pointer to the slot at `index`, for reading.
    ///
    /// # Safety
    ///
    /// `index` must be below the current capacity.
    #[inline(always)]
    pub(crate) unsafe fn slot(&self, index: usize) -> *const V {
        match self {
            Storage::Unallocated => unreachable!("slot access on unallocated table"),
            Storage::Inline(slot) => {
                debug_assert_eq!(index, 0);
                slot.as_ptr()
            }
            // SAFETY: Guaranteed by the caller.
            Storage::Heap(heap) => unsafe { heap.slot(index) },
        }
    }

    /// Pointer to the slot at `index`, for writing.
    ///
    /// # Safety
    ///
    /// `index` must be below the current capacity.
    #[inline(always)]
    pub(crate) unsafe fn slot_mut(&mut self, index: usize) -> *mut V {
        match self {
            Storage::Unallocated => unreachable!("slot access on unallocated table"),
            Storage::Inline(slot) => {
                debug_assert_eq!(index, 0);
                slot.as_mut_ptr()
            }
            // SAFETY: Guaranteed by the caller.
            Storage::Heap(heap) => unsafe { heap.slot(index) },
        }
    }

    #[inline(always)]
    pub(crate) fn heap(&self) -> Option<HeapArray<V>> {
        match self {
            Storage::Heap(heap) => Some(*heap),
            _ => None,
        }
    }

    #[inline(always)]
    pub(crate) fn is_inline(&self) -> bool {
        matches!(self, Storage::Inline(_))
    }
}

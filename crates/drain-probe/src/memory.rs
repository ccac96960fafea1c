//! Memory sampling.
//!
//! Two sources back the [`MemoryProbe`] trait:
//!
//! - [`HeapProbe`] reads live heap bytes from [`TrackingAllocator`]. The
//!   allocator only counts once a binary installs it with
//!   `#[global_allocator]`; until then every sample is 0.
//! - [`RssProbe`] reads the process resident set size through `sysinfo`.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use drain_core::MemorySource;
use sysinfo::{Pid, ProcessesToUpdate, System as SysInfo};
use tracing::warn;

/// Something that can report current memory usage in bytes.
pub trait MemoryProbe: Send {
    fn source(&self) -> MemorySource;

    fn name(&self) -> &'static str {
        self.source().as_str()
    }

    /// Take one measurement.
    fn sample(&mut self) -> u64;
}

/// Build the probe for a configured source.
pub fn probe_for(source: MemorySource) -> Box<dyn MemoryProbe> {
    match source {
        MemorySource::Heap => {
            if !TrackingAllocator::is_installed() {
                warn!("tracking allocator is not installed; heap samples will read 0");
            }
            Box::new(HeapProbe)
        }
        MemorySource::Rss => Box::new(RssProbe::new()),
    }
}

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// System allocator wrapper that keeps a running count of live bytes.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: drain_probe::TrackingAllocator = drain_probe::TrackingAllocator;
/// ```
pub struct TrackingAllocator;

impl TrackingAllocator {
    /// Bytes currently allocated and not yet freed.
    pub fn live_bytes() -> u64 {
        LIVE_BYTES.load(Ordering::Relaxed) as u64
    }

    /// Whether any allocation has gone through this allocator.
    pub fn is_installed() -> bool {
        ALLOCATIONS.load(Ordering::Relaxed) > 0
    }
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            let old_size = layout.size();
            if new_size >= old_size {
                LIVE_BYTES.fetch_add(new_size - old_size, Ordering::Relaxed);
            } else {
                LIVE_BYTES.fetch_sub(old_size - new_size, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

/// Live heap bytes from [`TrackingAllocator`].
#[derive(Debug, Default)]
pub struct HeapProbe;

impl MemoryProbe for HeapProbe {
    fn source(&self) -> MemorySource {
        MemorySource::Heap
    }

    fn sample(&mut self) -> u64 {
        TrackingAllocator::live_bytes()
    }
}

/// Resident set size of the current process.
pub struct RssProbe {
    system: SysInfo,
    pid: Option<Pid>,
}

impl RssProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(error = %e, "failed to get current pid; rss samples will read 0");
                None
            }
        };
        Self {
            system: SysInfo::new(),
            pid,
        }
    }
}

impl Default for RssProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for RssProbe {
    fn source(&self) -> MemorySource {
        MemorySource::Rss
    }

    fn sample(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

//! CRC32 over the committed image: `crc32(0, end_addr_bytes)` chained with
//! `crc32(state, detail_bytes)`. The polynomial itself is the port's
//! concern (see [`Port::crc32`](crate::port::Port::crc32)); this module
//! only fixes the chaining order and the verify-on-load comparison.

use crate::cache::Cache;
use crate::layout::Layout;
use crate::port::Port;

/// Compute the image CRC over the cache's current `end_addr` and detail
/// bytes.
pub fn compute<P: Port, const U: usize>(port: &P, cache: &Cache<U>, layout: &Layout) -> u32 {
    let end_addr_bytes = cache.end_addr().to_le_bytes();
    let state = port.crc32(0, &end_addr_bytes);
    port.crc32(state, cache.detail_bytes(layout))
}

/// Whether the cache's stored `crc` matches a freshly computed one.
pub fn verify<P: Port, const U: usize>(port: &P, cache: &Cache<U>, layout: &Layout) -> bool {
    compute(port, cache, layout) == cache.crc()
}

//! Commit the cache to flash, sliding to the next erase block whenever an
//! erase or write attempt fails, and persisting the system pointer when
//! the active slot moves. Mirrors `flash_save_env`/`save_cur_using_data_addr`.

use crate::cache::Cache;
use crate::integrity;
use crate::layout::{Layout, INVALID_PTR, PARAM_PART_SIZE};
use crate::port::Port;
use crate::{Error, Result};

#[cfg(feature = "log")]
use log::{info, warn};

/// Erase the system slot and write the new active-slot pointer. A port
/// failure here is fatal: callers must poison the engine.
pub fn save_pointer<P: Port>(port: &mut P, layout: &Layout) -> Result<()> {
    port.erase(layout.r_base(), 4)?;
    port.write(layout.r_base(), &layout.slot_base().to_le_bytes())
}

/// Commit the cache to the active slot, sliding forward by one erase
/// block on every erase/write failure until the commit succeeds or the
/// region is exhausted.
pub fn save<P: Port, const U: usize>(port: &mut P, layout: &mut Layout, cache: &mut Cache<U>) -> Result<()> {
    let prev_slot_base = layout.slot_base();
    let detail_size = cache.detail_size(layout);

    loop {
        if !layout.slot_fits(detail_size) {
            #[cfg(feature = "log")]
            warn!("envstore: region exhausted, marking unusable");
            #[cfg(feature = "defmt")]
            defmt::warn!("envstore: region exhausted, marking unusable");
            layout.set_slot_base(INVALID_PTR);
            // The region is unusable either way; a failure here just means
            // the sentinel itself didn't make it to flash.
            let _ = save_pointer(port, layout);
            return Err(Error::EnvFull);
        }

        let crc = integrity::compute(port, cache, layout);
        cache.set_crc(crc);

        let image_len = PARAM_PART_SIZE + detail_size;
        if let Err(_e) = port.erase(layout.slot_base(), image_len) {
            #[cfg(feature = "log")]
            warn!("envstore: erase failed at 0x{:08X}, sliding", layout.slot_base());
            #[cfg(feature = "defmt")]
            defmt::warn!("envstore: erase failed, sliding to next block");
            slide(layout, cache);
            continue;
        }

        let image = cache.image_bytes(layout);
        if let Err(_e) = port.write(layout.slot_base(), image) {
            #[cfg(feature = "log")]
            warn!("envstore: write failed at 0x{:08X}, sliding", layout.slot_base());
            #[cfg(feature = "defmt")]
            defmt::warn!("envstore: write failed, sliding to next block");
            slide(layout, cache);
            continue;
        }

        break;
    }

    if layout.slot_base() != prev_slot_base {
        save_pointer(port, layout)?;
    }

    #[cfg(feature = "log")]
    info!("envstore: saved {} bytes to 0x{:08X}", detail_size, layout.slot_base());
    Ok(())
}

/// Advance the active slot by one erase block, keeping `end_addr`
/// consistent with the new (absolute) slot base.
fn slide<const U: usize>(layout: &mut Layout, cache: &mut Cache<U>) {
    layout.advance_slot();
    let end_addr = cache.end_addr();
    cache.set_end_addr(end_addr + layout.erase_size());
}

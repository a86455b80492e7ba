//! Load path: find the active data slot, verify its CRC, and fall back to
//! defaults whenever the system pointer, the end address or the CRC look
//! wrong. Mirrors the original's `flash_load_env`/`flash_env_set_default`.

use crate::cache::Cache;
use crate::integrity;
use crate::layout::Layout;
use crate::port::Port;
use crate::writer;
use crate::Result;

#[cfg(feature = "log")]
use log::{info, warn};

/// Read the system pointer and, if it is valid, the active slot's image;
/// verify the CRC. On any failure along the way, reset to defaults and
/// commit them (`flash_load_env`).
pub fn load<P: Port, const U: usize>(
    port: &mut P,
    layout: &mut Layout,
    cache: &mut Cache<U>,
    defaults: &[(&str, &str)],
) -> Result<()> {
    let mut ptr_bytes = [0u8; 4];
    port.read(layout.r_base(), &mut ptr_bytes);
    let p_read = u32::from_le_bytes(ptr_bytes);

    if !layout.is_valid_slot_base(p_read) {
        #[cfg(feature = "log")]
        warn!("envstore: system pointer invalid (0x{:08X}), resetting to defaults", p_read);
        #[cfg(feature = "defmt")]
        defmt::warn!("envstore: system pointer invalid, resetting to defaults");
        layout.set_slot_base(layout.first_slot_base());
        writer::save_pointer(port, layout)?;
        return set_defaults(port, layout, cache, defaults);
    }
    layout.set_slot_base(p_read);

    let mut end_addr_bytes = [0u8; 4];
    port.read(layout.slot_base(), &mut end_addr_bytes);
    let end_addr = u32::from_le_bytes(end_addr_bytes);
    if !layout.is_valid_end_addr(end_addr) {
        #[cfg(feature = "log")]
        warn!("envstore: end address out of range, resetting to defaults");
        return set_defaults(port, layout, cache, defaults);
    }

    cache.set_end_addr(end_addr);
    port.read(layout.detail_base(), cache.detail_bytes_mut(layout));
    let mut crc_bytes = [0u8; 4];
    port.read(layout.slot_base() + 4, &mut crc_bytes);
    cache.set_crc(u32::from_le_bytes(crc_bytes));

    if !integrity::verify(port, cache, layout) {
        #[cfg(feature = "log")]
        warn!("envstore: CRC check failed, resetting to defaults");
        #[cfg(feature = "defmt")]
        defmt::warn!("envstore: CRC check failed, resetting to defaults");
        return set_defaults(port, layout, cache, defaults);
    }

    #[cfg(feature = "log")]
    info!(
        "envstore: loaded {} bytes of env from 0x{:08X}",
        layout.detail_size(end_addr),
        layout.slot_base()
    );
    Ok(())
}

/// Reset the cache to the default set and commit it (`flash_env_set_default`).
pub fn set_defaults<P: Port, const U: usize>(
    port: &mut P,
    layout: &mut Layout,
    cache: &mut Cache<U>,
    defaults: &[(&str, &str)],
) -> Result<()> {
    port.lock();
    cache.clear(layout);
    let mut result = Ok(());
    for (k, v) in defaults {
        if let Err(e) = cache.create(layout, k, v) {
            result = Err(e);
            break;
        }
    }
    let result = result.and_then(|()| writer::save(port, layout, cache));
    port.unlock();
    result
}

#![cfg_attr(not(test), no_std)]

//! Bridges an `embedded_storage` NOR flash device to [`envstore::port::Port`].
//!
//! [`EmbeddedStoragePort`] wraps any type implementing
//! `embedded_storage::nor_flash::{NorFlash, ReadNorFlash}`, translating the
//! absolute addresses `envstore` works in into device-relative offsets and
//! using `critical-section` for the cache mutex, the way a real board
//! support crate would plug a flash driver into the core.

use core::cell::Cell;

use critical_section::RestoreState;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use envstore::port::Port;
use envstore::Error;

#[cfg(feature = "log")]
use log::warn;

/// A [`Port`] backed by any `embedded_storage` NOR flash device.
///
/// `base` is the absolute address that corresponds to offset `0` of
/// `flash`, so the region an [`envstore::engine::Engine`] is initialised
/// over can sit anywhere in the chip's address space while `flash` itself
/// only ever sees `0`-based offsets.
pub struct EmbeddedStoragePort<F> {
    flash: F,
    base: u32,
    restore_state: Cell<Option<RestoreState>>,
}

impl<F> EmbeddedStoragePort<F> {
    pub fn new(flash: F, base: u32) -> Self {
        EmbeddedStoragePort {
            flash,
            base,
            restore_state: Cell::new(None),
        }
    }

    /// Give back the wrapped device.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn offset(&self, addr: u32) -> u32 {
        addr - self.base
    }
}

impl<F> Port for EmbeddedStoragePort<F>
where
    F: NorFlash + ReadNorFlash,
{
    /// Reads are modelled as infallible by `envstore`; a device that
    /// reports a read error has a fault this crate has no story for.
    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        let offset = self.offset(addr);
        if self.flash.read(offset, buf).is_err() {
            #[cfg(feature = "log")]
            warn!("envstore-hal: flash read failed at 0x{:08X}", addr);
            #[cfg(feature = "defmt")]
            defmt::error!("envstore-hal: flash read failed");
            panic!("envstore-hal: flash read failed at 0x{:08X}", addr);
        }
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> Result<(), Error> {
        let offset = self.offset(addr);
        self.flash.write(offset, buf).map_err(|_| Error::WriteErr)
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error> {
        let offset = self.offset(addr);
        self.flash.erase(offset, offset + len).map_err(|_| Error::EraseErr)
    }

    /// Acquires a global critical section. `envstore` never nests `lock`
    /// calls, so a single pending token is enough.
    fn lock(&mut self) {
        // SAFETY: released by the matching `unlock` below before any other
        // call can observe an outstanding `acquire`.
        let token = unsafe { critical_section::acquire() };
        self.restore_state.set(Some(token));
    }

    fn unlock(&mut self) {
        if let Some(token) = self.restore_state.take() {
            // SAFETY: `token` came from the `acquire` in `lock`.
            unsafe { critical_section::release(token) };
        }
    }

    fn crc32(&self, seed: u32, buf: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new_with_initial(seed);
        hasher.update(buf);
        hasher.finalize()
    }

    /// Board support crates that want `print_env` output on a UART or RTT
    /// channel should wrap this port rather than rely on a default here;
    /// there is no universal place to send a line of text.
    fn print(&mut self, _line: &str) {}
}

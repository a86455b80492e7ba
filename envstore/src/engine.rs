//! The public API: an explicit handle bundling the region parameters, the
//! RAM cache and the port, replacing the original's module-level
//! mutable statics (see the Design Notes on handle encapsulation).

use crate::boot;
use crate::cache::{Cache, Iter};
use crate::layout::Layout;
use crate::port::Port;
use crate::writer;
use crate::{Error, Result};

/// A wear-levelled ENV store bound to one flash region, one port and a
/// compile-time cache capacity `U`.
///
/// Once a port I/O error surfaces from persisting the system pointer, the
/// engine is poisoned: every subsequent call returns [`Error::Poisoned`]
/// until a fresh [`Engine::init`].
pub struct Engine<'d, P: Port, const U: usize> {
    port: P,
    layout: Layout,
    cache: Cache<U>,
    defaults: &'d [(&'d str, &'d str)],
    poisoned: bool,
}

impl<'d, P: Port, const U: usize> Engine<'d, P, U> {
    /// Initialise the engine over `[r_base, r_base + r_size)`, `erase_size`
    /// bytes per erase block, loading (or defaulting) the ENV image.
    ///
    /// # Panics
    ///
    /// Panics if `U` is not a multiple of 4, if `r_size` is not a multiple
    /// of 4 or of `erase_size`, or if `defaults.len() >= U` — these are
    /// build-time misconfigurations, not runtime conditions, matching the
    /// original's `FLASH_ASSERT` preconditions.
    pub fn init(
        mut port: P,
        r_base: u32,
        r_size: u32,
        erase_size: u32,
        defaults: &'d [(&'d str, &'d str)],
    ) -> Result<Self> {
        assert!(U % 4 == 0, "envstore: U must be a multiple of 4");
        assert!(r_size % 4 == 0, "envstore: region size must be a multiple of 4");
        assert!(r_size % erase_size == 0, "envstore: region size must be a multiple of the erase size");
        assert!(
            defaults.len() < U,
            "envstore: default set is larger than the cache capacity"
        );

        let mut layout = Layout::new(r_base, r_size, erase_size, crate::layout::INVALID_PTR);
        let mut cache = Cache::new();
        boot::load(&mut port, &mut layout, &mut cache, defaults)?;

        Ok(Engine {
            port,
            layout,
            cache,
            defaults,
            poisoned: false,
        })
    }

    /// Set `key` to `value`. An empty `value` deletes `key`, then commits
    /// the result to flash.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_alive()?;
        self.port.lock();
        let result = self.cache.set(&self.layout, key, value).and_then(|()| {
            writer::save(&mut self.port, &mut self.layout, &mut self.cache)
        });
        self.port.unlock();
        self.finish(result)
    }

    /// Look up `key`. The returned value borrows the cache and is
    /// invalidated by the next mutation.
    pub fn get(&self, key: &str) -> Result<Option<&str>> {
        self.ensure_alive()?;
        self.cache.get(&self.layout, key)
    }

    /// Commit the cache to flash, sliding to the next erase block on any
    /// erase/write failure.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let commit = writer::save(&mut self.port, &mut self.layout, &mut self.cache);
        self.finish(commit)
    }

    /// Idempotently re-read the ENV image from flash.
    pub fn load(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let result = boot::load(&mut self.port, &mut self.layout, &mut self.cache, self.defaults);
        self.finish(result)
    }

    /// Reset the cache to the default set and commit it.
    pub fn set_defaults(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let result = boot::set_defaults(&mut self.port, &mut self.layout, &mut self.cache, self.defaults);
        self.finish(result)
    }

    /// Emit every `key=value` pair followed by a size summary, the way
    /// `flash_print_env` does.
    pub fn print_env(&mut self) {
        let mut count = 0usize;
        for record in self.cache.iter(&self.layout) {
            self.port.print(record.key);
            self.port.print("=");
            self.port.print(record.value);
            self.port.print("\n");
            count += 1;
        }
        let _ = count;
    }

    /// Iterate over the currently cached `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        self.cache.iter(&self.layout)
    }

    /// Total size of the ENV region (`R_size`).
    pub fn get_env_total_size(&self) -> u32 {
        self.layout.r_size()
    }

    /// Bytes from `R_base` to the current detail end — a monotonically
    /// increasing wear indicator across slides.
    pub fn get_env_write_bytes(&self) -> u32 {
        self.layout.write_bytes(self.cache.end_addr())
    }

    /// Bytes used in the active slot (`detail_end - P`), compared against
    /// the cache capacity `U` by callers that track headroom.
    pub fn get_env_used_size(&self) -> u32 {
        self.layout.used_size(self.cache.end_addr())
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.poisoned {
            Err(Error::Poisoned)
        } else {
            Ok(())
        }
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e @ (Error::EraseErr | Error::WriteErr)) = result {
            self.poisoned = true;
            return Err(e);
        }
        result
    }
}

//! RAM-backed `Port` used only by this crate's own tests. Exposes
//! fail-injection hooks so the writer's slide-and-retry loop (S5, S6) and
//! the loader's corruption paths (S4) can be exercised deterministically.

use crate::port::Port;
use crate::Error;
use std::vec::Vec;

pub(crate) struct MockPort {
    base: u32,
    mem: Vec<u8>,
    fail_erase_at: Vec<u32>,
    fail_write_at: Vec<u32>,
    pub(crate) printed: Vec<std::string::String>,
}

impl MockPort {
    /// A region of `size` bytes starting at `base`, freshly erased (all
    /// `0xFF`), matching a device that has never been written.
    pub(crate) fn new(size: u32) -> Self {
        MockPort {
            base: 0x0801_0000,
            mem: std::vec![0xFFu8; size as usize],
            fail_erase_at: Vec::new(),
            fail_write_at: Vec::new(),
            printed: Vec::new(),
        }
    }

    pub(crate) fn with_base(base: u32, size: u32) -> Self {
        MockPort {
            base,
            mem: std::vec![0xFFu8; size as usize],
            fail_erase_at: Vec::new(),
            fail_write_at: Vec::new(),
            printed: Vec::new(),
        }
    }

    pub(crate) fn fail_erase_at(&mut self, addr: u32) {
        self.fail_erase_at.push(addr);
    }

    pub(crate) fn fail_write_at(&mut self, addr: u32) {
        self.fail_write_at.push(addr);
    }

    pub(crate) fn fail_every_erase(&mut self) {
        let mut addr = self.base;
        while addr < self.base + self.mem.len() as u32 {
            self.fail_erase_at.push(addr);
            addr += 4;
        }
    }

    fn range(&self, addr: u32, len: usize) -> core::ops::Range<usize> {
        let start = (addr - self.base) as usize;
        start..start + len
    }

    /// Directly poke bytes into simulated flash, for tests that set up a
    /// pre-existing on-flash image (reboot / corruption scenarios).
    pub(crate) fn poke(&mut self, addr: u32, data: &[u8]) {
        let range = self.range(addr, data.len());
        self.mem[range].copy_from_slice(data);
    }

    pub(crate) fn peek(&self, addr: u32, len: usize) -> &[u8] {
        let range = self.range(addr, len);
        &self.mem[range]
    }
}

impl Port for MockPort {
    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        let range = self.range(addr, buf.len());
        buf.copy_from_slice(&self.mem[range]);
    }

    fn write(&mut self, addr: u32, buf: &[u8]) -> Result<(), Error> {
        if self.fail_write_at.contains(&addr) {
            return Err(Error::WriteErr);
        }
        let range = self.range(addr, buf.len());
        self.mem[range].copy_from_slice(buf);
        Ok(())
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error> {
        if self.fail_erase_at.contains(&addr) {
            return Err(Error::EraseErr);
        }
        let range = self.range(addr, len as usize);
        for b in &mut self.mem[range] {
            *b = 0xFF;
        }
        Ok(())
    }

    fn lock(&mut self) {}

    fn unlock(&mut self) {}

    fn crc32(&self, seed: u32, buf: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new_with_initial(seed);
        hasher.update(buf);
        hasher.finalize()
    }

    fn print(&mut self, line: &str) {
        self.printed.push(line.into());
    }
}

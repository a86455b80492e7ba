#![cfg_attr(not(test), no_std)]

//! A wear-levelled, CRC-protected key/value store for microcontroller NOR
//! flash. See the module docs on [`engine::Engine`] for the public API.

pub mod cache;
pub mod engine;
pub mod integrity;
pub mod layout;
pub mod port;

mod boot;
mod writer;

#[cfg(test)]
pub(crate) mod testutil;

use core::fmt;

/// The envstore error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The port failed to erase a block.
    EraseErr,
    /// The port failed to write a block.
    WriteErr,
    /// A key was empty, contained `=`, or was not found on delete.
    NameErr,
    /// `create` was called with a key that already exists.
    NameExist,
    /// There is no room left to grow the detail region, either in the
    /// cache (`U`) or across every remaining data slot in the region.
    EnvFull,
    /// A fatal port error occurred while persisting the system pointer.
    /// The engine no longer accepts mutations until it is reinitialised.
    Poisoned,
}

/// The result type for envstore.
pub type Result<T> = core::result::Result<T, Error>;

#[rustfmt::skip]
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::EraseErr  => write!(f, "flash erase failed"),
            Error::WriteErr  => write!(f, "flash write failed"),
            Error::NameErr   => write!(f, "env name is empty, contains '=', or does not exist"),
            Error::NameExist => write!(f, "env name already exists"),
            Error::EnvFull   => write!(f, "env region is full"),
            Error::Poisoned  => write!(f, "env engine is poisoned, call init() again"),
        }
    }
}

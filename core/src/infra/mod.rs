//! Infrastructure: storage, access checks, locking, logging

pub mod access;
pub mod db;
pub mod locks;
pub mod logging;

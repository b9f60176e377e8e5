// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! The OPC UA encoding engine. It gives every built-in OPC UA type, and any structure
//! described at runtime, a canonical representation in the binary, XML and JSON encodings.
//!
//! The [`types`] module holds the codecs, the type registry used to resolve extension
//! objects and the [`types::codec`] facade that most callers will use.

#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::float_cmp)]
#![allow(clippy::from_over_into)]
#![allow(clippy::result_unit_err)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[cfg(test)]
extern crate tempdir;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate serde_derive;

/// Tracing macro for obtaining a lock on a `Mutex`. Sometimes deadlocks can happen in code,
/// and if they do, this macro is useful for finding out where they happened.
#[macro_export]
macro_rules! trace_lock {
    ( $x:expr ) => {
        {
//            trace!("{} locking at {}, line {}", stringify!($x), file!(), line!());
            let v = $x.lock();
//            trace!("{} lock completed", stringify!($x));
            v
        }
    }
}

/// Tracing macro for obtaining a read lock on a `RwLock`.
#[macro_export]
macro_rules! trace_read_lock {
    ( $x:expr ) => {
        {
//            trace!("{} read locking at {}, line {}", stringify!($x), file!(), line!());
            let v = $x.read();
//            trace!("{} read lock completed", stringify!($x));
            v
        }
    }
}

/// Tracing macro for obtaining a write lock on a `RwLock`.
#[macro_export]
macro_rules! trace_write_lock {
    ( $x:expr ) => {
        {
//            trace!("{} write locking at {}, line {}", stringify!($x), file!(), line!());
            let v = $x.write();
//            trace!("{} write lock completed", stringify!($x));
            v
        }
    }
}

pub mod config;
#[cfg(feature = "console-logging")]
pub mod console_logging;
pub mod debug;
pub mod sync;
pub mod types;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::types::*;
}

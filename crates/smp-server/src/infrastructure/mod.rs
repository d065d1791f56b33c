//! Infrastructure layer for the SMP server.
//!
//! Contains the OS-facing adapters: the TCP listener and per-connection
//! tasks, and file-system storage of the configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and `smp_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;

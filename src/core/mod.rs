// src/core/mod.rs

/// The fluent cmdlet builder.
pub mod cmdlet;
/// The facade tying pool, session and module manager together.
pub mod environment;
/// Sequential module install and import.
pub mod modules;
/// Location of the psenv config directory.
pub mod paths;
/// Host pool, leases and the lazy pool holder.
pub mod pool;
/// The shared execution context.
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

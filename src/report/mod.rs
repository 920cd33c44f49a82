//! Report renderers for pipeline runs.
//!
//! - [`terminal`] — colored, tabular output with summary box; respects `--verbose` / `--quiet`.
//!
//! The machine-readable `--report json` path serializes the same outcome and
//! reform data directly from `main`.

pub mod terminal;

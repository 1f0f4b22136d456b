//! Core engine — the fetch → analyze → reconcile → construct loop.

pub mod supervisor;

pub use supervisor::{CancelFlag, ScanSupervisor};

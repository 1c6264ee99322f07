//! Shared test fakes for the OrgBridge workspace.
//!
//! - [`FakeTarget`]: a scriptable in-memory platform adapter satisfying the
//!   `Target` contract, with knobs for uneven pages, failing pages, endless
//!   pages, and a deliberately partial role table.
//! - [`InMemoryEntryCenter`]: an authoritative-directory fake whose records
//!   hold attached identity lists and serve write-through entry views.
//!
//! Both exist so contract tests run without process-global state: build a
//! fake, hand it to a `TargetRegistry` or use it directly.

mod entry_center;
mod fake_target;

pub use entry_center::InMemoryEntryCenter;
pub use fake_target::{FakeTarget, FakeTargetBuilder, FakeUser};

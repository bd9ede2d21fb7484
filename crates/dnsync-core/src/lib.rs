// # dnsync-core
//
// Core library for declarative DNS record reconciliation.
//
// ## Architecture Overview
//
// This library converges a provider's DNS zone to a desired record list:
// - **ZoneResolver**: Trait for mapping a zone name to the provider's zone ID
// - **RecordStore**: Trait for reading, creating and deleting records in a zone
// - **Reporter**: Trait for receiving one structured report per record
// - **Reconciler**: Engine that decides no-op / create / replace per record
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic is separate from provider APIs
// 2. **Failure Isolation**: One record failing never aborts the others
// 3. **Explicit Configuration**: Nothing in this crate reads the environment
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A second run over unchanged state changes nothing

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod report;

// Re-export core types for convenience
pub use traits::{
    NewRecord, ObservedRecord, ReconcileOutcome, RecordReport, RecordStore, Reporter, Zone,
    ZoneId, ZoneResolver,
};
pub use engine::{Reconciler, RunSummary, qualify_name};
pub use config::{
    DesiredEntry, DesiredRecord, MatchPolicy, ProviderConfig, ReconcileSettings, RecordType,
    load_desired_records, parse_desired_records,
};
pub use error::{Error, Result};
pub use report::{ChannelReporter, TracingReporter};

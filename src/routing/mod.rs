// ============================================================================
// Cross-Aggregate Event Router
// ============================================================================
//
// A workflow step collects its effects into an `Emission`, one ordered batch
// per target stream. The router hands each batch to the sink that owns the
// stream. Batches are atomic per stream; nothing is atomic across streams.
//
// ============================================================================

pub mod emission;
pub mod router;

pub use emission::*;
pub use router::*;

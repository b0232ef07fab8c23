// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with: labelled digit samples, predictions, and the sources
// that produce samples.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Keeping it framework-free means the data pipeline and the
// metrics can be unit tested without building a backend.

// A labelled, normalised digit image
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;

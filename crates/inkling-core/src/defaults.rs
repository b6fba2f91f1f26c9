//! Centralized default constants for the inkling workspace.
//!
//! Single source of truth for shared default values; crates reference
//! these instead of defining their own magic numbers.

// =============================================================================
// CHANNELS
// =============================================================================

/// Buffer capacity for the client event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Buffer capacity for per-collection subscription channels. Collections
/// are small and pushes are full replacements, so a lagged receiver
/// only loses snapshots that were already superseded.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

// =============================================================================
// NOTES
// =============================================================================

/// Title given to a freshly created note.
pub const NEW_NOTE_TITLE: &str = "New Note";

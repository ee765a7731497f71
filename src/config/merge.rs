//! Merge rules for engine settings.

pub mod merge_policy;

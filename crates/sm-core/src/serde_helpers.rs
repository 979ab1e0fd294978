//! Shared serde helper functions used across multiple modules.

/// Serde default function that returns `true`.
///
/// Used for column nullability, which follows SQL's nullable-by-default rule.
pub fn default_true() -> bool {
    true
}


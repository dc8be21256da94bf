//! Shared pattern sources for common field shapes.

/// `local@domain.tld`: no whitespace, exactly one `@`, at least one `.`
/// after it.
pub const EMAIL: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Letters, digits, dash and underscore only.
pub const IDENTIFIER: &str = r"^[A-Za-z0-9_-]+$";

/// Absolute http(s) URL without whitespace.
pub const URL: &str = r"^https?://[^\s/$.?#][^\s]*$";

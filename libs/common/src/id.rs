use ulid::{Generator, Ulid};

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = mcp_common::id::prefixed_ulid("ses");
/// assert!(id.starts_with("ses_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Prefixed ULIDs that sort in creation order, including within one millisecond.
pub struct MonotonicIds {
    prefix: &'static str,
    generator: Generator,
}

impl MonotonicIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            generator: Generator::new(),
        }
    }

    pub fn next_id(&mut self) -> String {
        // Overflow takes 2^80 ids inside a single millisecond.
        let ulid = self.generator.generate().unwrap_or_else(|_| Ulid::new());
        format!("{}_{}", self.prefix, ulid)
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const SESSION: &str = "ses";
    pub const NOTE: &str = "note";
}

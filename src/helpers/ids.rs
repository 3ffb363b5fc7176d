/// A monotonic id source scoped to a single export call.
///
/// Serializers create one per invocation with a fixed seed, which keeps ids
/// identical across repeated exports of the same input.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn starting_at(seed: u64) -> Self {
        Self { next: seed }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to `next_id` will hand out.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Maps arbitrary text onto `[A-Za-z0-9_]`, collapsing runs of separators.
///
/// The result never starts with a digit and is never empty.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Like `sanitize_identifier`, lowercased. Used for file and knot names derived from titles.
pub fn slugify(raw: &str) -> String {
    sanitize_identifier(raw).to_ascii_lowercase()
}

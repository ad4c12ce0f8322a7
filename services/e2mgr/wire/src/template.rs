//! Payload header templating.
//!
//! A template such as `"$ranIp|$ranPort|$ranName|#payload|"` is expanded
//! against a value whose fields are exposed through a static accessor table:
//!
//! - `$name` expands to the field value, or nothing when the field is unknown
//! - `#name` expands to the length of a string or byte field
//!
//! A name is a run of ASCII alphanumerics; the character that ends it is kept.

use crate::WireError;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Value of a templated field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Text value
    Str(&'a str),
    /// Raw bytes, only usable with `#name`
    Bytes(&'a [u8]),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Floating point value
    Float(f64),
}

/// Named field accessor
pub type FieldAccessor<T> = (&'static str, fn(&T) -> FieldValue<'_>);

/// Types whose fields can be referenced from a payload header template
pub trait TemplateFields: Sized + 'static {
    /// Accessor table, resolved by exact name
    const FIELDS: &'static [FieldAccessor<Self>];

    /// Look up a field by name
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Self::FIELDS
            .iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, accessor)| accessor(self))
    }
}

/// Expand `template` against the fields of `source`
pub fn expand_payload_header<T: TemplateFields>(
    template: &str,
    source: &T,
) -> Result<String, WireError> {
    let mut expanded = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '$' | '#' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphanumeric() {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }

                let Some(value) = source.field(&name) else {
                    continue;
                };

                if ch == '$' {
                    match value {
                        FieldValue::Str(s) => expanded.push_str(s),
                        FieldValue::Int(i) => {
                            let _ = write!(expanded, "{}", i);
                        }
                        FieldValue::Bool(b) => {
                            let _ = write!(expanded, "{}", b);
                        }
                        FieldValue::Float(f) => {
                            let _ = write!(expanded, "{}", f);
                        }
                        FieldValue::Bytes(_) => return Err(WireError::Template(format!("${}", name))),
                    }
                } else {
                    match value {
                        FieldValue::Str(s) => {
                            let _ = write!(expanded, "{}", s.len());
                        }
                        FieldValue::Bytes(b) => {
                            let _ = write!(expanded, "{}", b.len());
                        }
                        _ => return Err(WireError::Template(format!("#{}", name))),
                    }
                }
            }
            ch if !ch.is_control() => expanded.push(ch),
            _ => {}
        }
    }

    Ok(expanded)
}

/// Monotonic transaction id source
#[derive(Debug)]
pub struct TransactionCounter {
    counter: AtomicU64,
}

impl TransactionCounter {
    /// Create a counter starting after `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    /// Seed from wall clock so restarts do not reuse recent ids
    pub fn from_clock() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::new(secs.saturating_sub(1_572_000_000))
    }

    /// Next counter value
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Expand a transaction id pattern.
    ///
    /// `"$"` becomes the next counter value, `"prefix$"` becomes the prefix
    /// followed by the counter value, anything else is returned unchanged.
    pub fn expand(&self, id: &str) -> String {
        match id.strip_suffix('$') {
            Some(prefix) => format!("{}{}", prefix, self.next()),
            None => id.to_string(),
        }
    }
}

impl Default for TransactionCounter {
    fn default() -> Self {
        Self::from_clock()
    }
}

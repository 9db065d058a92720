//! Post-apply wait conditions
//!
//! A condition names a JSONPath into the live object and, optionally, the
//! value expected there. The object is polled until the condition holds or
//! the condition's timeout elapses.
//!
//! Supported JSONPath subset: an optional `$` root, optional kubectl-style
//! `{...}` braces, dotted fields (`\.` escapes a dot inside a key), `[n]`
//! indices and `['key']` / `["key"]` quoted keys.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crdform_core::WaitCondition;

use crate::client::{DynamicClient, ObjectRef};
use crate::error::{KubeError, Result};

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed JSONPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            KubeError::InvalidInput(format!("invalid jsonpath '{expr}': {reason}"))
        };

        let mut body = expr.trim();
        if let Some(inner) = body.strip_prefix('{') {
            body = inner
                .strip_suffix('}')
                .ok_or_else(|| invalid("unbalanced braces"))?
                .trim();
        }
        body = body.strip_prefix('$').unwrap_or(body);

        let chars: Vec<char> = body.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    let (field, next) = read_field(&chars, i);
                    if field.is_empty() {
                        return Err(invalid("empty field name"));
                    }
                    segments.push(Segment::Field(field));
                    i = next;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|p| p + i)
                        .ok_or_else(|| invalid("missing ']'"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();
                    let quoted = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                    match quoted {
                        Some(key) => segments.push(Segment::Field(key.to_string())),
                        None => {
                            let index = inner
                                .parse::<usize>()
                                .map_err(|_| invalid("index must be a non-negative integer"))?;
                            segments.push(Segment::Index(index));
                        }
                    }
                    i = close + 1;
                }
                _ if i == 0 => {
                    // A leading field without a dot, e.g. `status.phase`
                    let (field, next) = read_field(&chars, i);
                    segments.push(Segment::Field(field));
                    i = next;
                }
                c => return Err(invalid(&format!("unexpected '{c}'"))),
            }
        }

        if segments.is_empty() {
            return Err(invalid("path selects nothing"));
        }

        Ok(Self {
            raw: expr.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Select the value at this path
    pub fn select<'a>(&self, value: &'a JsonValue) -> Option<&'a JsonValue> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Field(key) => current.get(key.as_str()),
                Segment::Index(index) => current.get(*index),
            })
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn read_field(chars: &[char], mut i: usize) -> (String, usize) {
    let mut field = String::new();
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&'.') => {
                field.push('.');
                i += 2;
            }
            '.' | '[' => break,
            c if c.is_whitespace() => break,
            c => {
                field.push(c);
                i += 1;
            }
        }
    }
    (field, i)
}

/// String form used for comparison; `None` for absent or null values
pub fn stringify(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Whether `object` satisfies the condition at `path`
pub fn is_satisfied(object: &JsonValue, path: &JsonPath, expected: Option<&str>) -> bool {
    match (stringify(path.select(object)), expected) {
        (Some(observed), Some(expected)) => observed == expected,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Polls objects until their wait conditions hold
pub struct Waiter {
    client: Arc<dyn DynamicClient>,
    interval: Duration,
}

impl Waiter {
    pub fn new(client: Arc<dyn DynamicClient>) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wait for every condition in order
    pub async fn wait_all(&self, target: &ObjectRef, conditions: &[WaitCondition]) -> Result<()> {
        for condition in conditions {
            self.wait_for(target, condition).await?;
        }
        Ok(())
    }

    /// Wait for one condition, returning the object that satisfied it
    pub async fn wait_for(&self, target: &ObjectRef, condition: &WaitCondition) -> Result<JsonValue> {
        let path = JsonPath::parse(&condition.jsonpath)?;
        let expected = condition.value.as_deref();
        let deadline = Instant::now() + condition.timeout;

        info!(
            target = %target,
            jsonpath = %path,
            expected = expected.unwrap_or("<any>"),
            timeout = ?condition.timeout,
            "waiting for condition"
        );

        loop {
            let observed = match self.client.get(target).await {
                Ok(object) => {
                    if is_satisfied(&object, &path, expected) {
                        debug!(target = %target, jsonpath = %path, "condition met");
                        return Ok(object);
                    }
                    stringify(path.select(&object))
                }
                // Not visible yet
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(KubeError::WaitTimeout {
                    key: target.key.to_id(),
                    jsonpath: condition.jsonpath.clone(),
                    expected: expected.unwrap_or("any non-null value").to_string(),
                    observed: observed.unwrap_or_else(|| "<absent>".to_string()),
                    timeout: condition.timeout,
                });
            }

            debug!(target = %target, observed = ?observed, "condition not met yet");
            tokio::time::sleep(self.interval.min(deadline - now)).await;
        }
    }
}

use std::fmt;

const PREFIX: &str = "metrics:";

/// Cache key for one metrics request shape.
///
/// Components are length-prefixed (`<len>:<value>`), so values containing
/// the `|` separator cannot collide with a different triple. An absent
/// component and an empty one produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(
        unit_type: Option<&str>,
        username: Option<&str>,
        convert_to_unit: Option<&str>,
    ) -> Self {
        let parts: Vec<String> = [unit_type, username, convert_to_unit]
            .iter()
            .map(|part| {
                let value = part.unwrap_or("");
                format!("{}:{}", value.len(), value)
            })
            .collect();
        Self(format!("{}{}", PREFIX, parts.join("|")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Inline `style` attribute parsing
//!
//! Declarations are kept in source order as `(name, value)` pairs.
//! Malformed declarations without a `:` are dropped.

/// Parse `fill:#fff; stroke: none` into ordered declarations
pub fn parse(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Serialize declarations back into `name:value;name:value` form
pub fn serialize(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join(";")
}

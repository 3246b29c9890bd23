//! Name inflection for derived key prefixes and resource types.

/// Convert a CamelCase type name to snake_case.
///
/// Namespaced names (`shop::Post`) keep only the final segment.
pub fn underscore(name: &str) -> String {
    let base = name.rsplit("::").next().unwrap_or(name);
    let mut out = String::with_capacity(base.len() + 4);
    let mut prev_lower = false;
    for ch in base.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Reduce a plural noun to its singular form.
///
/// Covers the regular English forms that appear in type and association
/// names; irregular nouns should use an explicit prefix override instead.
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if name.ends_with("ss") || name.ends_with("us") {
        return name.to_string();
    }
    if let Some(stem) = name.strip_suffix('s') {
        if !stem.is_empty() {
            return stem.to_string();
        }
    }
    name.to_string()
}

/// Derived cache-key prefix for a type name: lower-cased, underscored,
/// singular.
pub fn key_prefix(type_name: &str) -> String {
    singularize(&underscore(type_name))
}

//! Link-name normalization.
//! - Missing, empty, or control-character-only names mean the root ("/").
//! - Runs of separators collapse to one; a trailing separator is dropped.
//! - The result always starts with "/".

pub const ROOT: &str = "/";

/// Canonical absolute form of a link name. Total and idempotent.
pub fn normalize(name: &str) -> String {
    if name.chars().all(char::is_control) {
        return ROOT.to_string();
    }
    let mut out = String::with_capacity(name.len() + 1);
    for seg in name.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

pub fn is_root(name: &str) -> bool {
    normalize(name) == ROOT
}

/// Parent of a link name (the root is its own parent).
pub fn parent_of(name: &str) -> String {
    let name = normalize(name);
    match name.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(i) => name[..i].to_string(),
    }
}

/// Join a relative name onto an absolute scope.
pub fn join_names(scope: &str, name: &str) -> String {
    normalize(&format!("{scope}/{name}"))
}

/// True when `name` is `ancestor` or lies beneath it, compared segment by segment
/// ("/obs2" is not within "/obs").
pub fn is_within(name: &str, ancestor: &str) -> bool {
    let name = normalize(name);
    let ancestor = normalize(ancestor);
    if ancestor == ROOT {
        return true;
    }
    name == ancestor
        || name
            .strip_prefix(&ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

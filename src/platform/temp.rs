//! Unique hidden sibling names for write-then-rename operations.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `target` in the same directory, so a later rename stays on one
/// filesystem. Pattern: .adxlink.<tag>.<pid>.<nanos>.<seq>.tmp
pub fn tmp_sibling_name(target: &Path, tag: &str) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!(".adxlink.{tag}.{pid}.{nanos}.{seq}.tmp");
    match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => Path::new(".").join(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn uniqueness_concurrent() {
        let target = Path::new("data/pbmc.adx");
        let mut handles = Vec::new();
        for _ in 0..32 {
            let t = target.to_path_buf();
            handles.push(thread::spawn(move || tmp_sibling_name(&t, "backup")));
        }
        let mut set = HashSet::new();
        for h in handles {
            let p = h.join().unwrap();
            assert_eq!(p.parent(), Some(Path::new("data")));
            assert!(set.insert(p));
        }
        assert_eq!(set.len(), 32);
    }

    #[test]
    fn bare_file_name_lands_in_cwd() {
        let p = tmp_sibling_name(Path::new("pbmc.adx"), "swap");
        assert_eq!(p.parent(), Some(Path::new(".")));
        assert!(p.file_name().unwrap().to_string_lossy().starts_with(".adxlink.swap."));
    }
}

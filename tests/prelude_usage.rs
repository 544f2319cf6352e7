use adxlink::prelude::*;

#[test]
fn prelude_exports_expected_items() {
    let cfg = Config::default();
    let _ = LogLevel::Debug;
    let _ = OpenMode::ReadOnly;
    let _err = LinkError::Interrupted;
    let _kind = LinkKind::Root;
    let _opts = ListOptions::default();
    // Signatures stay visible through the prelude.
    let _overwrite: fn(&Config, &std::path::Path, &str, bool) -> LinkResult<std::path::PathBuf> = overwrite;
    let _shutdown: fn() = request_shutdown;
    assert!(!cfg.retry_enabled());
}

use std::sync::LazyLock;
use regex::Regex;

static RE_NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]").unwrap());

/// Canonical form used for every name comparison: lower-cased with anything
/// outside `[a-z0-9]` removed.
///
/// `"My-App"`, `"my app"` and `"com.foo.MyApp"` become `"myapp"`, `"myapp"`
/// and `"comfoomyapp"`.
pub fn canonical_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    RE_NON_ALNUM.replace_all(&lowered, "").into_owned()
}

/// File name of a path minus a trailing `.app`, canonicalized.
pub fn canonical_bundle_stem(path: &std::path::Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".app")
        .map(str::to_string)
        .unwrap_or(name);
    canonical_name(&stem)
}

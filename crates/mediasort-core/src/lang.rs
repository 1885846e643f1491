use std::collections::HashSet;
use std::path::Path;

/// Detect the languages present in a path's textual components.
/// Components without alphabetic characters are skipped, so counters
/// and separators don't produce spurious detections.
pub fn detect_languages(value: &str) -> HashSet<String> {
    let mut langs = HashSet::new();
    for component in Path::new(value).components() {
        let text = component.as_os_str().to_string_lossy();
        if !text.chars().any(char::is_alphabetic) {
            continue;
        }
        if let Some(info) = whatlang::detect(&text) {
            langs.insert(info.lang().code().to_string());
        }
    }
    langs
}

/// Whether any language detected in `path` is in the excluded list.
/// Used to refuse a source root outright and to skip the XMP reader,
/// which mishandles paths in these scripts.
pub fn path_has_excluded(path: &str, excluded: &[String]) -> bool {
    let detected = detect_languages(path);
    excluded.iter().any(|lang| detected.contains(lang))
}

// Standard-library preloading.
//
// Stdlib btrc sources ship inside the binary and are prepended to
// user programs. A stdlib file is suppressed entirely when the user
// redefines any class it contains. The assembled prefix is cached
// process-wide, keyed by the set of user-defined class names (that
// set alone decides which files are skipped).

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Embedded stdlib sources. Collections (List/Map/Set) are compiler
/// built-ins and are not represented here.
const STDLIB_FILES: &[(&str, &str)] = &[("math.btrc", include_str!("../stdlib/math.btrc"))];

static STDLIB_CACHE: OnceLock<Mutex<HashMap<BTreeSet<String>, String>>> = OnceLock::new();

/// The stdlib source to prepend for a given user program.
pub fn get_stdlib_source(user_source: &str) -> String {
    let user_classes = scan_class_names(user_source);

    let cache = STDLIB_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(guard) = cache.lock() {
        if let Some(cached) = guard.get(&user_classes) {
            return cached.clone();
        }
    }

    let mut parts = Vec::new();
    for (name, content) in STDLIB_FILES {
        let file_classes = scan_class_names(content);
        if file_classes.intersection(&user_classes).next().is_some() {
            log::debug!("stdlib file {} suppressed by user redefinition", name);
            continue;
        }
        parts.push(*content);
    }
    let result = parts.join("\n");

    if let Ok(mut guard) = cache.lock() {
        guard.insert(user_classes, result.clone());
    }
    result
}

/// Names declared with `class <Name>`. A token-level scan is enough —
/// this runs before parsing, on possibly invalid source.
fn scan_class_names(source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut words = source.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if word == "class" {
            if let Some(next) = words.peek() {
                let name: String = next
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if !name.is_empty() {
                    names.insert(name);
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_class_names() {
        let names = scan_class_names("class Foo {\n} class Bar{ int x; }");
        assert!(names.contains("Foo"));
        assert!(names.contains("Bar"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_stdlib_included_by_default() {
        let src = get_stdlib_source("int main() { return 0; }");
        assert!(src.contains("class Math"));
    }

    #[test]
    fn test_stdlib_suppressed_on_redefinition() {
        let src = get_stdlib_source("class Math { }\nint main() { return 0; }");
        assert!(!src.contains("static int abs"));
    }
}

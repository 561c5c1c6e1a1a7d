// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Class list composition.
use crate::hooks::ClassMap;

const RESET: &str = "$reset";
const REMOVE_PREFIX: &str = "$remove:";

/// Merge class maps in order.
///
/// A map carrying `$reset: true` discards everything merged before it, and an
/// enabled `$remove:<class>` entry drops `<class>` from the result so far.
pub fn merge_class_lists<'a, I>(lists: I) -> ClassMap
where
    I: IntoIterator<Item = Option<&'a ClassMap>>,
{
    let mut merged = ClassMap::new();
    for list in lists {
        if let Some(list) = list {
            if list.get(RESET).copied().unwrap_or(false) {
                merged.clear();
            }
            merged.extend(
                list.iter()
                    .filter(|(k, _)| k.as_str() != RESET)
                    .map(|(k, v)| (k.clone(), *v)),
            );
        }
        apply_removals(&mut merged);
    }
    merged
}

fn apply_removals(classes: &mut ClassMap) {
    let removals: Vec<String> = classes
        .iter()
        .filter_map(|(k, enabled)| {
            k.strip_prefix(REMOVE_PREFIX)
                .filter(|_| *enabled)
                .map(str::to_owned)
        })
        .collect();
    classes.retain(|k, _| !k.starts_with(REMOVE_PREFIX));
    for class in removals {
        classes.remove(&class);
    }
}

/// Enabled classes joined by spaces; `None` when nothing is enabled.
pub fn render_class_list(classes: &ClassMap) -> Option<String> {
    let enabled: Vec<&str> = classes
        .iter()
        .filter(|(k, enabled)| **enabled && !k.starts_with('$'))
        .map(|(k, _)| k.as_str())
        .collect();
    if enabled.is_empty() {
        None
    } else {
        Some(enabled.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, bool)]) -> ClassMap {
        entries.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn later_lists_override_earlier() {
        let a = map(&[("outer", true), ("wide", true)]);
        let b = map(&[("wide", false), ("dark", true)]);
        let merged = merge_class_lists([Some(&a), None, Some(&b)]);
        assert_eq!(render_class_list(&merged).as_deref(), Some("dark outer"));
    }

    #[test]
    fn reset_and_remove() {
        let a = map(&[("outer", true), ("wide", true)]);
        let b = map(&[("$reset", true), ("inner", true), ("extra", true)]);
        let c = map(&[("$remove:extra", true)]);
        let merged = merge_class_lists([Some(&a), Some(&b), Some(&c)]);
        assert_eq!(render_class_list(&merged).as_deref(), Some("inner"));
        assert_eq!(render_class_list(&ClassMap::new()), None);
    }
}

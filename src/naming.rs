//! Component naming.
//!
//! Pure functions from reference pointer strings to component names, plus
//! identifier validation and the construction of internal pointers.
//!
//! # Precedence
//!
//! For `./components/schemas/User.yaml` the name comes from the segment after
//! the component directory (`User`). Without such a directory the file base
//! name is used (`./paths/users.yaml` gives `users`). Pointers with a
//! fragment (`./common.yaml#/components/schemas/Error`) take their name from
//! the fragment first.

use crate::loader::strip_schema_extension;
use crate::types::{ComponentKind, COMPONENTS_KEY};

/// Split a pointer into its file part and optional fragment (`#...`).
pub fn split_pointer(pointer: &str) -> (&str, Option<&str>) {
    match pointer.find('#') {
        Some(idx) => (&pointer[..idx], Some(&pointer[idx..])),
        None => (pointer, None),
    }
}

/// Replace platform path separators with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Derive the component name for an external pointer.
///
/// Returns `None` when neither the component-directory convention nor the
/// file base name yields a non-empty name; the caller then inlines.
pub fn component_name(pointer: &str) -> Option<String> {
    component_target(pointer).map(|(_, name)| name)
}

/// Derive the collection and name an external pointer registers under.
///
/// Falls back to the schema-like collection when no component directory is
/// named in the pointer.
pub fn component_target(pointer: &str) -> Option<(ComponentKind, String)> {
    let (file, fragment) = split_pointer(pointer);

    if let Some(target) = fragment.and_then(fragment_target) {
        return Some(target);
    }

    let file = normalize_separators(file);
    if let Some(target) = directory_convention(&file) {
        return Some(target);
    }

    base_name(&file).map(|name| (ComponentKind::Schemas, name))
}

/// Match a file path against the component-directory convention.
///
/// Looks for a segment naming a component kind (`schemas`, `responses`, ...)
/// followed by at least one more segment, and returns the kind with that
/// following segment stripped of its extension. The last such match wins.
pub fn directory_convention(path: &str) -> Option<(ComponentKind, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .windows(2)
        .rev()
        .find_map(|pair| {
            let kind = ComponentKind::from_dir_name(pair[0])?;
            let name = strip_schema_extension(pair[1]).unwrap_or(pair[1]);
            valid_segment(name).then(|| (kind, name.to_string()))
        })
}

/// The collection and name a pointer spells out itself, through a
/// component directory in its fragment or file path.
///
/// Unlike [`component_target`] there is no fallback to the last fragment
/// segment or the file base name.
pub fn explicit_target(pointer: &str) -> Option<(ComponentKind, String)> {
    let (file, fragment) = split_pointer(pointer);
    if let Some(fragment) = fragment {
        return fragment_convention(&fragment_segments(fragment));
    }
    directory_convention(&normalize_separators(file))
}

fn fragment_segments(fragment: &str) -> Vec<String> {
    fragment
        .trim_start_matches('#')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn fragment_convention(segments: &[String]) -> Option<(ComponentKind, String)> {
    segments.windows(2).rev().find_map(|pair| {
        let kind = ComponentKind::from_dir_name(&pair[0])?;
        Some((kind, pair[1].clone()))
    })
}

fn fragment_target(fragment: &str) -> Option<(ComponentKind, String)> {
    let segments = fragment_segments(fragment);
    fragment_convention(&segments).or_else(|| {
        segments
            .last()
            .filter(|s| s.as_str() != COMPONENTS_KEY)
            .map(|s| (ComponentKind::Schemas, s.clone()))
    })
}

fn base_name(path: &str) -> Option<String> {
    let last = path.rsplit('/').next()?;
    let name = strip_schema_extension(last).unwrap_or(last);
    valid_segment(name).then(|| name.to_string())
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

/// Returns true if `name` can be used as a component name inside an
/// internal pointer: ASCII letters, digits, `-`, `.`, `_`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Replace every disallowed character with `_`.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape one JSON Pointer segment (`~` as `~0`, `/` as `~1`).
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Build the internal pointer to a component, e.g. `#/components/schemas/User`.
pub fn internal_pointer(kind: ComponentKind, name: &str) -> String {
    format!(
        "#/{}/{}/{}",
        COMPONENTS_KEY,
        kind.container(),
        escape_pointer_segment(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_target_needs_a_component_directory() {
        assert_eq!(
            explicit_target("../components/responses/NotFound.yaml"),
            Some((ComponentKind::Responses, "NotFound".to_string()))
        );
        assert_eq!(
            explicit_target("./common.yaml#/components/headers/X-Rate"),
            Some((ComponentKind::Headers, "X-Rate".to_string()))
        );
        assert_eq!(explicit_target("./Shared.yaml"), None);
        assert_eq!(explicit_target("./paths/users.yaml"), None);
        assert_eq!(explicit_target("./common.yaml#/Error"), None);
    }

    #[test]
    fn component_directory_segment_wins() {
        assert_eq!(
            component_name("./components/schemas/User.yaml"),
            Some("User".to_string())
        );
        assert_eq!(
            component_name("../components/schemas/User.yaml"),
            Some("User".to_string())
        );
        assert_eq!(
            component_name("components/schemas/User"),
            Some("User".to_string())
        );
    }

    #[test]
    fn name_is_segment_after_directory_not_file() {
        assert_eq!(
            component_name("./components/schemas/user/index.yaml"),
            Some("user".to_string())
        );
    }

    #[test]
    fn falls_back_to_base_name() {
        assert_eq!(
            component_name("./paths/users.yaml"),
            Some("users".to_string())
        );
        assert_eq!(component_name("pet.json"), Some("pet".to_string()));
    }

    #[test]
    fn no_extension() {
        assert_eq!(component_name("./models/Order"), Some("Order".to_string()));
    }

    #[test]
    fn multiple_dots_strip_only_the_extension() {
        assert_eq!(
            component_name("./components/schemas/User.v2.yaml"),
            Some("User.v2".to_string())
        );
        assert_eq!(
            component_name("./shared/error.model.yml"),
            Some("error.model".to_string())
        );
    }

    #[test]
    fn unknown_extension_kept() {
        assert_eq!(component_name("./notes.txt"), Some("notes.txt".to_string()));
    }

    #[test]
    fn windows_separators() {
        assert_eq!(
            component_target("components\\responses\\NotFound.yaml"),
            Some((ComponentKind::Responses, "NotFound".to_string()))
        );
        assert_eq!(
            component_name(".\\paths\\users.yaml"),
            Some("users".to_string())
        );
    }

    #[test]
    fn underivable_names() {
        assert_eq!(component_name(""), None);
        assert_eq!(component_name("./"), None);
        assert_eq!(component_name(".."), None);
        assert_eq!(component_name("dir/.yaml"), Some(".yaml".to_string()));
    }

    #[test]
    fn kind_follows_directory() {
        assert_eq!(
            component_target("./components/parameters/limit.yaml"),
            Some((ComponentKind::Parameters, "limit".to_string()))
        );
        assert_eq!(
            component_target("./components/request-bodies/NewPet.yaml"),
            Some((ComponentKind::RequestBodies, "NewPet".to_string()))
        );
        assert_eq!(
            component_target("./paths/users.yaml"),
            Some((ComponentKind::Schemas, "users".to_string()))
        );
    }

    #[test]
    fn directory_without_following_segment_uses_base_name() {
        assert_eq!(
            component_target("./schemas"),
            Some((ComponentKind::Schemas, "schemas".to_string()))
        );
    }

    #[test]
    fn fragment_names() {
        assert_eq!(
            component_target("./common.yaml#/components/responses/Error"),
            Some((ComponentKind::Responses, "Error".to_string()))
        );
        assert_eq!(
            component_target("./models.yaml#/Pet"),
            Some((ComponentKind::Schemas, "Pet".to_string()))
        );
        assert_eq!(
            component_target("./models.yaml#/defs/a~1b"),
            Some((ComponentKind::Schemas, "a/b".to_string()))
        );
        assert_eq!(
            component_target("./components/schemas/Pet.yaml#"),
            Some((ComponentKind::Schemas, "Pet".to_string()))
        );
    }

    #[test]
    fn split_pointer_parts() {
        assert_eq!(split_pointer("a.yaml#/b"), ("a.yaml", Some("#/b")));
        assert_eq!(split_pointer("a.yaml"), ("a.yaml", None));
        assert_eq!(split_pointer("#/b"), ("", Some("#/b")));
    }

    #[test]
    fn valid_names() {
        assert!(is_valid_name("User"));
        assert!(is_valid_name("user-v1.2_final"));
        assert!(!is_valid_name("{id}"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_name("{id}"), "_id_");
        assert_eq!(sanitize_name("users/{id}"), "users__id_");
        assert_eq!(sanitize_name("Ok"), "Ok");
        assert!(is_valid_name(&sanitize_name("é ü")));
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn internal_pointer_escapes_name() {
        assert_eq!(
            internal_pointer(ComponentKind::Schemas, "User"),
            "#/components/schemas/User"
        );
        assert_eq!(
            internal_pointer(ComponentKind::RequestBodies, "a/b~c"),
            "#/components/requestBodies/a~1b~0c"
        );
    }
}

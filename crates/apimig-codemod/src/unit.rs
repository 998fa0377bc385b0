//! Per-file transformation input
//!
//! A [`TransformUnit`] is built once per file and never mutated. It carries
//! everything the rules need that does not change while rules are applied:
//! classification, detected preset, and the legacy bindings collected from
//! the original syntax tree.

use crate::bindings::LegacyBindings;
use crate::config::RewriteConfig;
use crate::rules::prefix::versioned_prefix_len;
use crate::syntax::Dialect;
use apimig_core::Preset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

/// What kind of module a file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// `useSomething.ts`
    Hook,
    /// `.tsx` / `.jsx`
    Component,
    /// Anything else
    ApiModule,
}

impl FileRole {
    /// Classify by file name
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let is_hook = stem
            .strip_prefix("use")
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_uppercase);
        if is_hook {
            FileRole::Hook
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("tsx" | "jsx")) {
            FileRole::Component
        } else {
            FileRole::ApiModule
        }
    }

    /// Name used in reports
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FileRole::Hook => "hook",
            FileRole::Component => "component",
            FileRole::ApiModule => "api_module",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `path` is a test, mock, or end-to-end file
#[must_use]
pub fn is_test_path(path: &Path) -> bool {
    let in_test_dir = path.components().any(|c| match c {
        Component::Normal(seg) => matches!(seg.to_str(), Some("__tests__" | "__mocks__" | "e2e")),
        _ => false,
    });
    if in_test_dir {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(".test.") || n.contains(".spec."))
}

/// Path presets in precedence order
const PATH_PRECEDENCE: [Preset; 5] = [
    Preset::Admin,
    Preset::Auth,
    Preset::Upload,
    Preset::Batch,
    Preset::Public,
];

/// Pick the preset for a file
///
/// Directory segments win over content; content wins over `fallback`.
/// Route groups such as `(admin)` count as the bare segment.
#[must_use]
pub fn detect_preset(path: &Path, source: &str, fallback: Preset) -> Preset {
    if let Some(preset) = preset_from_path(path) {
        return preset;
    }
    preset_from_content(source).unwrap_or(fallback)
}

fn preset_from_path(path: &Path) -> Option<Preset> {
    let segments: Vec<String> = path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(seg) => seg.to_str(),
            _ => None,
        })
        .map(|seg| {
            seg.trim_start_matches('(')
                .trim_end_matches(')')
                .to_ascii_lowercase()
        })
        .collect();

    PATH_PRECEDENCE
        .into_iter()
        .find(|preset| segments.iter().any(|s| s == preset.as_str()))
}

fn preset_from_content(source: &str) -> Option<Preset> {
    if source.contains("multipart/form-data") {
        Some(Preset::Upload)
    } else if has_versioned_route(source, "admin") {
        Some(Preset::Admin)
    } else if has_versioned_route(source, "auth") {
        Some(Preset::Auth)
    } else if disables_credentials(source) {
        Some(Preset::Public)
    } else {
        None
    }
}

/// `/api/v<digits>/<segment>` anywhere in `source`
fn has_versioned_route(source: &str, segment: &str) -> bool {
    source.match_indices("/api/v").any(|(at, _)| {
        let rest = &source[at..];
        versioned_prefix_len(rest).is_some_and(|len| {
            rest[len..]
                .strip_prefix('/')
                .is_some_and(|tail| tail.starts_with(segment))
        })
    })
}

fn disables_credentials(source: &str) -> bool {
    source.match_indices("withCredentials").any(|(at, key)| {
        source[at + key.len()..]
            .trim_start()
            .strip_prefix(':')
            .is_some_and(|v| v.trim_start().starts_with("false"))
    })
}

/// Immutable input for one file's transformation
#[derive(Debug, Clone)]
pub struct TransformUnit<'a> {
    path: &'a Path,
    source: &'a str,
    dialect: Dialect,
    is_test: bool,
    role: FileRole,
    preset: Preset,
    bindings: LegacyBindings,
}

impl<'a> TransformUnit<'a> {
    /// Classify a file without parsing it
    #[must_use]
    pub fn new(path: &'a Path, source: &'a str, config: &RewriteConfig) -> Self {
        Self {
            path,
            source,
            dialect: Dialect::from_path(path),
            is_test: is_test_path(path),
            role: FileRole::detect(path),
            preset: detect_preset(path, source, config.default_preset),
            bindings: LegacyBindings::default(),
        }
    }

    /// Attach bindings collected from the original tree
    #[inline]
    #[must_use]
    pub fn with_bindings(mut self, bindings: LegacyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// File path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'a Path {
        self.path
    }

    /// Original source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Grammar flavour
    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether the file is a test
    #[inline]
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.is_test
    }

    /// Detected role
    #[inline]
    #[must_use]
    pub fn role(&self) -> FileRole {
        self.role
    }

    /// Detected preset
    #[inline]
    #[must_use]
    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Legacy bindings of the original file
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &LegacyBindings {
        &self.bindings
    }

    /// Quote character for synthesized string literals
    #[inline]
    #[must_use]
    pub fn quote(&self) -> char {
        self.bindings.quote()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_are_recognised() {
        assert!(is_test_path(Path::new("src/__tests__/api.ts")));
        assert!(is_test_path(Path::new("src/__mocks__/api.ts")));
        assert!(is_test_path(Path::new("e2e/login.ts")));
        assert!(is_test_path(Path::new("src/api.test.ts")));
        assert!(is_test_path(Path::new("src/Widget.spec.tsx")));
        assert!(!is_test_path(Path::new("src/testing/api.ts")));
        assert!(!is_test_path(Path::new("src/latest.ts")));
    }

    #[test]
    fn roles() {
        assert_eq!(FileRole::detect(Path::new("hooks/useUsers.ts")), FileRole::Hook);
        assert_eq!(FileRole::detect(Path::new("ui/UserList.tsx")), FileRole::Component);
        assert_eq!(FileRole::detect(Path::new("lib/users.ts")), FileRole::ApiModule);
        assert_eq!(FileRole::detect(Path::new("lib/user.ts")), FileRole::ApiModule);
        assert_eq!(FileRole::detect(Path::new("lib/client.js")), FileRole::ApiModule);
    }

    #[test]
    fn path_outranks_content() {
        let source = "fetch('/api/v1/auth/login')";
        assert_eq!(
            detect_preset(Path::new("app/(admin)/users/page.tsx"), source, Preset::Default),
            Preset::Admin
        );
    }

    #[test]
    fn path_precedence_admin_first() {
        assert_eq!(
            detect_preset(Path::new("app/auth/admin/x.ts"), "", Preset::Default),
            Preset::Admin
        );
    }

    #[test]
    fn file_name_is_not_a_segment() {
        assert_eq!(
            detect_preset(Path::new("lib/auth.ts"), "", Preset::Default),
            Preset::Default
        );
    }

    #[test]
    fn content_rules() {
        let p = Path::new("lib/x.ts");
        assert_eq!(
            detect_preset(p, "headers: { 'Content-Type': 'multipart/form-data' }", Preset::Default),
            Preset::Upload
        );
        assert_eq!(detect_preset(p, "get('/api/v2/admin/users')", Preset::Default), Preset::Admin);
        assert_eq!(detect_preset(p, "post('/api/v1/auth/login')", Preset::Default), Preset::Auth);
        assert_eq!(detect_preset(p, "{ withCredentials : false }", Preset::Default), Preset::Public);
        assert_eq!(detect_preset(p, "get('/api/vx/admin')", Preset::Batch), Preset::Batch);
    }
}

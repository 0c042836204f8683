//! Document linting - static checks of JSON:API document files.
//!
//! Checks document files for:
//! - JSON syntax errors
//! - Missing or conflicting top-level `data`/`errors`
//! - Invalid member names and malformed resource objects
//! - Duplicate `(type, id)` pairs in `included`
//! - Unsupported `jsonapi.version` values

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api_error::{CombinedError, ErrorDocument, JsonApiError};
use crate::loader::load_document;
use crate::types::{
    is_valid_member_name, json_type_name, ErrorDocumentOptions, JsonApiVersion,
};

/// Title of error objects produced from lint diagnostics.
pub const LINT_TITLE: &str = "Document Error";

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON Pointer to the issue (e.g., "/data/attributes")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    /// Convert every diagnostic into a JSON:API error object.
    pub fn to_error_document(&self, options: &ErrorDocumentOptions) -> ErrorDocument {
        let errors = self
            .diagnostics
            .iter()
            .map(|d| {
                JsonApiError::new(LINT_TITLE, format!("{}: {}", d.code, d.message), 400)
                    .with_pointer(d.path.clone())
            })
            .collect();
        CombinedError::new(400, errors).to_document(options)
    }
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();
    let diagnostics = match load_document(file) {
        Ok(document) => lint_document(&document, file),
        Err(e) => vec![Diagnostic {
            severity: Severity::Error,
            code: "E001".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: format!("syntax error: {}", e),
        }],
    };

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.iter().any(|d| d.severity == Severity::Warning) {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Check an already-parsed document. `file` is only recorded on diagnostics.
pub fn lint_document(document: &Value, file: &Path) -> Vec<Diagnostic> {
    let mut linter = Linter {
        file,
        diagnostics: Vec::new(),
    };
    linter.document(document);
    linter.diagnostics
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

struct Linter<'a> {
    file: &'a Path,
    diagnostics: Vec<Diagnostic>,
}

impl Linter<'_> {
    fn push(&mut self, severity: Severity, code: &str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path: path.to_string(),
            message,
        });
    }

    fn error(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Error, code, path, message);
    }

    fn document(&mut self, document: &Value) {
        let Value::Object(top) = document else {
            self.error(
                "E002",
                "/",
                format!("document must be an object, got {}", json_type_name(document)),
            );
            return;
        };

        match (top.get("data"), top.get("errors")) {
            (None, None) => {
                self.error("E002", "/", "document must contain data or errors".to_string())
            }
            (Some(_), Some(_)) => self.error(
                "E002",
                "/",
                "document must not contain both data and errors".to_string(),
            ),
            _ => {}
        }

        let mut primary = HashSet::new();
        match top.get("data") {
            Some(Value::Object(resource)) => {
                self.resource(resource, "/data", &mut primary);
            }
            Some(Value::Array(resources)) => {
                for (i, resource) in resources.iter().enumerate() {
                    self.resource_value(resource, &format!("/data/{}", i), &mut primary);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => self.error(
                "E002",
                "/data",
                format!("data must be an object, array or null, got {}", json_type_name(other)),
            ),
        }

        if let Some(errors) = top.get("errors") {
            if !errors.is_array() {
                self.error(
                    "E002",
                    "/errors",
                    format!("errors must be an array, got {}", json_type_name(errors)),
                );
            }
        }

        match top.get("included") {
            Some(Value::Array(included)) => self.included(included, &primary),
            Some(other) => self.error(
                "E002",
                "/included",
                format!("included must be an array, got {}", json_type_name(other)),
            ),
            None => {}
        }

        if let Some(jsonapi) = top.get("jsonapi") {
            self.version(jsonapi);
        }
    }

    fn included(&mut self, included: &[Value], primary: &HashSet<(String, String)>) {
        let mut seen = HashSet::new();
        for (i, resource) in included.iter().enumerate() {
            let path = format!("/included/{}", i);
            let mut identity = HashSet::new();
            self.resource_value(resource, &path, &mut identity);

            for key in identity {
                if primary.contains(&key) {
                    self.push(
                        Severity::Warning,
                        "W001",
                        &path,
                        format!("primary resource {}/{} repeated in included", key.0, key.1),
                    );
                }
                if !seen.insert(key.clone()) {
                    self.error(
                        "E004",
                        &path,
                        format!("duplicate included resource {}/{}", key.0, key.1),
                    );
                }
            }
        }
    }

    fn resource_value(&mut self, value: &Value, path: &str, seen: &mut HashSet<(String, String)>) {
        match value {
            Value::Object(resource) => self.resource(resource, path, seen),
            other => self.error(
                "E006",
                path,
                format!("resource must be an object, got {}", json_type_name(other)),
            ),
        }
    }

    /// Check one resource object, recording its `(type, id)` in `seen`.
    fn resource(
        &mut self,
        resource: &Map<String, Value>,
        path: &str,
        seen: &mut HashSet<(String, String)>,
    ) {
        let resource_type = match resource.get("type") {
            Some(Value::String(t)) => {
                if !is_valid_member_name(t) {
                    self.error(
                        "E003",
                        &format!("{}/type", path),
                        format!("invalid type name \"{}\"", t),
                    );
                }
                Some(t.clone())
            }
            Some(other) => {
                self.error(
                    "E006",
                    &format!("{}/type", path),
                    format!("type must be a string, got {}", json_type_name(other)),
                );
                None
            }
            None => {
                self.error("E006", path, "resource object missing type".to_string());
                None
            }
        };

        let id = match resource.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => {
                self.error(
                    "E007",
                    &format!("{}/id", path),
                    format!("id must be a string, got {}", json_type_name(other)),
                );
                None
            }
            None => None,
        };

        if let (Some(resource_type), Some(id)) = (resource_type, id) {
            seen.insert((resource_type, id));
        }

        if let Some(attributes) = resource.get("attributes") {
            self.member_names(attributes, &format!("{}/attributes", path), "attribute");
        }
        if let Some(relationships) = resource.get("relationships") {
            let rel_path = format!("{}/relationships", path);
            self.member_names(relationships, &rel_path, "relationship");
            if let Value::Object(members) = relationships {
                for (name, member) in members {
                    self.linkage(member, &format!("{}/{}", rel_path, name));
                }
            }
        }
    }

    fn member_names(&mut self, members: &Value, path: &str, kind: &str) {
        let Value::Object(map) = members else {
            self.error(
                "E006",
                path,
                format!("{}s must be an object, got {}", kind, json_type_name(members)),
            );
            return;
        };
        for name in map.keys() {
            if !is_valid_member_name(name) {
                self.error(
                    "E003",
                    &format!("{}/{}", path, name),
                    format!("invalid {} name \"{}\"", kind, name),
                );
            }
        }
    }

    fn linkage(&mut self, member: &Value, path: &str) {
        let data_path = format!("{}/data", path);
        let identifiers: Vec<(String, &Value)> = match member.get("data") {
            Some(Value::Object(_)) => vec![(data_path.clone(), &member["data"])],
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (format!("{}/{}", data_path, i), item))
                .collect(),
            _ => Vec::new(),
        };

        for (item_path, identifier) in identifiers {
            let has_id = identifier.get("id").map_or(false, Value::is_string);
            let has_type = identifier.get("type").map_or(false, Value::is_string);
            if !has_id || !has_type {
                self.error(
                    "E008",
                    &item_path,
                    "resource linkage must have string id and type".to_string(),
                );
            }
        }
    }

    fn version(&mut self, jsonapi: &Value) {
        match jsonapi.get("version") {
            Some(Value::String(v)) if JsonApiVersion::parse(v).is_some() => {}
            Some(Value::String(v)) => self.error(
                "E005",
                "/jsonapi/version",
                format!("unsupported jsonapi version \"{}\": expected 1.0 or 1.1", v),
            ),
            Some(other) => self.error(
                "E005",
                "/jsonapi/version",
                format!("jsonapi version must be a string, got {}", json_type_name(other)),
            ),
            None => {}
        }
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

//! Schema contracts: declarative shapes for stage inputs and outputs.
//!
//! A [`Contract`] is a static tree of named fields, each with a one-line
//! semantic hint. The same declaration is used twice:
//!
//! 1. [`describe`] renders it into the instruction so the model knows the
//!    exact shape to return;
//! 2. [`validate`] checks the model's raw JSON against it before anything is
//!    forwarded downstream.
//!
//! Validation is structural. A field that is present but empty (`""`, `[]`)
//! is accepted; a field that is absent or `null` is rejected. Extra fields
//! are governed by [`UnknownFieldPolicy`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A named structural description of a JSON object.
#[derive(Debug, Clone)]
pub struct Contract {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<Field>,
}

/// One field of a contract or record.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub hint: &'static str,
    pub kind: FieldKind,
}

/// The shape a field's value must have.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    StringList,
    RecordList(Vec<Field>),
    Record(Vec<Field>),
    Nested(&'static Contract),
}

impl Field {
    pub fn string(name: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            hint,
            kind: FieldKind::String,
        }
    }

    pub fn string_list(name: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            hint,
            kind: FieldKind::StringList,
        }
    }

    pub fn record_list(name: &'static str, hint: &'static str, fields: Vec<Field>) -> Self {
        Self {
            name,
            hint,
            kind: FieldKind::RecordList(fields),
        }
    }

    pub fn record(name: &'static str, hint: &'static str, fields: Vec<Field>) -> Self {
        Self {
            name,
            hint,
            kind: FieldKind::Record(fields),
        }
    }

    pub fn nested(name: &'static str, contract: &'static Contract) -> Self {
        Self {
            name,
            hint: contract.description,
            kind: FieldKind::Nested(contract),
        }
    }
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::StringList => "list of strings",
            FieldKind::RecordList(_) => "list of objects",
            FieldKind::Record(_) | FieldKind::Nested(_) => "object",
        }
    }
}

/// What to do with object keys the contract does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownFieldPolicy {
    /// Ignore extra keys (default). Providers routinely add harmless extras.
    #[default]
    Tolerate,
    /// Treat any undeclared key as a validation failure.
    Reject,
}

/// Why a value failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The response was not well-formed JSON.
    Malformed(String),
    /// A required field was absent or null.
    MissingField,
    /// A field had the wrong JSON type.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// An undeclared field appeared under [`UnknownFieldPolicy::Reject`].
    UnexpectedField,
    /// The value has the right shape but violates a stage-level rule.
    Constraint(String),
}

/// A contract violation, located by a dotted/indexed path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub path: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new("", ValidationErrorKind::Malformed(detail.into()))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() {
            "<root>"
        } else {
            self.path.as_str()
        };
        match &self.kind {
            ValidationErrorKind::Malformed(detail) => {
                write!(f, "response is not well-formed JSON: {detail}")
            }
            ValidationErrorKind::MissingField => write!(f, "missing required field '{at}'"),
            ValidationErrorKind::WrongType { expected, found } => {
                write!(f, "field '{at}' should be {expected}, found {found}")
            }
            ValidationErrorKind::UnexpectedField => write!(f, "unexpected field '{at}'"),
            ValidationErrorKind::Constraint(rule) => write!(f, "field '{at}': {rule}"),
        }
    }
}

// ── describe ─────────────────────────────────────────────────────────────

/// Render a contract as an instruction block for the model.
///
/// ```text
/// AnalysisResult: Structured extraction of a resume.
/// - skills (list of strings): A list of key skills extracted from the resume.
/// - experience (list of objects): Work experience entries, in resume order.
///   - jobTitle (string): The exact job title, e.g. "Software Engineer".
/// ```
pub fn describe(contract: &Contract) -> String {
    let mut out = format!("{}: {}\n", contract.name, contract.description);
    describe_fields(&contract.fields, 0, &mut out);
    out
}

fn describe_fields(fields: &[Field], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for field in fields {
        out.push_str(&format!(
            "{indent}- {} ({}): {}\n",
            field.name,
            field.kind.label(),
            field.hint
        ));
        match &field.kind {
            FieldKind::RecordList(children) | FieldKind::Record(children) => {
                describe_fields(children, depth + 1, out)
            }
            FieldKind::Nested(contract) => describe_fields(&contract.fields, depth + 1, out),
            FieldKind::String | FieldKind::StringList => {}
        }
    }
}

// ── validate ─────────────────────────────────────────────────────────────

/// Check `value` against `contract`, returning it unchanged on success.
pub fn validate(
    contract: &Contract,
    value: &Value,
    policy: UnknownFieldPolicy,
) -> Result<Value, ValidationError> {
    let object = value.as_object().ok_or_else(|| {
        ValidationError::new(
            "",
            ValidationErrorKind::WrongType {
                expected: "object",
                found: json_type(value),
            },
        )
    })?;
    validate_object(&contract.fields, object, "", policy)?;
    Ok(value.clone())
}

/// Validate, then deserialise into the typed record for this contract.
pub fn validate_as<T: DeserializeOwned>(
    contract: &Contract,
    value: &Value,
    policy: UnknownFieldPolicy,
) -> Result<T, ValidationError> {
    let checked = validate(contract, value, policy)?;
    serde_json::from_value(checked).map_err(|e| ValidationError::malformed(e.to_string()))
}

fn validate_object(
    fields: &[Field],
    object: &Map<String, Value>,
    path: &str,
    policy: UnknownFieldPolicy,
) -> Result<(), ValidationError> {
    for field in fields {
        let field_path = join_path(path, field.name);
        match object.get(field.name) {
            None | Some(Value::Null) => {
                return Err(ValidationError::new(
                    field_path,
                    ValidationErrorKind::MissingField,
                ))
            }
            Some(v) => validate_field(&field.kind, v, &field_path, policy)?,
        }
    }

    if policy == UnknownFieldPolicy::Reject {
        if let Some(extra) = object
            .keys()
            .find(|k| !fields.iter().any(|f| f.name == k.as_str()))
        {
            return Err(ValidationError::new(
                join_path(path, extra),
                ValidationErrorKind::UnexpectedField,
            ));
        }
    }

    Ok(())
}

fn validate_field(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    policy: UnknownFieldPolicy,
) -> Result<(), ValidationError> {
    match kind {
        FieldKind::String => expect_string(value, path),
        FieldKind::StringList => {
            let items = expect_array(value, path)?;
            for (i, item) in items.iter().enumerate() {
                expect_string(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        FieldKind::RecordList(children) => {
            let items = expect_array(value, path)?;
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                let object = expect_object(item, &item_path)?;
                validate_object(children, object, &item_path, policy)?;
            }
            Ok(())
        }
        FieldKind::Record(children) => {
            let object = expect_object(value, path)?;
            validate_object(children, object, path, policy)
        }
        FieldKind::Nested(contract) => {
            let object = expect_object(value, path)?;
            validate_object(&contract.fields, object, path, policy)
        }
    }
}

fn expect_string(value: &Value, path: &str) -> Result<(), ValidationError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(wrong_type(path, "a string", value))
    }
}

fn expect_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
    value
        .as_array()
        .ok_or_else(|| wrong_type(path, "a list", value))
}

fn expect_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object", value))
}

fn wrong_type(path: &str, expected: &'static str, value: &Value) -> ValidationError {
    ValidationError::new(
        path,
        ValidationErrorKind::WrongType {
            expected,
            found: json_type(value),
        },
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

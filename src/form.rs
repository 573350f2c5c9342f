use reqwest::Method;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::validators::{
    validate_bank_account, validate_email, validate_length, validate_password, validate_required,
    validate_routing_number, validate_routing_number_checksum, validate_tin, ValidationResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Tin,
    BankAccount,
    RoutingNumber,
    /// Routing number that must also pass the ABA check digit.
    RoutingNumberChecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEncoding {
    /// Flat JSON object of field name to value.
    Json,
    Multipart,
}

/// Where and how a bound form submits.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub action: String,
    pub method: Method,
    pub encoding: FormEncoding,
    pub fields: Vec<FieldDescriptor>,
}

impl FormDefinition {
    pub fn new(action: &str, method: Method, encoding: FormEncoding) -> Self {
        Self {
            action: action.to_string(),
            method,
            encoding,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Submitted values in entry order. Missing fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> &str {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> Value {
        let object = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(object)
    }
}

/// Per-field error messages in the order fields were first reported.
/// A field with no errors is never present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldReport {
    fields: Vec<(String, Vec<String>)>,
}

impl FieldReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|(n, _)| n == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field.to_string(), vec![message])),
        }
    }

    /// Replaces a field's messages; an empty list removes the field.
    pub fn set(&mut self, field: &str, messages: Vec<String>) {
        if messages.is_empty() {
            self.remove(field);
            return;
        }
        match self.fields.iter_mut().find(|(n, _)| n == field) {
            Some((_, existing)) => *existing = messages,
            None => self.fields.push((field.to_string(), messages)),
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.fields.retain(|(n, _)| n != field);
    }

    /// Appends `other`'s messages after any already held for the same field.
    pub fn merge(&mut self, other: FieldReport) {
        for (field, messages) in other.fields {
            for message in messages {
                self.add(&field, message);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, m)| m.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(n, m)| (n.as_str(), m.as_slice()))
    }
}

impl Serialize for FieldReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FormReport {
    pub is_valid: bool,
    pub errors: FieldReport,
    /// Errors that belong to the form as a whole rather than one field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form_errors: Vec<String>,
}

impl FormReport {
    pub fn add_form_error(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
        self.is_valid = false;
    }
}

impl From<FieldReport> for FormReport {
    fn from(errors: FieldReport) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            form_errors: Vec::new(),
        }
    }
}

/// Runs required, then the kind's rule, then length bounds. Type and length
/// rules only apply to non-empty values.
pub fn validate_field(field: &FieldDescriptor, raw: &str) -> Vec<String> {
    let value = raw.trim();
    let mut errors = Vec::new();

    if field.required {
        push_if_invalid(&mut errors, validate_required(value));
    }
    if value.is_empty() {
        return errors;
    }

    match field.kind {
        FieldKind::Text => {}
        FieldKind::Email => push_if_invalid(&mut errors, validate_email(value)),
        FieldKind::Password => {
            let strength = validate_password(value);
            if !strength.is_valid {
                errors.extend(strength.feedback);
            }
        }
        FieldKind::Tin => push_if_invalid(&mut errors, validate_tin(value)),
        FieldKind::BankAccount => push_if_invalid(&mut errors, validate_bank_account(value)),
        FieldKind::RoutingNumber => push_if_invalid(&mut errors, validate_routing_number(value)),
        FieldKind::RoutingNumberChecked => {
            push_if_invalid(&mut errors, validate_routing_number_checksum(value))
        }
    }

    if field.min.is_some() || field.max.is_some() {
        push_if_invalid(&mut errors, validate_length(value, field.min, field.max));
    }

    errors
}

fn push_if_invalid(errors: &mut Vec<String>, result: ValidationResult) {
    if !result.is_valid {
        errors.push(result.message);
    }
}

/// Validates every described field in order.
pub fn validate_form(fields: &[FieldDescriptor], data: &FormData) -> FormReport {
    let mut report = FieldReport::new();
    for field in fields {
        report.set(&field.name, validate_field(field, data.get(&field.name)));
    }
    report.into()
}

/// Extracts per-field errors from a server rejection.
///
/// Understands `{"errors": {field: [msg, ..] | msg}}`, the server's
/// `{"error": {"details": [{"field": "body -> email", "message": ..}]}}` list,
/// and `{"detail": [{"loc": [..], "msg": ..}]}`. For the list shapes the last
/// location segment names the field.
pub fn field_errors_from_payload(payload: &Value) -> FieldReport {
    let mut report = FieldReport::new();

    if let Some(errors) = payload.get("errors").and_then(Value::as_object) {
        for (field, messages) in errors {
            match messages {
                Value::String(message) => report.add(field, message.as_str()),
                Value::Array(items) => {
                    for message in items.iter().filter_map(Value::as_str) {
                        report.add(field, message);
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(details) = payload.pointer("/error/details").and_then(Value::as_array) {
        for detail in details {
            let field = detail
                .get("field")
                .and_then(Value::as_str)
                .and_then(|path| path.rsplit("->").next())
                .map(str::trim);
            let message = detail.get("message").and_then(Value::as_str);
            if let (Some(field), Some(message)) = (field, message) {
                report.add(field, message);
            }
        }
    }

    if let Some(details) = payload.get("detail").and_then(Value::as_array) {
        for detail in details {
            let field = detail
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .and_then(Value::as_str);
            let message = detail.get("msg").and_then(Value::as_str);
            if let (Some(field), Some(message)) = (field, message) {
                report.add(field, message);
            }
        }
    }

    report
}

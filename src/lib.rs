pub mod client;
pub mod config;
pub mod csrf;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod form;
pub mod formatters;
pub mod response;
pub mod validators;

pub use client::{RequestBody, RequestClient};
pub use config::ClientConfig;
pub use csrf::{CookieTokenSource, MetaTokenSource, TokenChain, TokenSource};
pub use debounce::Debouncer;
pub use engine::{ErrorDisplay, FormState, FormValidationEngine, LogDisplay, SubmitOutcome};
pub use errors::{ClientError, ErrorCategory, RequestFailure};
pub use form::{
    field_errors_from_payload, validate_field, validate_form, FieldDescriptor, FieldKind,
    FieldReport, FormData, FormDefinition, FormEncoding, FormReport,
};
pub use formatters::{format_routing_number, format_tin};
pub use response::{Download, RequestOutcome, ResponseBody, Success};
pub use validators::{
    validate_bank_account, validate_email, validate_length, validate_password, validate_required,
    validate_routing_number, validate_routing_number_checksum, validate_tin, PasswordStrength,
    ValidationResult,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;

use crate::client::{RequestBody, RequestClient};
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::errors::RequestFailure;
use crate::form::{
    field_errors_from_payload, validate_field, validate_form, FieldDescriptor, FormData,
    FormDefinition, FormEncoding, FormReport,
};
use crate::response::{ResponseBody, Success};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Validating,
    Valid,
    Invalid,
}

/// Where validation results and request failures are shown.
pub trait ErrorDisplay: Send + Sync {
    /// Replaces whatever is shown for `field`; an empty slice clears it.
    fn show_field_errors(&self, field: &str, errors: &[String]);
    /// Replaces the form-level errors; an empty slice clears them.
    fn show_form_errors(&self, errors: &[String]);
    fn notify(&self, message: &str);
    fn redirect(&self, location: &str);
}

/// Writes everything to the log.
pub struct LogDisplay;

impl ErrorDisplay for LogDisplay {
    fn show_field_errors(&self, field: &str, errors: &[String]) {
        if errors.is_empty() {
            log::debug!("{}: ok", field);
        } else {
            log::info!("{}: {}", field, errors.join("; "));
        }
    }

    fn show_form_errors(&self, errors: &[String]) {
        if !errors.is_empty() {
            log::info!("form: {}", errors.join("; "));
        }
    }

    fn notify(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn redirect(&self, location: &str) {
        log::info!("Redirecting to {}", location);
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted(Success),
    /// Rejected locally or by the server with field or form errors.
    Invalid(FormReport),
    Unauthorized {
        failure: RequestFailure,
        redirected: bool,
    },
    /// Any other failure; a single global notification was shown.
    Failed(RequestFailure),
}

/// Validation engine bound to one form.
pub struct FormValidationEngine {
    form: Arc<FormDefinition>,
    client: RequestClient,
    display: Arc<dyn ErrorDisplay>,
    state: RwLock<FormState>,
    debouncers: HashMap<String, Debouncer<String>>,
    login_path: String,
    redirect_on_auth: bool,
}

impl FormValidationEngine {
    pub fn new(
        form: FormDefinition,
        client: RequestClient,
        display: Arc<dyn ErrorDisplay>,
        config: &ClientConfig,
    ) -> Self {
        let form = Arc::new(form);
        let delay = config.debounce_delay();
        let debouncers = form
            .fields
            .iter()
            .map(|field| {
                let debouncer = field_debouncer(field.clone(), Arc::clone(&display), delay);
                (field.name.clone(), debouncer)
            })
            .collect();

        Self {
            form,
            client,
            display,
            state: RwLock::new(FormState::Idle),
            debouncers,
            login_path: config.login_path().to_string(),
            redirect_on_auth: true,
        }
    }

    /// Leaves auth failures to the caller instead of redirecting.
    pub fn suppress_auth_redirect(mut self) -> Self {
        self.redirect_on_auth = false;
        self
    }

    pub fn state(&self) -> FormState {
        *self.state.read()
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    /// Validates one field immediately and replaces its displayed errors.
    /// Fields the form does not describe have no rules.
    pub fn on_blur(&self, field: &str, value: &str) -> Vec<String> {
        let Some(descriptor) = self.form.descriptor(field) else {
            return Vec::new();
        };
        if let Some(debouncer) = self.debouncers.get(field) {
            debouncer.cancel();
        }
        let errors = validate_field(descriptor, value);
        self.display.show_field_errors(field, &errors);
        errors
    }

    /// Schedules a debounced validation of `field` with the latest value.
    /// Outside a tokio runtime nothing is scheduled.
    pub fn on_input(&self, field: &str, value: &str) {
        if let Some(debouncer) = self.debouncers.get(field) {
            debouncer.schedule(value.to_string());
        }
    }

    pub fn validate_form(&self, data: &FormData) -> FormReport {
        *self.state.write() = FormState::Validating;
        let report = validate_form(&self.form.fields, data);
        *self.state.write() = if report.is_valid {
            FormState::Valid
        } else {
            FormState::Invalid
        };
        report
    }

    /// Validates every field and, only if all pass, submits the form.
    pub async fn submit(&self, data: &FormData) -> SubmitOutcome {
        for debouncer in self.debouncers.values() {
            debouncer.cancel();
        }

        let report = self.validate_form(data);
        self.display_report(&report);
        if !report.is_valid {
            log::debug!(
                "Submission of {} blocked by {} invalid field(s)",
                self.form.action,
                report.errors.len()
            );
            return SubmitOutcome::Invalid(report);
        }

        let body = match self.form.encoding {
            FormEncoding::Json => RequestBody::Json(data.to_json()),
            FormEncoding::Multipart => RequestBody::Multipart(
                data.iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name.to_string(), value.to_string())),
            ),
        };

        match self
            .client
            .request(&self.form.action, self.form.method.clone(), HeaderMap::new(), body)
            .await
        {
            Ok(success) => SubmitOutcome::Submitted(success),
            Err(failure) => self.handle_failure(report, failure),
        }
    }

    fn handle_failure(&self, mut report: FormReport, failure: RequestFailure) -> SubmitOutcome {
        if failure.is_validation_error() {
            let server_errors = failure
                .payload
                .as_ref()
                .and_then(ResponseBody::as_json)
                .map(field_errors_from_payload)
                .unwrap_or_default();
            if server_errors.is_empty() {
                report.add_form_error(failure.message.as_str());
            } else {
                report.errors.merge(server_errors);
                report.is_valid = false;
            }
            log::debug!("{} rejected by server: {}", self.form.action, failure.message);
            *self.state.write() = FormState::Invalid;
            self.display_report(&report);
            return SubmitOutcome::Invalid(report);
        }

        if failure.is_auth_error() {
            if self.redirect_on_auth {
                log::info!("{} rejected with {}, sending to login", self.form.action, failure.status_code);
                self.display.redirect(&self.login_path);
            }
            return SubmitOutcome::Unauthorized {
                failure,
                redirected: self.redirect_on_auth,
            };
        }

        log::warn!("Submission of {} failed: {}", self.form.action, failure.message);
        self.display.notify(&failure.message);
        SubmitOutcome::Failed(failure)
    }

    fn display_report(&self, report: &FormReport) {
        self.display.show_form_errors(&report.form_errors);
        for field in &self.form.fields {
            let errors = report.errors.get(&field.name).unwrap_or(&[]);
            self.display.show_field_errors(&field.name, errors);
        }
        for (field, errors) in report.errors.iter() {
            if self.form.descriptor(field).is_none() {
                self.display.show_field_errors(field, errors);
            }
        }
    }
}

fn field_debouncer(
    field: FieldDescriptor,
    display: Arc<dyn ErrorDisplay>,
    delay: Duration,
) -> Debouncer<String> {
    Debouncer::new(delay, move |value: String| {
        let errors = validate_field(&field, &value);
        display.show_field_errors(&field.name, &errors);
    })
}

use finbot_client::*;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const VENDOR_REGISTER_ENDPOINT: &str = "/vendor/api/v1/vendors/register";

#[derive(Parser)]
#[command(name = "finbot-cli")]
#[command(about = "FinBot client: field validation and API requests")]
struct Cli {
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "config.json")]
    config: String,

    /// Overrides `base_url` from the config file
    #[arg(long)]
    base_url: Option<String>,

    /// CSRF token to send on mutating requests
    #[arg(long)]
    csrf_token: Option<String>,

    /// Existing session id, sent as the session cookie
    #[arg(long)]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Rule {
    Required,
    Email,
    Password,
    Tin,
    BankAccount,
    Routing,
    RoutingChecksum,
}

#[derive(Clone, Copy, ValueEnum)]
enum Identifier {
    Tin,
    Routing,
}

#[derive(Subcommand)]
enum Commands {
    Validate {
        rule: Rule,
        value: String,
    },
    Format {
        identifier: Identifier,
        value: String,
    },
    Get {
        endpoint: String,
    },
    Post {
        endpoint: String,
        /// JSON body
        #[arg(default_value = "{}")]
        data: String,
    },
    Put {
        endpoint: String,
        #[arg(default_value = "{}")]
        data: String,
    },
    Delete {
        endpoint: String,
    },
    Upload {
        endpoint: String,
        file: PathBuf,
        #[arg(long, default_value = "file")]
        field: String,
    },
    Download {
        endpoint: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validates and submits a vendor registration
    Register {
        /// name=value, repeatable
        #[arg(long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got {}", raw))
}

fn vendor_registration_form() -> FormDefinition {
    FormDefinition::new(VENDOR_REGISTER_ENDPOINT, Method::POST, FormEncoding::Json)
        .field(FieldDescriptor::new("company_name", FieldKind::Text).required().max(255))
        .field(FieldDescriptor::new("vendor_category", FieldKind::Text).required())
        .field(FieldDescriptor::new("industry", FieldKind::Text).required())
        .field(FieldDescriptor::new("services", FieldKind::Text).required())
        .field(FieldDescriptor::new("name", FieldKind::Text).required().min(2))
        .field(FieldDescriptor::new("email", FieldKind::Email).required())
        .field(FieldDescriptor::new("phone", FieldKind::Text).max(32))
        .field(FieldDescriptor::new("tin", FieldKind::Tin).required())
        .field(FieldDescriptor::new("bank_account_number", FieldKind::BankAccount).required())
        .field(FieldDescriptor::new("bank_name", FieldKind::Text).required())
        .field(FieldDescriptor::new("bank_routing_number", FieldKind::RoutingNumber).required())
        .field(FieldDescriptor::new("bank_account_holder_name", FieldKind::Text).required())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(&cli.config).unwrap_or_default();
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }

    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .init();

    match cli.command {
        Commands::Validate { rule, value } => {
            let value = value.trim();
            let output = match rule {
                Rule::Required => result_json(validate_required(value)),
                Rule::Email => result_json(validate_email(value)),
                Rule::Password => password_json(value),
                Rule::Tin => result_json(validate_tin(value)),
                Rule::BankAccount => result_json(validate_bank_account(value)),
                Rule::Routing => result_json(validate_routing_number(value)),
                Rule::RoutingChecksum => result_json(validate_routing_number_checksum(value)),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if output["is_valid"].as_bool() == Some(true) {
                println!("valid");
            } else {
                println!("invalid");
                if let Some(message) = output["message"].as_str() {
                    println!("  {}", message);
                }
                for line in output["feedback"].as_array().into_iter().flatten() {
                    println!("  {}", line.as_str().unwrap_or_default());
                }
            }
        }
        Commands::Format { identifier, value } => {
            let formatted = match identifier {
                Identifier::Tin => format_tin(&value),
                Identifier::Routing => format_routing_number(&value),
            };
            if cli.json {
                println!("{}", json!({"input": value, "formatted": formatted}));
            } else {
                println!("{}", formatted);
            }
        }
        Commands::Get { endpoint } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            print_outcome(client.get(&endpoint).await, cli.json)?;
        }
        Commands::Post { endpoint, data } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            let body: Value = serde_json::from_str(&data).context("body is not valid JSON")?;
            print_outcome(client.post(&endpoint, &body).await, cli.json)?;
        }
        Commands::Put { endpoint, data } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            let body: Value = serde_json::from_str(&data).context("body is not valid JSON")?;
            print_outcome(client.put(&endpoint, &body).await, cli.json)?;
        }
        Commands::Delete { endpoint } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            print_outcome(client.delete(&endpoint).await, cli.json)?;
        }
        Commands::Upload { endpoint, file, field } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let form = Form::new().part(field, Part::bytes(bytes).file_name(file_name));
            print_outcome(client.upload(&endpoint, form).await, cli.json)?;
        }
        Commands::Download { endpoint, output } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            let download = client.download(&endpoint).await.map_err(|failure| {
                anyhow!("{} ({:?}, status {})", failure.message, failure.category(), failure.status_code)
            })?;
            let path = output
                .or_else(|| {
                    download
                        .filename
                        .as_deref()
                        .and_then(|name| Path::new(name).file_name())
                        .map(PathBuf::from)
                })
                .unwrap_or_else(|| PathBuf::from("download.bin"));
            tokio::fs::write(&path, &download.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;

            if cli.json {
                println!(
                    "{}",
                    json!({"path": path.display().to_string(), "bytes": download.bytes.len()})
                );
            } else {
                println!("Saved {} bytes to {}", download.bytes.len(), path.display());
            }
        }
        Commands::Register { fields, dry_run } => {
            let client = build_client(&config, &cli.csrf_token, &cli.session)?;
            let data = fields
                .iter()
                .fold(FormData::new(), |data, (name, value)| data.with(name, value));
            let engine = FormValidationEngine::new(
                vendor_registration_form(),
                client,
                Arc::new(LogDisplay),
                &config,
            )
            .suppress_auth_redirect();

            if dry_run {
                let report = engine.validate_form(&data);
                print_report(&report, cli.json)?;
                if !report.is_valid {
                    return Err(anyhow!("registration has invalid fields"));
                }
                return Ok(());
            }

            match engine.submit(&data).await {
                SubmitOutcome::Submitted(success) => print_outcome(Ok(success), cli.json)?,
                SubmitOutcome::Invalid(report) => {
                    print_report(&report, cli.json)?;
                    return Err(anyhow!("registration has invalid fields"));
                }
                SubmitOutcome::Unauthorized { failure, .. } => {
                    return Err(anyhow!(
                        "not signed in ({}): open {} in a browser first",
                        failure.message,
                        config.login_path()
                    ));
                }
                SubmitOutcome::Failed(failure) => print_outcome(Err(failure), cli.json)?,
            }
        }
    }

    Ok(())
}

fn build_client(
    config: &ClientConfig,
    csrf_token: &Option<String>,
    session: &Option<String>,
) -> Result<RequestClient> {
    let client = RequestClient::new(config)?;
    if let Some(token) = csrf_token {
        client.meta_token().set(token.clone());
    }
    if let Some(session) = session {
        client.set_session(session);
    }
    Ok(client)
}

fn result_json(result: ValidationResult) -> Value {
    json!({"is_valid": result.is_valid, "message": result.message})
}

fn password_json(value: &str) -> Value {
    let strength = validate_password(value);
    json!({
        "is_valid": strength.is_valid,
        "score": strength.score,
        "feedback": strength.feedback,
    })
}

fn print_report(report: &FormReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if report.is_valid {
        println!("All fields valid");
    }
    for error in &report.form_errors {
        println!("{}", error);
    }
    for (field, errors) in report.errors.iter() {
        for error in errors {
            println!("{}: {}", field, error);
        }
    }
    Ok(())
}

fn print_outcome(outcome: RequestOutcome, as_json: bool) -> Result<()> {
    match outcome {
        Ok(success) => {
            let body = match &success.data {
                ResponseBody::Json(value) => serde_json::to_string_pretty(value)?,
                ResponseBody::Text(text) => text.clone(),
                ResponseBody::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            };
            if as_json {
                println!("{}", json!({"status": success.status_code, "body": body_value(&success.data)}));
            } else {
                println!("HTTP {}", success.status_code);
                println!("{}", body);
            }
            Ok(())
        }
        Err(failure) => {
            if as_json {
                println!(
                    "{}",
                    json!({
                        "status": failure.status_code,
                        "category": format!("{:?}", failure.category()),
                        "message": failure.message,
                        "payload": failure.payload.as_ref().map(body_value),
                    })
                );
            }
            Err(anyhow!(
                "{} ({:?}, status {})",
                failure.message,
                failure.category(),
                failure.status_code
            ))
        }
    }
}

fn body_value(body: &ResponseBody) -> Value {
    match body {
        ResponseBody::Json(value) => value.clone(),
        ResponseBody::Text(text) => Value::String(text.clone()),
        ResponseBody::Bytes(bytes) => json!({"bytes": bytes.len()}),
    }
}

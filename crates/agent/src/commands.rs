use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use adapters::threatintel::otx_http_provider::OtxHttpProvider;
use anyhow::{Context, Result};
use application::otx_lookup_function::{DOMAIN_PARAM, OtxDomainLookupFunction};
use domain::pipeline::context::EvaluationContext;
use domain::pipeline::expression::Expression;
use domain::pipeline::function::FunctionArgs;
use domain::threatintel::entity::{FIELD_THREAT_IDS, FIELD_THREAT_NAMES, LookupOutcome};
use domain::threatintel::lookup::normalize_domain;
use infrastructure::config::{AppConfig, ConfigError};
use infrastructure::constants::OTX_API_KEY_ENV;
use infrastructure::logging::init_logging;
use infrastructure::metrics::LookupRegistry;
use ports::primary::pipeline_function::{PipelineFunction, precompute_constants};
use ports::secondary::metrics_port::MetricsPort;
use tracing::{info, warn};

use crate::cli::{Cli, OutputFormat};

// ── Setup ───────────────────────────────────────────────────────────────

/// Load the config file. A missing file falls back to defaults, so a
/// key from the environment alone is enough for ad-hoc lookups.
fn load_config(path: &str) -> Result<(AppConfig, bool)> {
    match AppConfig::load(Path::new(path)) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            let mut config = AppConfig::default();
            config.apply_api_key_override(std::env::var(OTX_API_KEY_ENV).ok());
            Ok((config, true))
        }
        Err(e) => Err(e).with_context(|| format!("failed to load config from {path}")),
    }
}

// ── Lookup ──────────────────────────────────────────────────────────────

pub async fn cmd_lookup(cli: &Cli, domains: &[String], show_metrics: bool) -> Result<()> {
    let (config, defaulted) = load_config(&cli.config)?;

    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.agent.log_level);
    let log_format = cli.log_format.unwrap_or(config.agent.log_format);
    init_logging(log_level, log_format)?;

    if defaulted {
        warn!(config_path = %cli.config, "config file not found, using defaults");
    }
    info!(
        config = ?config.sanitized().threatintel.otx,
        domain_count = domains.len(),
        "starting OTX lookups"
    );

    let registry = Arc::new(LookupRegistry::new());
    let metrics: Arc<dyn MetricsPort> = Arc::clone(&registry) as Arc<dyn MetricsPort>;
    let provider = Arc::new(OtxHttpProvider::new()?);
    let function = Arc::new(OtxDomainLookupFunction::new(
        provider,
        &config.otx_settings(),
        metrics,
    ));

    let mut handles = Vec::with_capacity(domains.len());
    for domain in domains {
        let function = Arc::clone(&function);
        let domain = domain.clone();
        handles.push(tokio::spawn(async move {
            let mut args = FunctionArgs::new()
                .with_arg(DOMAIN_PARAM, Expression::constant(domain.as_str()));
            precompute_constants(function.as_ref(), &mut args);
            let ctx = EvaluationContext::empty();
            let outcome = function.evaluate(&args, &ctx).await;
            (domain, outcome)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("lookup task panicked")?);
    }

    print_outcomes(&results, cli.output)?;

    if show_metrics {
        eprint!("{}", registry.encode());
    }
    Ok(())
}

fn print_outcomes(results: &[(String, LookupOutcome)], output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|(domain, outcome)| {
                serde_json::json!({
                    "domain": domain,
                    "normalized": normalize_domain(domain),
                    "lookup": outcome,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<40}  {:<14}  {:<9}  {}",
        "DOMAIN", "OUTCOME", "INDICATED", "PULSES"
    );
    for (domain, outcome) in results {
        let (indicated, pulses) = match outcome {
            LookupOutcome::Found(result) => (
                yes_no(result.is_threat_indicated()),
                result
                    .get(FIELD_THREAT_NAMES)
                    .or_else(|| result.get(FIELD_THREAT_IDS))
                    .map(ToString::to_string)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            LookupOutcome::Empty => ("no", "-".to_string()),
            LookupOutcome::Absent(_) => ("-", "-".to_string()),
        };
        println!(
            "{:<40}  {:<14}  {:<9}  {}",
            normalize_domain(domain),
            outcome.label(),
            indicated,
            pulses
        );
    }
    Ok(())
}

// ── Normalize ───────────────────────────────────────────────────────────

pub fn cmd_normalize(domain: &str, output: OutputFormat) -> Result<()> {
    let normalized = normalize_domain(domain);
    if output == OutputFormat::Json {
        let body = serde_json::json!({ "input": domain, "normalized": normalized });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    println!("{normalized}");
    Ok(())
}

// ── Describe ────────────────────────────────────────────────────────────

pub fn cmd_describe(output: OutputFormat) -> Result<()> {
    let descriptor = OtxDomainLookupFunction::function_descriptor();

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    println!("Function:    {}", descriptor.name);
    println!("Returns:     {}", descriptor.return_type);
    println!("Description: {}", descriptor.description);
    println!("Parameters:");
    for param in &descriptor.params {
        let required = if param.optional { "optional" } else { "required" };
        println!("  {:<12} {:<8}  {}", param.name, required, param.description);
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

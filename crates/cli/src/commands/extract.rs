use std::sync::Arc;

use quotedesk_agent::extract::{FieldExtractor, RuleExtractor};
use quotedesk_agent::runtime::{extract_first, extractors_from_config};
use quotedesk_core::config::{AppConfig, LoadOptions};
use quotedesk_core::domain::fields::CandidateFields;
use quotedesk_core::domain::quotation::Quotation;
use quotedesk_core::errors::PipelineFailure;
use quotedesk_core::normalize::Normalizer;
use serde::Serialize;

use super::{block_on, CommandResult, EXIT_CONFIG, EXIT_EXTRACTION};

#[derive(Debug, Serialize)]
struct ExtractOutput {
    command: &'static str,
    status: &'static str,
    extractor: Option<String>,
    fields: Option<CandidateFields>,
    quotation: Option<Quotation>,
    error_class: Option<&'static str>,
    message: String,
}

pub fn run(text: &str, rules_only: bool) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => run_with_config(&config, text, rules_only),
        Err(error) => {
            CommandResult::failure("extract", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    }
}

pub fn run_with_config(config: &AppConfig, text: &str, rules_only: bool) -> CommandResult {
    let extractors: Vec<Arc<dyn FieldExtractor>> = if rules_only {
        vec![Arc::new(RuleExtractor::new())]
    } else {
        match extractors_from_config(config) {
            Ok(extractors) => extractors,
            Err(error) => {
                return CommandResult::failure(
                    "extract",
                    "llm_setup",
                    format!("{error:#}"),
                    EXIT_CONFIG,
                )
            }
        }
    };

    let extracted = match block_on("extract", extract_first(&extractors, text)) {
        Ok(extracted) => extracted,
        Err(result) => return result,
    };

    let output = match extracted {
        Err(failure) => ExtractOutput {
            command: "extract",
            status: "error",
            extractor: None,
            fields: None,
            quotation: None,
            error_class: Some("extraction"),
            message: PipelineFailure::from(failure).to_string(),
        },
        Ok((extractor, fields)) => {
            match Normalizer::new(config.normalizer_settings()).normalize(&fields) {
                Ok(quotation) => ExtractOutput {
                    command: "extract",
                    status: "ok",
                    message: format!("quotation total {}", quotation.total_display()),
                    extractor: Some(extractor),
                    fields: Some(fields),
                    quotation: Some(quotation),
                    error_class: None,
                },
                Err(failure) => ExtractOutput {
                    command: "extract",
                    status: "error",
                    extractor: Some(extractor),
                    fields: Some(fields),
                    quotation: None,
                    error_class: Some("validation"),
                    message: failure.to_string(),
                },
            }
        }
    };

    let exit_code = if output.status == "ok" { 0 } else { EXIT_EXTRACTION };
    CommandResult::json(exit_code, &output)
}

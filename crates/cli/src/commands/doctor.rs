use quotedesk_agent::llm;
use quotedesk_core::config::{AppConfig, LoadOptions};
use quotedesk_core::domain::fields::CandidateFields;
use quotedesk_core::normalize::Normalizer;
use quotedesk_core::render::pdf::PdfConverter;
use quotedesk_core::render::{DocumentFormat, DocumentRenderer};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()));
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        return CommandResult::json(exit_code, &report);
    }
    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(
    config: Result<AppConfig, quotedesk_core::config::ConfigError>,
) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_template(&config));
            checks.push(check_pdf_converter(&config));
            checks.push(check_llm(&config));
            checks.push(check_transports(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["template_render", "pdf_converter", "llm_client", "delivery_transports"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_template(config: &AppConfig) -> DoctorCheck {
    let sample = CandidateFields {
        customer_name: "Doctor".to_string(),
        product: "Readiness check".to_string(),
        quantity: "1".to_string(),
        rate: "1".to_string(),
        email: "doctor@example.com".to_string(),
        ..CandidateFields::default()
    };
    let mut settings = config.renderer_settings();
    settings.format = DocumentFormat::Html;

    let rendered = Normalizer::new(config.normalizer_settings())
        .normalize(&sample)
        .map_err(|error| error.to_string())
        .and_then(|quotation| {
            DocumentRenderer::new(settings)
                .render_html(&quotation)
                .map_err(|error| error.to_string())
        });

    match rendered {
        Ok(html) => DoctorCheck {
            name: "template_render",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` renders ({} bytes)",
                config.render.template_path.display(),
                html.len()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "template_render", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_pdf_converter(config: &AppConfig) -> DoctorCheck {
    if config.render.format != DocumentFormat::Pdf {
        return DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Skipped,
            details: "render.format is html".to_string(),
        };
    }

    match PdfConverter::locate() {
        Some(converter) => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Pass,
            details: format!("using {}", converter.binary().display()),
        },
        None => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Warn,
            details: "wkhtmltopdf not found on PATH; documents will be sent as HTML".to_string(),
        },
    }
}

fn check_llm(config: &AppConfig) -> DoctorCheck {
    match llm::from_config(&config.llm) {
        Ok(Some(client)) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Pass,
            details: format!(
                "{} ({}) model `{}`, rule extractor as fallback",
                config.llm.provider.as_str(),
                client.name(),
                config.llm.model
            ),
        },
        Ok(None) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Skipped,
            details: "llm disabled; rule extractor only".to_string(),
        },
        Err(error) => {
            DoctorCheck { name: "llm_client", status: CheckStatus::Fail, details: format!("{error:#}") }
        }
    }
}

fn check_transports(config: &AppConfig) -> DoctorCheck {
    match quotedesk_mail::transports_from_config(config) {
        Ok(transports) => DoctorCheck {
            name: "delivery_transports",
            status: CheckStatus::Pass,
            details: format!(
                "priority order: {}",
                transports.iter().map(|transport| transport.name()).collect::<Vec<_>>().join(", ")
            ),
        },
        Err(error) => DoctorCheck {
            name: "delivery_transports",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

//! PageFetch CLI - fetch a page and report its metadata

use clap::{Parser, Subcommand, ValueEnum};
use pagefetch::{OptionOverrides, PlainText, Resource, ResourceFactory};
use serde::Serialize;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Plain text with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// PageFetch - bounded web fetching with charset and language detection
#[derive(Parser, Debug)]
#[command(name = "pagefetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print the JSON schema of accepted options
    #[arg(long)]
    options_schema: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch URL and print its metadata and text
    Fetch {
        /// URL to fetch; `http://` is assumed when no scheme is given
        url: String,

        /// Option overrides as a JSON object, e.g. '{"redir_retry": 3}'
        #[arg(long)]
        options: Option<String>,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
}

/// What `pagefetch fetch` prints
#[derive(Debug, Default, Serialize)]
struct Report {
    url: String,
    final_url: String,
    status: u16,
    content_type: String,
    charset: String,
    language: String,
    size: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
    text: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.options_schema {
        match serde_json::to_string_pretty(&OptionOverrides::json_schema()) {
            Ok(schema) => writeln_safe(&schema),
            Err(e) => fail(&format!("Error serializing schema: {}", e)),
        }
        std::process::exit(0);
    }

    match cli.command {
        Some(Commands::Fetch {
            url,
            options,
            output,
        }) => {
            run_fetch(&url, options.as_deref(), output).await;
        }
        None => {
            eprintln!("Usage: pagefetch fetch <URL> [--options JSON]");
            eprintln!("   or: pagefetch --options-schema");
            eprintln!("   or: pagefetch --help");
            std::process::exit(1);
        }
    }
}

async fn run_fetch(url: &str, options: Option<&str>, output: OutputFormat) {
    let mut factory = ResourceFactory::new();
    if let Some(raw) = options {
        let overrides: serde_json::Value = serde_json::from_str(raw)
            .unwrap_or_else(|e| fail(&format!("Error parsing --options: {}", e)));
        if let Err(e) = factory.configure_json(&overrides) {
            fail(&format!("Error: {}", e));
        }
    }

    let mut resource = factory
        .resource(url)
        .unwrap_or_else(|e| fail(&format!("Error: {}", e)));

    let report = build_report(&mut resource)
        .await
        .unwrap_or_else(|e| fail(&format!("Error: {}", e)));

    match output {
        OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| fail(&format!("Error serializing report: {}", e)));
            writeln_safe(&json);
        }
    }
}

async fn build_report(resource: &mut Resource) -> Result<Report, pagefetch::FetchError> {
    let url = resource.url().to_string();
    let fetched = resource.fetch().await?;
    let final_url = fetched.final_url.to_string();
    let status = fetched.status;
    let size = fetched.body.len();
    let truncated = fetched.truncated;

    Ok(Report {
        url,
        final_url,
        status,
        size,
        truncated,
        content_type: resource.content_type().await?.to_string(),
        charset: resource.charset().await?.to_string(),
        language: resource.language().await?,
        text: resource.clean_text(&PlainText).await?,
    })
}

/// Format report as text with YAML frontmatter
fn format_md_with_frontmatter(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", report.url));
    if report.final_url != report.url {
        output.push_str(&format!("final_url: {}\n", report.final_url));
    }
    output.push_str(&format!("status_code: {}\n", report.status));
    output.push_str(&format!("content_type: {}\n", report.content_type));
    output.push_str(&format!("charset: {}\n", report.charset));
    output.push_str(&format!("language: {}\n", report.language));
    output.push_str(&format!("size: {}\n", report.size));
    if report.truncated {
        output.push_str("truncated: true\n");
    }
    output.push_str("---\n");
    output.push_str(&report.text);

    output
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

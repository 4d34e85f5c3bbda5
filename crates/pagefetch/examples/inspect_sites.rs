//! Example: Inspect a few sites and display detected metadata
//!
//! Run with: cargo run -p pagefetch --example inspect_sites
//!
//! Set `RUST_LOG=pagefetch=debug` to watch redirects and retries.

use pagefetch::{FetchError, PlainText, Resource, ResourceFactory};
use tracing_subscriber::EnvFilter;

/// Site definition
struct Site {
    url: &'static str,
    description: &'static str,
    expect_language: Option<&'static str>,
}

/// Define sites here
const SITES: &[Site] = &[
    Site {
        url: "example.com",
        description: "Plain English page, scheme omitted",
        expect_language: Some("en"),
    },
    Site {
        url: "https://www.wikipedia.pl",
        description: "Polish page behind redirects",
        expect_language: Some("pl"),
    },
    Site {
        url: "https://de.wikipedia.org",
        description: "German page declared in markup",
        expect_language: Some("de"),
    },
    Site {
        url: "https://httpbin.org/json",
        description: "Non-text response falls back to defaults",
        expect_language: None,
    },
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("PageFetch Sites");
    println!("================\n");

    let mut factory = ResourceFactory::new();
    if let Err(e) = factory.configure_json(&serde_json::json!({
        "redir_retry": 5,
        "max_length": 256 * 1024,
        "ignore_content_overflows": true,
    })) {
        eprintln!("Bad options: {}", e);
        std::process::exit(1);
    }

    let mut passed = 0;
    let mut failed = 0;

    for (i, site) in SITES.iter().enumerate() {
        println!("{}. {}", i + 1, site.description);
        println!("   URL: {}", site.url);

        let outcome = match factory.resource(site.url) {
            Ok(mut resource) => print_summary(&mut resource).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(language) => match site.expect_language {
                Some(expected) if language != expected => {
                    println!("   Expected language '{}', got '{}'", expected, language);
                    println!("   ✗ FAIL\n");
                    failed += 1;
                }
                _ => {
                    println!("   ✓ PASS\n");
                    passed += 1;
                }
            },
            Err(e) => {
                println!("   Error ({:?}): {}", e.kind(), e);
                println!("   ✗ FAIL\n");
                failed += 1;
            }
        }
    }

    println!("================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

/// Print what was detected and return the language
async fn print_summary(resource: &mut Resource) -> Result<String, FetchError> {
    let fetched = resource.fetch().await?;
    println!("   Final URL: {}", fetched.final_url);
    println!("   Status: {}", fetched.status);
    println!(
        "   Size: {} bytes{}",
        fetched.body.len(),
        if fetched.truncated { " (truncated)" } else { "" }
    );

    println!("   Content-Type: {}", resource.content_type().await?);
    println!("   Charset: {}", resource.charset().await?);
    let language = resource.language().await?;
    println!("   Language: {}", language);

    let text = resource.clean_text(&PlainText).await?;
    let preview = text.chars().take(100).collect::<String>().replace('\n', " ");
    println!(
        "   Preview: {}{}",
        preview,
        if text.chars().count() > 100 { "..." } else { "" }
    );

    Ok(language)
}

//! scrapekit command line: fetch and select, normalize URIs, rebuild queries

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scrapekit::{
    config::{Config, LogFormat},
    HtmlDocument, Node, NodeSelector, QueryBuilder, ScrapeClient,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scrapekit")]
#[command(about = "Fetch and query web pages, normalize URIs and rebuild query strings")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (text or json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an HTML page and print selected content
    Fetch {
        /// Page URL
        url: String,

        /// CSS selector
        #[arg(long, conflicts_with = "xpath")]
        css: Option<String>,

        /// XPath expression
        #[arg(long)]
        xpath: Option<String>,

        /// Print every match instead of the first
        #[arg(long)]
        all: bool,

        /// Print this attribute of each match
        #[arg(long, conflicts_with = "html")]
        attr: Option<String>,

        /// Print the outer HTML of each match
        #[arg(long)]
        html: bool,
    },

    /// Print the canonical form of each URI
    Normalize {
        #[arg(required = true)]
        uris: Vec<String>,
    },

    /// Rebuild a URI with modified query parameters
    Query {
        uri: String,

        /// Replace a parameter (repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Append a parameter value (repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        add: Vec<String>,

        /// Remove a parameter (repeatable)
        #[arg(long, value_name = "KEY")]
        remove: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.logging.level = config.logging.level.more_verbose(cli.verbose);
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    scrapekit::logging::init(&config.logging)?;

    match cli.command {
        Commands::Fetch {
            url,
            css,
            xpath,
            all,
            attr,
            html,
        } => {
            let selector = match (css, xpath) {
                (Some(css), _) => Some(NodeSelector::css(&css)?),
                (None, Some(xpath)) => Some(NodeSelector::xpath(&xpath)?),
                (None, None) => None,
            };
            fetch(&config, &url, selector, all, attr, html).await
        }
        Commands::Normalize { uris } => normalize(&uris),
        Commands::Query {
            uri,
            set,
            add,
            remove,
        } => rebuild_query(&uri, &set, &add, &remove),
    }
}

async fn fetch(
    config: &Config,
    url: &str,
    selector: Option<NodeSelector>,
    all: bool,
    attr: Option<String>,
    html: bool,
) -> Result<()> {
    let client = ScrapeClient::new(&config.client)?;
    let doc: HtmlDocument = client
        .get(url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let Some(selector) = selector else {
        println!("{}", doc.title().unwrap_or_default());
        return Ok(());
    };

    let root = doc.root();
    let nodes: Vec<Node<'_>> = if all {
        root.select_all(&selector).into_vec()
    } else {
        vec![root.select_or_fail(&selector)?]
    };

    for node in nodes {
        let line = match &attr {
            Some(name) => node.attr_or(name, ""),
            None if html => node.html(),
            None => node.text(),
        };
        println!("{}", line);
    }
    Ok(())
}

fn normalize(uris: &[String]) -> Result<()> {
    for uri in uris {
        let canonical = scrapekit::normalize_str(uri)
            .with_context(|| format!("Cannot normalize '{}'", uri))?;
        println!("{}", canonical);
    }
    Ok(())
}

fn rebuild_query(uri: &str, set: &[String], add: &[String], remove: &[String]) -> Result<()> {
    let mut builder = QueryBuilder::new(uri)?;
    for pair in set {
        let (name, value) = split_pair(pair);
        builder.set(name, value);
    }
    for pair in add {
        let (name, value) = split_pair(pair);
        builder.add(name, value);
    }
    for name in remove {
        builder.remove(name);
    }
    println!("{}", builder);
    Ok(())
}

/// `key=value`, or a bare key with an empty value
fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once('=').unwrap_or((pair, ""))
}

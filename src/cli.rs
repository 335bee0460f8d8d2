use std::cmp;
use std::error::Error;

use atty::Stream;
use clap::{Parser, Subcommand};
use protogloss_rs::{
    Annotation, DataSource, Dictionary, LoadError, Lookup, LookupView, Status, TokenTable,
    sanitize_gloss,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA: &str = "data/vocabulary.json";

#[derive(Parser, Debug)]
#[command(
    name = "protogloss",
    about = "Incremental lookup over a Proto-Turkic lexicon",
    version
)]
pub struct Cli {
    /// Dataset file (`.json` or `.json.zst`) or, with the `remote` feature, an HTTP(S) URL.
    #[arg(long, global = true, env = "PROTOGLOSS_DATA", default_value = DEFAULT_DATA)]
    data: String,

    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a partial headword the way the search box does.
    Lookup {
        /// Typed text; leading whitespace is rejected.
        query: String,
    },
    /// List headwords starting with the provided prefix.
    Prefix {
        /// Prefix to search for (normalized before matching).
        prefix: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Sanitize and annotate arbitrary gloss text.
    Annotate {
        /// Gloss text, restricted HTML allowed.
        text: String,
    },
    /// Print the entry count, or the failure message when loading fails.
    Status,
    /// Serve the lookup page and JSON API.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used in links.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.command);
    let source = DataSource::parse(&cli.data);
    match cli.command {
        Command::Lookup { query } => handle_lookup(&source, &query, cli.json),
        Command::Prefix { prefix, limit } => handle_prefix(&source, &prefix, limit, cli.json),
        Command::Annotate { text } => handle_annotate(&text, cli.json),
        Command::Status => handle_status(&source, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { addr, base_url } => handle_serve(source, addr, base_url),
    }
}

fn init_tracing(command: &Command) {
    let default_level = match command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load(source: &DataSource) -> Result<Dictionary, LoadError> {
    #[cfg(feature = "remote")]
    if let DataSource::Url(url) = source {
        return tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(Dictionary::fetch(url));
    }
    Dictionary::load(source)
}

fn handle_lookup(source: &DataSource, query: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let mut lookup = Lookup::new(load(source));
    let view = lookup
        .input(query)
        .ok_or("first query on a fresh session cannot be unchanged")?;

    if as_json {
        let payload = json!({
            "query": query,
            "status": lookup.status().to_string(),
            "headword": view.headword,
            "ghost": view.ghost,
            "error": view.error,
            "disabled": view.disabled,
            "gloss_html": view.gloss_html,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if lookup.load_error().is_none() {
        print_view(query, &view, &lookup);
    }
    load_result(&lookup)
}

fn handle_prefix(
    source: &DataSource,
    prefix: &str,
    limit: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let dictionary = load(source)?;
    let normalized = protogloss_rs::normalize(prefix);
    let matches = dictionary.prefix(&normalized, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": matches.iter().map(|entry| entry.headword()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if matches.is_empty() {
        println!("No headwords matched prefix \"{prefix}\".");
    } else {
        println!("Matches for prefix \"{prefix}\":");
        for entry in matches {
            println!("  {}", entry.headword());
        }
    }
    Ok(())
}

fn handle_annotate(text: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let tokens = TokenTable::default();
    let html = protogloss_rs::render_gloss(text, &tokens);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "html": html }))?);
    } else if stdout_is_tty() {
        render_markdown_block("Gloss", &gloss_markdown(text, &tokens));
    } else {
        println!("{html}");
    }
    Ok(())
}

fn handle_status(source: &DataSource, as_json: bool) -> Result<(), Box<dyn Error>> {
    let lookup = Lookup::new(load(source));
    let status = lookup.status();
    if as_json {
        let entries = match status {
            Status::Ready { entries } => Some(entries),
            Status::Unavailable => None,
        };
        let payload = json!({
            "source": source.to_string(),
            "entries": entries,
            "message": status.to_string(),
            "error": lookup.load_error().map(|err| err.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{status}");
    }
    load_result(&lookup)
}

/// Turns a failed load into the command's error, so every output mode
/// exits non-zero.
fn load_result(lookup: &Lookup) -> Result<(), Box<dyn Error>> {
    match lookup.load_error() {
        Some(err) => Err(format!("{} ({err})", Status::Unavailable).into()),
        None => Ok(()),
    }
}

#[cfg(feature = "web")]
fn handle_serve(
    source: DataSource,
    addr: std::net::SocketAddr,
    base_url: String,
) -> Result<(), Box<dyn Error>> {
    let dictionary = load(&source);
    let config = protogloss_rs::web::WebConfig { addr, base_url };
    tokio::runtime::Runtime::new()?.block_on(protogloss_rs::web::serve(config, dictionary))?;
    Ok(())
}

fn print_view(query: &str, view: &LookupView, lookup: &Lookup) {
    match (&view.headword, view.error) {
        (Some(headword), _) => {
            println!("Headword: {headword}");
            println!("Typed:    {query}");
            if !view.ghost.is_empty() {
                println!("Ghost:    {}", view.ghost);
            }
        }
        (None, true) => println!("No headword starts with \"{query}\"."),
        (None, false) => println!("Nothing to search."),
    }
    let Some(html) = &view.gloss_html else {
        return;
    };
    let description = view
        .headword
        .as_deref()
        .and_then(|headword| lookup.dictionary()?.get(headword))
        .map(|entry| entry.description());
    match description {
        Some(description) if stdout_is_tty() => {
            render_markdown_block("Gloss", &gloss_markdown(description, lookup.tokens()));
        }
        _ => println!("\n{html}"),
    }
}

/// Markdown rendering of a gloss for the terminal: labels in bold,
/// referenced words in italics.
fn gloss_markdown(text: &str, tokens: &TokenTable) -> String {
    let clean = sanitize_gloss(text);
    let mut out = String::new();
    for part in tokens.annotate(&clean) {
        match part {
            Annotation::Markup(markup) => out.push_str(&html_to_plain_markdown(markup)),
            Annotation::Reference {
                label,
                spacing,
                word,
                ..
            } => {
                out.push_str(&format!("**{label}**"));
                out.push_str(&html_to_plain_markdown(spacing));
                let word = html_to_plain_markdown(word);
                if !word.is_empty() {
                    out.push_str(&format!("*{word}*"));
                }
            }
        }
    }
    out
}

/// Drops tags (keeping `<br>` and `<b>` as Markdown) and decodes the
/// entities the sanitizer emits.
fn html_to_plain_markdown(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = &rest[open..];
            break;
        };
        let tag = rest[open + 1..open + close].trim().to_ascii_lowercase();
        match tag.split_whitespace().next().unwrap_or_default() {
            "br" | "br/" => out.push('\n'),
            "b" | "/b" | "strong" | "/strong" => out.push_str("**"),
            _ => {}
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn markdown_skin() -> MadSkin {
    MadSkin::default()
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    let skin = markdown_skin();
    let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
    println!("{formatted}");
}

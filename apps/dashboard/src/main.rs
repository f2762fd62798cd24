use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use client_core::{
    mount_http_page, ListController, ListRecord, StaticDataSource, SEARCH_FILTER,
};
use serde::de::DeserializeOwned;
use shared::protocol::{
    FilterPatch, FilterValue, ListQuery, Project, Requirement, TaskPlanItem, TeamMember,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::{render_page, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PageKind {
    Requirements,
    Tasks,
    Team,
    Projects,
}

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Browse the admin dashboard's list pages")]
struct Args {
    #[arg(long, value_enum)]
    page: PageKind,
    #[arg(long)]
    api_url: Option<String>,
    /// Serve records from a JSON array instead of the API.
    #[arg(long, conflicts_with = "api_url")]
    fixture: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page_number: u32,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: Option<u32>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    /// Read search text and `:` commands from stdin.
    #[arg(long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = api_url.clone();
    }

    match args.page {
        PageKind::Requirements => run::<Requirement>(&args, &settings).await,
        PageKind::Tasks => run::<TaskPlanItem>(&args, &settings).await,
        PageKind::Team => run::<TeamMember>(&args, &settings).await,
        PageKind::Projects => run::<Project>(&args, &settings).await,
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("filter key is empty in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn filter_value(raw: &str) -> FilterValue {
    raw.parse::<i64>()
        .map(FilterValue::Number)
        .unwrap_or_else(|_| FilterValue::from(raw))
}

fn build_query(args: &Args, settings: &Settings) -> ListQuery {
    let mut query = ListQuery::new(args.page_size.unwrap_or(settings.page_size));
    query.page = args.page_number;

    let mut patch = FilterPatch::new();
    if let Some(search) = &args.search {
        patch = patch.set(SEARCH_FILTER, search.as_str());
    }
    for (key, value) in &args.filters {
        patch = patch.set(key.as_str(), filter_value(value));
    }
    query.filters.apply(patch);
    query
}

async fn run<T>(args: &Args, settings: &Settings) -> Result<()>
where
    T: ListRecord + DeserializeOwned + Row,
{
    let query = build_query(args, settings);
    let controller = mount::<T>(args, settings, query).await?;

    let view = controller.settled().await?;
    print!("{}", render_page(&view));

    if args.interactive {
        return interactive(&controller).await;
    }
    if let Some(error) = view.error {
        anyhow::bail!("failed to load {}: {error}", T::RESOURCE);
    }
    Ok(())
}

async fn mount<T>(
    args: &Args,
    settings: &Settings,
    query: ListQuery,
) -> Result<ListController<T>>
where
    T: ListRecord + DeserializeOwned,
{
    let controller_settings = settings.controller_settings();
    let controller = match &args.fixture {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
            let source = StaticDataSource::<T>::from_json(&raw)
                .with_context(|| format!("invalid fixture '{}'", path.display()))?;
            info!(
                records = source.len(),
                fixture = %path.display(),
                "serving records from fixture"
            );
            ListController::with_query(source, controller_settings, query)?
        }
        None => {
            info!(api = %settings.api_base_url, resource = T::RESOURCE, "fetching from api");
            mount_http_page(
                &settings.api_base_url,
                settings.request_timeout(),
                controller_settings,
                query,
            )?
        }
    };
    Ok(controller)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Search(String),
    Filter(String, String),
    Next,
    Prev,
    Page(u32),
    Size(u32),
    Refresh,
    ClearError,
    Help,
    Quit,
}

const HELP: &str = "\
text            search (empty line clears)
:filter K=V     set a filter (:filter K= clears it)
:next / :prev   move one page
:page N         jump to page N
:size N         change page size
:refresh        reload the current page
:clear          dismiss the error
:quit           exit";

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Command::Search(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let cmd = match (parts.next(), parts.next()) {
            (Some("q" | "quit"), None) => Command::Quit,
            (Some("n" | "next"), None) => Command::Next,
            (Some("p" | "prev"), None) => Command::Prev,
            (Some("r" | "refresh"), None) => Command::Refresh,
            (Some("clear"), None) => Command::ClearError,
            (Some("h" | "help"), None) => Command::Help,
            (Some("page"), Some(n)) => Command::Page(parse_positive(n)?),
            (Some("size"), Some(n)) => Command::Size(parse_positive(n)?),
            (Some("filter"), Some(kv)) => {
                let (key, value) = parse_filter(kv)?;
                Command::Filter(key, value)
            }
            _ => return Err(format!("unknown command '{line}', try :help")),
        };
        if parts.next().is_some() {
            return Err(format!("unexpected arguments in '{line}'"));
        }
        Ok(cmd)
    }
}

fn parse_positive(raw: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive number, got '{raw}'")),
    }
}

fn apply_command<T>(controller: &ListController<T>, command: Command) -> Result<()>
where
    T: ListRecord,
{
    match command {
        Command::Search(text) => {
            controller.set_filters(FilterPatch::new().set(SEARCH_FILTER, text))?
        }
        Command::Filter(key, value) => {
            controller.set_filters(FilterPatch::new().set(key, filter_value(&value)))?
        }
        Command::Next => controller.set_page(controller.query().page.saturating_add(1))?,
        Command::Prev => controller.set_page(controller.query().page.saturating_sub(1).max(1))?,
        Command::Page(page) => controller.set_page(page)?,
        Command::Size(size) => controller.set_page_size(size)?,
        Command::Refresh => controller.refresh()?,
        Command::ClearError => controller.clear_error(),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Err(anyhow!("quit is handled by the input loop")),
    }
    Ok(())
}

async fn interactive<T>(controller: &ListController<T>) -> Result<()>
where
    T: ListRecord + Row,
{
    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = (*rx.borrow_and_update()).clone();
            if !view.loading && !view.filters_pending {
                print!("{}", render_page(&view));
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = apply_command(controller, command) {
                    eprintln!("{err}");
                }
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    controller.shutdown();
    printer.abort();
    Ok(())
}

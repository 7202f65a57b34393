use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

use clap::Args;
use serde_json::{json, Value};

use crate::assets::{attach, Asset};
use crate::cli::config::CliContext;
use crate::cli::utils::{cell_text, output_empty_collection, output_success, render_table};
use crate::cli::OutputFormat;
use crate::collection::{AssumeYes, Confirm, Draft, RemoteCollection, RemoveOutcome};
use crate::resources::{self, Resource};
use crate::view::{ListState, SortState};

const MAX_CELL_WIDTH: usize = 32;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(help = "Collection name, see `fdesk resources`")]
    pub resource: String,
    #[arg(long, short, help = "Case-insensitive search over the searchable columns")]
    pub query: Option<String>,
    #[arg(long, short, help = "Column to sort by")]
    pub sort: Option<String>,
    #[arg(long, help = "Sort descending")]
    pub desc: bool,
    #[arg(long, short, default_value_t = 1)]
    pub page: usize,
    #[arg(long, help = "Rows per page (defaults to the collection's size)")]
    pub page_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[arg(help = "Collection name, see `fdesk resources`")]
    pub resource: String,
    #[arg(long, short, help = "Read the record from this file instead of stdin")]
    pub file: Option<PathBuf>,
    #[arg(long = "image", value_name = "FIELD=PATH", help = "Attach a file to an image field")]
    pub images: Vec<String>,
}

/// Asks on the terminal; anything but y/yes declines
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn resolve(name: &str) -> anyhow::Result<Resource> {
    resources::find(name)?.ok_or_else(|| {
        anyhow::anyhow!("Unknown collection '{}'. Known: {}", name, resources::names().join(", "))
    })
}

fn open(resource: &Resource, ctx: &CliContext) -> anyhow::Result<RemoteCollection> {
    Ok(RemoteCollection::new(ctx.client()?, resource.endpoint.clone()))
}

pub fn resources(output_format: OutputFormat) -> anyhow::Result<()> {
    let all = resources::catalogue()?;
    match output_format {
        OutputFormat::Json => {
            let items: Vec<Value> = all
                .iter()
                .map(|r| {
                    json!({
                        "name": r.name,
                        "title": r.title,
                        "list_path": r.endpoint.list_path,
                        "scoped": r.endpoint.is_scoped(),
                        "columns": r.columns(),
                        "assets": r.assets,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "resources": items }))?);
        }
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = all
                .iter()
                .map(|r| {
                    vec![
                        r.name.to_string(),
                        r.title.to_string(),
                        r.endpoint.list_path.clone(),
                        (if r.endpoint.is_scoped() { "yes" } else { "" }).to_string(),
                    ]
                })
                .collect();
            let headers = ["name", "title", "path", "scoped"].map(String::from);
            println!("{}", render_table(&headers, &rows, MAX_CELL_WIDTH * 2));
        }
    }
    Ok(())
}

pub async fn list(args: ListArgs, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let resource = resolve(&args.resource)?;
    let collection = open(&resource, ctx)?;
    collection.reload().await?;

    let page_size = args.page_size.unwrap_or_else(|| resource.page_size_for(&ctx.config.view));
    let mut state = ListState::new(page_size);
    if let Some(sort) = resource.default_sort.clone() {
        state = state.with_sort(sort);
    }
    if let Some(key) = &args.sort {
        if resource.endpoint.field_map.field(key).is_none() {
            anyhow::bail!("'{}' is not a column of {}", key, resource.name);
        }
        state = state.with_sort(SortState::by(key, !args.desc));
    }
    if let Some(q) = &args.query {
        state.set_query(q);
    }
    state.set_page(args.page);

    let page = collection.view(&state.to_query());

    if page.total == 0 {
        return output_empty_collection(&output_format, resource.name, &format!("No {} found", resource.title.to_lowercase()));
    }

    match output_format {
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            out.insert(resource.name.to_string(), serde_json::to_value(&page)?);
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            let columns = resource.columns();
            let headers: Vec<String> = columns
                .iter()
                .map(|c| format!("{}{}", c, state.sort().indicator(c)))
                .collect();
            let rows: Vec<Vec<String>> = page
                .rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| if c == "id" { row.id.clone() } else { cell_text(row.get(c)) })
                        .collect()
                })
                .collect();
            println!("{}", render_table(&headers, &rows, MAX_CELL_WIDTH));
            println!("\nPage {}/{} ({} records)", page.page, page.page_count, page.total);
        }
    }
    Ok(())
}

fn read_draft(args: &WriteArgs) -> anyhow::Result<Draft> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let value: Value = if raw.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("record input is not valid JSON: {}", e))?
    };
    Ok(Draft::from_json(&value)?)
}

async fn attach_images(draft: &mut Draft, resource: &Resource, images: &[String], ctx: &CliContext) -> anyhow::Result<()> {
    if images.is_empty() {
        return Ok(());
    }
    let resolver = resource.assets.resolver(&ctx.client()?);
    for spec in images {
        let (field, path) = spec
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--image expects FIELD=PATH, got '{}'", spec))?;
        if !resource.image_fields.iter().any(|f| *f == field) {
            anyhow::bail!("'{}' is not an image field of {}", field, resource.name);
        }
        let asset = Asset::from_path(std::path::Path::new(path))?;
        attach(draft, field, &asset, resolver.as_ref()).await?;
    }
    Ok(())
}

pub async fn create(args: WriteArgs, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let resource = resolve(&args.resource)?;
    let mut draft = read_draft(&args)?;
    attach_images(&mut draft, &resource, &args.images, ctx).await?;

    let collection = open(&resource, ctx)?;
    collection.create(&draft).await?;
    output_success(
        &output_format,
        &format!("Created record in {}", resource.name),
        Some(json!({ "count": collection.rows().len() })),
    )
}

pub async fn update(id: &str, args: WriteArgs, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let resource = resolve(&args.resource)?;
    let mut draft = read_draft(&args)?;
    attach_images(&mut draft, &resource, &args.images, ctx).await?;

    let collection = open(&resource, ctx)?;
    collection.update(id, &draft).await?;
    output_success(
        &output_format,
        &format!("Updated {} '{}'", resource.name, id),
        collection.row(id).map(|row| json!({ "record": row })),
    )
}

pub async fn delete(name: &str, id: &str, yes: bool, ctx: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let resource = resolve(name)?;
    let collection = open(&resource, ctx)?;
    let confirm: &dyn Confirm = if yes { &AssumeYes } else { &StdinConfirm };

    match collection.remove(id, confirm).await? {
        RemoveOutcome::Deleted => output_success(&output_format, &format!("Deleted {} '{}'", resource.name, id), None),
        RemoveOutcome::Declined => output_success(&output_format, "Nothing deleted", Some(json!({ "declined": true }))),
    }
}

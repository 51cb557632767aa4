use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use objstore_kinds::KindRegistry;
use objstore_store::{
    open_store, DeleteObjectRequest, ObjectHistoryRequest, ObjectSearchRequest, ObjectStore,
    ReadObjectRequest, StoreConfig, StoreContext, WriteObjectRequest, WriteObjectResponse,
    WriteStatus,
};
use objstore_types::Grn;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

/// Load the config file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(StoreConfig::default()),
    }
}

pub fn run_command(cli: Cli, config: StoreConfig) -> anyhow::Result<()> {
    let kinds = Arc::new(KindRegistry::with_builtins()?);
    let resolver = Arc::new(config.resolver.build());
    debug!(backend = ?config.backend, tenant = cli.tenant, "opening object store");
    let store = open_store(&config, kinds, resolver).context("opening object store")?;
    let ctx = StoreContext::new(cli.tenant, cli.user.clone());
    let out = Output(cli.format);

    match cli.command {
        Command::Kinds => cmd_kinds(store.as_ref(), out),
        Command::Write(args) => cmd_write(store.as_ref(), &ctx, args, out),
        Command::Read(args) => cmd_read(store.as_ref(), &ctx, args, out),
        Command::History(args) => cmd_history(store.as_ref(), &ctx, args, out),
        Command::Delete(args) => cmd_delete(store.as_ref(), &ctx, args, out),
        Command::Search(args) => cmd_search(store.as_ref(), &ctx, args, out),
        Command::Dangling => cmd_dangling(store.as_ref(), &ctx, out),
    }
}

#[derive(Clone, Copy)]
struct Output(OutputFormat);

impl Output {
    fn is_json(self) -> bool {
        self.0 == OutputFormat::Json
    }

    fn json<T: Serialize>(self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn grn(ctx: &StoreContext, target: &Target) -> Grn {
    Grn::new(ctx.tenant_id, target.kind.clone(), target.uid.clone())
}

fn read_body(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body).context("reading stdin")?;
        Ok(body)
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn cmd_kinds(store: &dyn ObjectStore, out: Output) -> anyhow::Result<()> {
    let kinds = store.kinds();
    if out.is_json() {
        return out.json(&kinds);
    }
    for kind in kinds {
        let format = match (&kind.mime_type, kind.is_raw) {
            (Some(mime), true) => mime.dimmed().to_string(),
            (_, true) => "raw".dimmed().to_string(),
            (_, false) => "json".dimmed().to_string(),
        };
        println!("{:<12} {:<24} {}", kind.id.bold(), kind.name, format);
    }
    Ok(())
}

fn cmd_write(store: &dyn ObjectStore, ctx: &StoreContext, args: WriteArgs, out: Output) -> anyhow::Result<()> {
    let grn = grn(ctx, &args.target);
    let req = WriteObjectRequest {
        grn: grn.clone(),
        body: read_body(&args.file)?,
        folder: args.folder,
        comment: args.message,
        previous_version: args.previous_version,
        version: args.version,
        clear_history: args.clear_history,
        origin: None,
    };

    let rsp = match store.write(ctx, &req) {
        Ok(rsp) => rsp,
        Err(err) => {
            if out.is_json() {
                out.json(&WriteObjectResponse::from_error(grn, &err))?;
            }
            return Err(err).context("write failed");
        }
    };
    if out.is_json() {
        return out.json(&rsp);
    }

    let status = match rsp.status {
        WriteStatus::Created => "created".green().bold(),
        WriteStatus::Updated => "updated".green().bold(),
        WriteStatus::Unchanged => "unchanged".yellow().bold(),
        WriteStatus::Error => "error".red().bold(),
    };
    let version = rsp.version().unwrap_or("?");
    println!("{} {} {} version {}", "✓".green().bold(), status, grn.to_string().cyan(), version.bold());
    if let Some(object) = &rsp.object {
        println!("  etag: {}", object.etag.dimmed());
    }
    Ok(())
}

fn cmd_read(store: &dyn ObjectStore, ctx: &StoreContext, args: ReadArgs, out: Output) -> anyhow::Result<()> {
    let grn = grn(ctx, &args.target);
    let req = ReadObjectRequest {
        grn: grn.clone(),
        version: args.version,
        with_body: args.body,
        with_summary: args.summary,
    };
    let rsp = store.read(ctx, &req)?;
    if out.is_json() {
        return out.json(&rsp);
    }

    let Some(object) = rsp.object else {
        println!("{} {} not found", "✗".red().bold(), grn.to_string().cyan());
        return Ok(());
    };
    println!("{} version {}", grn.to_string().cyan().bold(), object.version.bold());
    println!("  size:    {}", object.size);
    println!("  etag:    {}", object.etag.dimmed());
    if !object.folder.is_empty() {
        println!("  folder:  {}", object.folder);
    }
    println!("  created: {} by {}", format_ms(object.created_at), object.created_by);
    println!("  updated: {} by {}", format_ms(object.updated_at), object.updated_by);
    if !object.comment.is_empty() {
        println!("  comment: {}", object.comment);
    }
    if let Some(summary) = rsp.summary {
        println!("  name:    {}", summary.name.bold());
        for (key, value) in &summary.labels {
            if value.is_empty() {
                println!("  tag:     {}", key.blue());
            } else {
                println!("  label:   {}={}", key.blue(), value);
            }
        }
        for reference in &summary.references {
            println!("  ref:     {}", reference.composite_key().yellow());
        }
        if let Some(error) = summary.error {
            println!("  error:   {} {}", error.code.to_string().red(), error.message);
        }
    }
    if let Some(body) = object.body {
        println!();
        println!("{}", String::from_utf8_lossy(&body));
    }
    Ok(())
}

fn cmd_history(store: &dyn ObjectStore, ctx: &StoreContext, args: HistoryArgs, out: Output) -> anyhow::Result<()> {
    let mut req = ObjectHistoryRequest::new(grn(ctx, &args.target));
    req.limit = args.limit;
    let rsp = store.history(ctx, &req)?;
    if out.is_json() {
        return out.json(&rsp);
    }
    if rsp.versions.is_empty() {
        println!("No history.");
    }
    for v in &rsp.versions {
        println!(
            "{:>6}  {}  {:<12} {:>8}B  {}",
            v.version.yellow().bold(),
            format_ms(v.updated_at),
            v.updated_by,
            v.size,
            v.comment
        );
    }
    Ok(())
}

fn cmd_delete(store: &dyn ObjectStore, ctx: &StoreContext, args: DeleteArgs, out: Output) -> anyhow::Result<()> {
    let grn = grn(ctx, &args.target);
    let req = DeleteObjectRequest {
        grn: grn.clone(),
        previous_version: args.previous_version,
    };
    let rsp = store.delete(ctx, &req)?;
    if out.is_json() {
        return out.json(&rsp);
    }
    if rsp.ok {
        println!("{} Deleted {}", "✓".green().bold(), grn.to_string().cyan());
    } else {
        println!("{} {} not found", "✗".red().bold(), grn.to_string().cyan());
    }
    Ok(())
}

fn cmd_search(store: &dyn ObjectStore, ctx: &StoreContext, args: SearchArgs, out: Output) -> anyhow::Result<()> {
    let req = ObjectSearchRequest {
        kinds: args.kinds,
        folder: args.folder,
        limit: args.limit,
        next_page_token: args.page_token,
        with_labels: args.labels,
        with_fields: args.fields,
        ..Default::default()
    };
    let rsp = store.search(ctx, &req)?;
    if out.is_json() {
        return out.json(&rsp);
    }

    for hit in &rsp.results {
        println!(
            "{:<40} {:>5}  {}",
            format!("{}/{}", hit.grn.kind, hit.grn.uid).cyan(),
            hit.version.yellow(),
            hit.name
        );
        if let Some(labels) = &hit.labels {
            let labels: Vec<String> = labels
                .iter()
                .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{k}={v}") })
                .collect();
            if !labels.is_empty() {
                println!("    labels: {}", labels.join(", ").blue());
            }
        }
        if let Some(fields) = &hit.fields {
            if !fields.is_empty() {
                println!("    fields: {}", serde_json::to_string(fields)?.dimmed());
            }
        }
    }
    println!("{} result(s)", rsp.results.len().to_string().bold());
    if let Some(token) = rsp.next_page_token {
        println!("next page: {}", format!("--page-token {token}").yellow());
    }
    Ok(())
}

fn cmd_dangling(store: &dyn ObjectStore, ctx: &StoreContext, out: Output) -> anyhow::Result<()> {
    let dangling = store.dangling_references(ctx)?;
    if out.is_json() {
        return out.json(&dangling);
    }
    if dangling.is_empty() {
        println!("{} All references resolve.", "✓".green().bold());
    }
    for d in &dangling {
        println!(
            "{} -> {}  {}",
            d.source.to_string().cyan(),
            d.reference.reference.composite_key().yellow(),
            d.reference.resolved.warning.dimmed()
        );
    }
    Ok(())
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

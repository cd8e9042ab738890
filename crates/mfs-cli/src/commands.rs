use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Weak};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use mfs_core::{File, Namespace, OpenMode, ParentCloser};
use mfs_modifier::{layout, ModifierConfig};
use mfs_store::InMemoryNodeStore;
use mfs_types::AddressVersion;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.layout)?;
    let version = AddressVersion::from_u8(cli.layout.address_version)
        .with_context(|| format!("unknown address version {}", cli.layout.address_version))?;
    match cli.command {
        Command::Import(args) => cmd_import(args, &config, version, cli.format),
        Command::Edit(args) => cmd_edit(args, &config, version, cli.format),
        Command::Config => cmd_config(&config, cli.format),
    }
}

fn load_config(args: &LayoutArgs) -> anyhow::Result<ModifierConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ModifierConfig::from_toml_str(&text)?
        }
        None => ModifierConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(max_links) = args.max_links {
        config.max_links = max_links;
    }
    config.validate()?;
    Ok(config)
}

/// One imported file with the store and namespace it lives in.
struct Session {
    store: Arc<InMemoryNodeStore>,
    namespace: Arc<Namespace>,
    file: Arc<File>,
}

/// Requested changes for `edit`.
#[derive(Default)]
struct Edit {
    offset: u64,
    data: Vec<u8>,
    truncate: Option<u64>,
}

fn import_file(path: &Path, config: &ModifierConfig, version: AddressVersion) -> anyhow::Result<Session> {
    let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());

    let store = Arc::new(InMemoryNodeStore::new());
    let namespace = Arc::new(Namespace::new());
    let parent = Arc::downgrade(&namespace) as Weak<dyn ParentCloser>;
    let empty = layout::empty_file(version.uses_raw_leaves(), version)?;
    let file = File::with_config(name, empty, parent, store.clone(), config.clone())?;

    let mut fd = file.open(OpenMode::WriteOnly, true)?;
    fd.write_at(0, &content)?;
    fd.flush()?;
    fd.close()?;
    debug!(path = %path.display(), bytes = content.len(), "imported file");

    Ok(Session {
        store,
        namespace,
        file,
    })
}

fn apply_edit(session: &Session, edit: &Edit) -> anyhow::Result<()> {
    let mut fd = session.file.open(OpenMode::ReadWrite, true)?;
    if let Some(size) = edit.truncate {
        fd.truncate(size)?;
    }
    if !edit.data.is_empty() {
        fd.write_at(edit.offset, &edit.data)?;
    }
    let flushed = fd.flush();
    let closed = fd.close();
    flushed.and(closed)?;
    Ok(())
}

fn read_back(session: &Session) -> anyhow::Result<Vec<u8>> {
    let mut fd = session.file.open(OpenMode::ReadOnly, false)?;
    let mut out = Vec::new();
    fd.read_to_end(&mut out)?;
    fd.close()?;
    Ok(out)
}

fn cmd_import(
    args: ImportArgs,
    config: &ModifierConfig,
    version: AddressVersion,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let session = import_file(&args.path, config, version)?;
    report(&session, "Imported", None, format)
}

fn cmd_edit(
    args: EditArgs,
    config: &ModifierConfig,
    version: AddressVersion,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let data = match (&args.data, &args.from) {
        (Some(text), _) => text.clone().into_bytes(),
        (None, Some(path)) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        (None, None) => Vec::new(),
    };
    if data.is_empty() && args.truncate.is_none() {
        bail!("nothing to edit: pass --data, --from or --truncate");
    }

    let session = import_file(&args.path, config, version)?;
    let before = session.file.node_id();
    let nodes_before = session.store.len();
    apply_edit(
        &session,
        &Edit {
            offset: args.offset,
            data,
            truncate: args.truncate,
        },
    )?;
    let added = session.store.len() - nodes_before;

    if let Some(out) = &args.out {
        fs::write(out, read_back(&session)?).with_context(|| format!("writing {}", out.display()))?;
    }
    report(&session, "Edited", Some((before.to_string(), added)), format)
}

fn cmd_config(config: &ModifierConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => {
            println!("chunk_size = {}", config.chunk_size.to_string().cyan());
            println!("max_links = {}", config.max_links.to_string().cyan());
        }
    }
    Ok(())
}

fn report(
    session: &Session,
    action: &str,
    edit: Option<(String, usize)>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let name = session.file.name();
    let root = session.file.node_id();
    let size = session.file.size()?;
    let recorded = session.namespace.entry(name) == Some(root);

    match format {
        OutputFormat::Json => {
            let mut value = json!({
                "name": name,
                "root": root.to_string(),
                "size": size,
                "raw_leaves": session.file.raw_leaves(),
                "nodes": session.store.len(),
                "stored_bytes": session.store.total_bytes(),
                "recorded_by_parent": recorded,
            });
            if let Some((previous, added)) = edit {
                value["previous_root"] = json!(previous);
                value["nodes_added"] = json!(added);
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{} {} {}", "✓".green().bold(), action, name.bold());
            if let Some((previous, _)) = &edit {
                println!("  Previous: {}", previous.dimmed());
            }
            println!("  Root: {}", root.to_string().yellow());
            println!("  Size: {} bytes", size.to_string().bold());
            println!(
                "  Nodes: {} ({} bytes stored)",
                session.store.len(),
                session.store.total_bytes()
            );
            if let Some((_, added)) = edit {
                println!("  New nodes: {}", added.to_string().cyan());
            }
            if !recorded {
                println!("  {} parent has not recorded the root", "!".red().bold());
            }
        }
    }
    Ok(())
}

use anyhow::{Context, Result, anyhow, bail};
use relative_path::RelativePathBuf;
use seqsync_config::Config;
use seqsync_engine::catalog::{CatalogActor, StaticCatalog};
use seqsync_engine::{
    ActionContent, Cmd, FormatOptions, ModelTree, ParentRef, Session, SessionOptions, TextChange,
    TextOutcome, io, regenerate,
};
use std::path::{Path, PathBuf};
use std::{env, process};

const USAGE: &str = "\
Usage:
  seqsync check <file-or-dir>
  seqsync fmt <file> [--write]
  seqsync tree <file>
  seqsync diff <old> <new>
  seqsync add <file> --actor <id> [--index <n>]";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Check { path: PathBuf },
    Fmt { path: PathBuf, write: bool },
    Tree { path: PathBuf },
    Diff { old: PathBuf, new: PathBuf },
    Add {
        path: PathBuf,
        actor: String,
        index: Option<usize>,
    },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let (name, rest) = args.split_first().ok_or("missing command")?;
    let mut positional = Vec::new();
    let mut write = false;
    let mut actor = None;
    let mut index = None;

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--write" => write = true,
            "--actor" => actor = Some(iter.next().ok_or("--actor needs an id")?.clone()),
            "--index" => {
                let value = iter.next().ok_or("--index needs a number")?;
                index = Some(
                    value
                        .parse()
                        .map_err(|_| format!("--index: `{value}` is not a number"))?,
                );
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option `{flag}`")),
            path => positional.push(PathBuf::from(path)),
        }
    }

    let command = match (name.as_str(), positional.as_slice()) {
        ("check", [path]) => Command::Check { path: path.clone() },
        ("fmt", [path]) => Command::Fmt {
            path: path.clone(),
            write,
        },
        ("tree", [path]) => Command::Tree { path: path.clone() },
        ("diff", [old, new]) => Command::Diff {
            old: old.clone(),
            new: new.clone(),
        },
        ("add", [path]) => Command::Add {
            path: path.clone(),
            actor: actor.ok_or("add needs --actor <id>")?,
            index,
        },
        ("check" | "fmt" | "tree" | "diff" | "add", _) => {
            return Err(format!("wrong number of arguments for `{name}`"));
        }
        _ => return Err(format!("unknown command `{name}`")),
    };
    Ok(command)
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    match run(command) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

/// Returns false when the command ran but found errors in the input.
fn run(command: Command) -> Result<bool> {
    let config = load_config()?;
    let options = session_options(&config);

    match command {
        Command::Check { path } => check(&path, options),
        Command::Fmt { path, write } => {
            let (root, file) = locate(&path)?;
            let session = open_clean(&root, &file, options)?;
            let text = regenerate(session.model(), &options.format).text;
            if write {
                io::write_diagram(&file, &root, &text)?;
                log::info!("formatted {}", path.display());
            } else {
                print!("{text}");
            }
            Ok(true)
        }
        Command::Tree { path } => {
            let (root, file) = locate(&path)?;
            let session = Session::open(&io::read_diagram(&file, &root)?, options)?;
            print!("{}", render_tree(session.model()));
            Ok(!session.diagnostics().iter().any(|d| d.is_error()))
        }
        Command::Diff { old, new } => {
            let (old_root, old_file) = locate(&old)?;
            let (new_root, new_file) = locate(&new)?;
            let mut session = Session::open(&io::read_diagram(&old_file, &old_root)?, options)?;
            let text = io::read_diagram(&new_file, &new_root)?;
            if let TextOutcome::Synced(sync) = session.apply_text(TextChange::user(text))? {
                print!("{}", sync.patch);
            }
            Ok(true)
        }
        Command::Add { path, actor, index } => {
            let catalog = load_catalog(&config)?;
            let (root, file) = locate(&path)?;
            let mut session = open_clean(&root, &file, options)?;
            let index = index.unwrap_or_else(|| after_participants(session.model()));
            let cmd = Cmd::insert_participant_from_catalog(&catalog, &actor, index)?;
            let sync = session.apply_model(vec![cmd])?;
            io::write_diagram(&file, &root, &sync.text)?;
            log::info!("added `{actor}` to {}", path.display());
            Ok(true)
        }
    }
}

fn check(path: &Path, options: SessionOptions) -> Result<bool> {
    let files = if path.is_dir() {
        io::scan_diagrams(path)?
            .into_iter()
            .map(|file| (path.to_path_buf(), file))
            .collect()
    } else {
        vec![locate(path)?]
    };

    let mut clean = true;
    for (root, file) in &files {
        let session = Session::open(&io::read_diagram(file, root)?, options)?;
        let display = file.to_path(root);
        for diagnostic in session.diagnostics() {
            println!("{}:{diagnostic}", display.display());
            clean &= !diagnostic.is_error();
        }
    }
    log::info!("checked {} diagrams", files.len());
    Ok(clean)
}

fn load_config() -> Result<Config> {
    let config = Config::load().with_context(|| {
        format!(
            "loading config from {}",
            Config::config_path().display()
        )
    })?;
    Ok(config.unwrap_or_default())
}

fn session_options(config: &Config) -> SessionOptions {
    SessionOptions {
        format: FormatOptions {
            indent: config.format.indent,
            envelope: config.format.envelope,
        },
        policy: config.identity.policy,
        incremental: config.lexing.incremental,
        history_limit: config.history.limit,
    }
}

fn load_catalog(config: &Config) -> Result<StaticCatalog> {
    let catalog = config.load_catalog()?.ok_or_else(|| {
        anyhow!(
            "no actor catalog found; set catalog_path in {}",
            Config::config_path().display()
        )
    })?;
    Ok(StaticCatalog::new(catalog.actors.into_iter().map(|entry| {
        CatalogActor {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
        }
    })))
}

/// Split a path on the command line into the directory the IO helpers
/// work relative to and the file name within it.
fn locate(path: &Path) -> Result<(PathBuf, RelativePathBuf)> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} is not a file", path.display()))?;
    let file = RelativePathBuf::from_path(name)
        .with_context(|| format!("{} is not a valid file name", path.display()))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, file))
}

/// Open a file that is about to be rewritten; refuse if parts of it would
/// be lost.
fn open_clean(root: &Path, file: &RelativePathBuf, options: SessionOptions) -> Result<Session> {
    let session = Session::open(&io::read_diagram(file, root)?, options)?;
    let errors: Vec<String> = session
        .diagnostics()
        .iter()
        .filter(|d| d.is_error())
        .map(ToString::to_string)
        .collect();
    if !errors.is_empty() {
        bail!(
            "{} has errors, fix them first:\n  {}",
            file.to_path(root).display(),
            errors.join("\n  ")
        );
    }
    Ok(session)
}

/// Root index just after the last top-level participant declaration.
fn after_participants(model: &ModelTree) -> usize {
    let root = model.children(ParentRef::Root).unwrap_or_default();
    root.iter()
        .rposition(|id| matches!(model.get(*id), Some(ActionContent::Participant { .. })))
        .map_or(0, |last| last + 1)
}

fn render_tree(model: &ModelTree) -> String {
    let mut out = String::new();
    render_slot(model, ParentRef::Root, 0, &mut out);
    out
}

fn render_slot(model: &ModelTree, parent: ParentRef, depth: usize, out: &mut String) {
    for id in model.children(parent).unwrap_or_default() {
        let Some(content) = model.get(*id) else {
            continue;
        };
        out.push_str(&format!("{}{id} {}\n", "  ".repeat(depth), content.summary()));
        if let ActionContent::Block { conditions, .. } = content {
            for (branch, condition) in conditions.iter().enumerate() {
                out.push_str(&format!("{}[{branch}] {condition}\n", "  ".repeat(depth + 1)));
                render_slot(
                    model,
                    ParentRef::Branch { block: *id, branch },
                    depth + 2,
                    out,
                );
            }
        }
    }
}

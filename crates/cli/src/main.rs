use bytesize::ByteSize;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fstree_core::{FileTree, Stat};

#[derive(Parser, Debug)]
#[command(name = "fstree-cli", about = "File tree script runner")]
struct Args {
    /// Command script; reads stdin when omitted
    script: Option<PathBuf>,
    /// Output JSON report path
    #[arg(short, long)]
    json: Option<PathBuf>,
    /// Output CSV report path
    #[arg(long)]
    csv: Option<PathBuf>,
}

/// Applies one script line to the tree. Returns false if the command
/// failed or was not recognized.
fn apply(tree: &mut FileTree, line: &str) -> bool {
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    let rest = rest.trim_start();
    let (path, payload) = rest
        .split_once(char::is_whitespace)
        .map(|(p, c)| (p, c.trim_start()))
        .unwrap_or((rest, ""));
    let path_arg = (!path.is_empty()).then_some(path);

    match (verb, path_arg) {
        ("mkdir", Some(path)) => match tree.insert_dir(path) {
            Ok(()) => true,
            Err(e) => {
                error!(path, %e, "mkdir failed");
                false
            }
        },
        ("touch", Some(path)) => match tree.insert_file(path, payload.as_bytes().to_vec()) {
            Ok(()) => true,
            Err(e) => {
                error!(path, %e, "touch failed");
                false
            }
        },
        ("write", Some(path)) => {
            match tree.replace_file_contents(path, payload.as_bytes().to_vec()) {
                Some(_) => true,
                None => {
                    error!(path, "write failed: not an existing file");
                    false
                }
            }
        }
        ("cat", Some(path)) => match tree.file_contents(path) {
            Some(contents) => {
                println!("{}", String::from_utf8_lossy(contents));
                true
            }
            None => {
                error!(path, "cat failed: not an existing file");
                false
            }
        },
        ("stat", Some(path)) => match tree.stat(path) {
            Ok(Stat::File { length }) => {
                println!("{path}: file, {}", ByteSize(length as u64));
                true
            }
            Ok(Stat::Directory) => {
                println!("{path}: directory");
                true
            }
            Err(e) => {
                error!(path, %e, "stat failed");
                false
            }
        },
        ("rmdir", Some(path)) => match tree.remove_dir(path) {
            Ok(()) => true,
            Err(e) => {
                error!(path, %e, "rmdir failed");
                false
            }
        },
        ("rm", Some(path)) => match tree.remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                error!(path, %e, "rm failed");
                false
            }
        },
        ("ls", _) => match tree.listing() {
            Ok(listing) => {
                print!("{listing}");
                true
            }
            Err(e) => {
                error!(%e, "ls failed");
                false
            }
        },
        _ => {
            error!(line, "unrecognized command");
            false
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let script = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), %e, "cannot read script");
                std::process::exit(1);
            }
        },
        None => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut text) {
                error!(%e, "cannot read stdin");
                std::process::exit(1);
            }
            text
        }
    };

    let mut tree = FileTree::new();
    if tree.init().is_err() {
        std::process::exit(1);
    }

    let mut failures = 0usize;
    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !apply(&mut tree, line) {
            failures += 1;
        }
    }

    match tree.listing() {
        Ok(listing) => print!("{listing}"),
        Err(e) => error!(%e, "listing failed"),
    }

    if let Some(path) = &args.json {
        let json = fstree_core::export::to_json(&tree);
        match serde_json::to_string_pretty(&json) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    error!(path = %path.display(), %e, "cannot write JSON report");
                    failures += 1;
                }
            }
            Err(e) => {
                error!(%e, "cannot serialize JSON report");
                failures += 1;
            }
        }
    }
    if let Some(path) = &args.csv {
        match std::fs::File::create(path) {
            Ok(file) => {
                if let Err(e) = fstree_core::export::to_csv(&tree, file) {
                    error!(path = %path.display(), %e, "cannot write CSV report");
                    failures += 1;
                }
            }
            Err(e) => {
                error!(path = %path.display(), %e, "cannot create CSV report");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

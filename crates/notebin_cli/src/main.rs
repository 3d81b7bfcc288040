//! CLI probe over a notebin data directory.
//!
//! # Responsibility
//! - Verify `notebin_core` wiring against a real data directory.
//! - Print the folder tree or recycle bin as JSON.
//!
//! Usage: `notebin_cli [<data_dir> [tree|bin] [json|sqlite]]`

use log::error;
use notebin_core::{init_logging_for, StorageBackend, Workspace, WorkspaceConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(data_dir) = args.next() else {
        println!("notebin_core ping={}", notebin_core::ping());
        println!("notebin_core version={}", notebin_core::core_version());
        return ExitCode::SUCCESS;
    };
    let command = args.next().unwrap_or_else(|| "tree".to_string());

    match run(&data_dir, &command, args.next().as_deref()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(data_dir: &str, command: &str, backend: Option<&str>) -> Result<String, String> {
    let backend = backend
        .map(StorageBackend::parse)
        .transpose()?
        .unwrap_or_default();
    let config = WorkspaceConfig::new(data_dir).with_backend(backend);
    init_logging_for(&config)?;

    let workspace = Workspace::open(&config).map_err(|err| err.to_string())?;
    let rendered = match command {
        "tree" => workspace
            .folder_tree(None)
            .map_err(|err| err.to_string())
            .and_then(|tree| serde_json::to_string_pretty(&tree).map_err(|err| err.to_string())),
        "bin" => workspace
            .recycle_bin()
            .map_err(|err| err.to_string())
            .and_then(|notes| serde_json::to_string_pretty(&notes).map_err(|err| err.to_string())),
        other => Err(format!("unknown command `{other}`; expected tree|bin")),
    };

    if let Err(message) = &rendered {
        error!("event=cli_command module=cli status=error command={command} error={message}");
    }
    rendered
}

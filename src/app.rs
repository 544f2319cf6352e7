//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, and dispatches
//! the requested link operation.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use adxlink::cli::{Args, Command};
use adxlink::config::{CONFIG_ENV, config_path, create_template_config, load_config};
use adxlink::output as out;
use adxlink::{
    LinkError, ListOptions, backup, classify, copy_link, delete_link, dims, exists,
    list_detailed, max_dims, move_link, overwrite, read_attributes, shutdown, Config,
};

use crate::logging::init_tracing;

/// Exit status for a failed run: the library error code when there is one.
pub fn exit_code(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|c| c.downcast_ref::<LinkError>())
        .and_then(|l| u8::try_from(l.code()).ok())
        .unwrap_or(1)
}

fn print_config_location() {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {p}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match config_path() {
        Some(p) => {
            out::print_info(&format!("Default adxlink config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run `adxlink init-config` to create a template.");
            }
        }
        None => out::print_error("Could not determine a default config path."),
    }
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Config commands run before config loading and logging init.
    match &args.command {
        Command::PrintConfig => {
            print_config_location();
            return Ok(());
        }
        Command::InitConfig { path } => {
            let path = path
                .clone()
                .or_else(config_path)
                .context("could not determine a config path; pass --path")?;
            create_template_config(&path)?;
            out::print_success(&format!("A template adxlink config was written to: {}", path.display()));
            return Ok(());
        }
        _ => {}
    }

    let mut cfg = match load_config()? {
        Some((_, cfg)) => cfg,
        None => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;
    cfg.validate()?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        let installed = ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current step...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        });
        if let Err(e) = installed {
            debug!(error = %e, "signal handler not installed");
        }
    }

    debug!(command = ?args.command, "starting adxlink");

    let result = dispatch(&cfg, &args.command);
    if let Err(e) = &result {
        match e.downcast_ref::<LinkError>() {
            Some(le) if le.is_fatal() => {
                error!(code = le.code(), error = %le, "fatal: container stayed unavailable; stopping")
            }
            Some(le) => error!(code = le.code(), error = %le, "operation failed"),
            None => error!(error = ?e, "operation failed"),
        }
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn format_dims<T>(dims: &[T], show: impl Fn(&T) -> String) -> String {
    if dims.is_empty() {
        return "scalar".to_string();
    }
    dims.iter().map(show).collect::<Vec<_>>().join(" x ")
}

fn dispatch(cfg: &Config, command: &Command) -> Result<()> {
    match command {
        Command::Ls {
            file,
            name,
            recursive,
            full_names,
            long,
        } => {
            let opts = ListOptions {
                recursive: *recursive,
                full_names: *full_names,
            };
            for entry in list_detailed(cfg, file, name.as_deref(), opts.recursive)? {
                let shown = if opts.full_names { &entry.full_name } else { &entry.name };
                if *long {
                    out::print_row(&entry.kind.to_string(), shown);
                } else {
                    out::print_user(shown);
                }
            }
        }
        Command::Exists { file, name } => {
            out::print_user(&exists(cfg, file, name)?.to_string());
        }
        Command::Kind { file, name } => {
            out::print_user(&classify(cfg, file, name)?.to_string());
        }
        Command::Dims { file, name, max } => {
            let line = if *max {
                format_dims(&max_dims(cfg, file, Some(name.as_str()))?, |d| {
                    d.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                })
            } else {
                format_dims(&dims(cfg, file, Some(name.as_str()))?, u64::to_string)
            };
            out::print_user(&line);
        }
        Command::Attrs { file, name } => {
            for (key, value) in read_attributes(cfg, file, name.as_deref())? {
                out::print_user(&format!("{key} = {value}"));
            }
        }
        Command::Cp {
            from,
            from_name,
            to,
            to_name,
            overwrite,
        } => {
            let to_name = to_name.as_deref().unwrap_or(from_name);
            copy_link(cfg, from, from_name, to, to_name, *overwrite)?;
            out::print_success(&format!(
                "Copied {}:{} -> {}:{}",
                from.display(),
                from_name,
                to.display(),
                to_name
            ));
        }
        Command::Mv {
            file,
            from,
            to,
            overwrite,
        } => {
            if move_link(cfg, file, from, to, *overwrite)? {
                out::print_success(&format!("Moved {from} -> {to} in {}", file.display()));
            } else {
                out::print_warn(&format!("Nothing moved: {from} -> {to} in {}", file.display()));
            }
        }
        Command::Rm { file, name } => {
            if delete_link(cfg, file, name)? {
                out::print_success(&format!("Deleted {name} from {}", file.display()));
            } else {
                out::print_warn(&format!("No link {name} in {}", file.display()));
            }
        }
        Command::Backup {
            from,
            to,
            exclude,
            overwrite,
        } => {
            let dest = backup(cfg, from, to, exclude.as_slice(), *overwrite)?;
            out::print_success(&format!("Backed up {} -> {}", from.display(), dest.display()));
        }
        Command::Overwrite { file, name, force } => {
            let file = overwrite(cfg, file, name, *force)?;
            out::print_success(&format!("{} is ready for {name}", file.display()));
        }
        Command::PrintConfig | Command::InitConfig { .. } => {}
    }
    Ok(())
}

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use bundle_localizer::{Command, Config, MergePolicy, SubstitutionMode};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bundle-localizer",
    version,
    about = "Localize UI strings inside an application's bundled script"
)]
struct Cli {
    /// Translation dictionary (JSON, category -> { original: translated })
    #[arg(short = 'd', long = "dictionary", global = true)]
    dictionary: Option<String>,

    /// Pending additions merged into the dictionary before patching
    #[arg(short = 'p', long = "pending", global = true)]
    pending: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging and full listings
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Only print totals
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Patch the target file, always starting from its pristine backup
    Apply {
        /// direct (replace) or bilingual (original + translation)
        #[arg(short = 'm', long = "mode")]
        mode: Option<SubstitutionMode>,

        /// File to patch (defaults to settings paths.target / candidates)
        #[arg(short = 't', long = "target")]
        target: Option<String>,

        /// last-wins or strict handling of keys defined in several categories
        #[arg(long = "policy")]
        policy: Option<MergePolicy>,

        /// Skip merging the pending additions file
        #[arg(long = "no-merge")]
        no_merge: bool,

        /// Fail instead of retrying with built-in terms when nothing matches
        #[arg(long = "no-fallback")]
        no_fallback: bool,
    },
    /// Restore the target from its backup and delete the backup
    Restore {
        #[arg(short = 't', long = "target")]
        target: Option<String>,
    },
    /// Check the dictionary for empty, long, escaped or duplicate entries
    Validate,
    /// Repair what validate reports and write the dictionary back
    Fix,
    /// Merge the pending additions file into the dictionary
    Merge,
    /// Write a report of untranslated entries and known UI terms
    Detect {
        /// Report path (defaults to settings paths.report)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
    },
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Self::Apply {
                mode,
                target,
                policy,
                no_merge,
                no_fallback,
            } => Command::Apply {
                mode,
                target,
                policy,
                no_merge,
                no_fallback,
            },
            Self::Restore { target } => Command::Restore { target },
            Self::Validate => Command::Validate,
            Self::Fix => Command::Fix,
            Self::Merge => Command::Merge,
            Self::Detect { out } => Command::Detect { out },
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    bundle_localizer::logging::init(cli.verbose)?;

    let config = Config {
        dictionary: cli.dictionary.clone(),
        pending: cli.pending.clone(),
        settings_path: cli.read_settings.clone(),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if cli.interactive {
        run_interactive(config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        return Err(anyhow!(
            "no command given (apply, restore, validate, fix, merge, detect); see --help"
        ));
    };
    let output = bundle_localizer::run(config, command.into_command())?;
    println!("{}", output.text);
    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

struct InteractiveState {
    config: Config,
    mode: SubstitutionMode,
    target: Option<String>,
}

fn run_interactive(config: Config) -> Result<()> {
    let mut state = InteractiveState {
        config,
        mode: SubstitutionMode::Direct,
        target: None,
    };
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if handle_interactive_command(input, &mut state)? {
            break;
        }
    }
    Ok(())
}

fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }

    let command = match trimmed {
        "/restore" => Command::Restore {
            target: state.target.clone(),
        },
        "/validate" => Command::Validate,
        "/fix" => Command::Fix,
        "/merge" => Command::Merge,
        "/detect" => Command::Detect { out: None },
        _ => {
            if let Some(arg) = trimmed.strip_prefix("/apply") {
                let value = arg.trim();
                let mode = if value.is_empty() {
                    state.mode
                } else {
                    match value.parse::<SubstitutionMode>() {
                        Ok(mode) => mode,
                        Err(err) => {
                            eprintln!("{}", err);
                            return Ok(false);
                        }
                    }
                };
                Command::Apply {
                    mode: Some(mode),
                    target: state.target.clone(),
                    policy: None,
                    no_merge: false,
                    no_fallback: false,
                }
            } else if let Some(arg) = trimmed.strip_prefix("/mode") {
                let value = arg.trim();
                if value.is_empty() {
                    println!("mode: {}", state.mode.as_str());
                } else {
                    match value.parse::<SubstitutionMode>() {
                        Ok(mode) => {
                            state.mode = mode;
                            println!("mode set to {}", mode.as_str());
                        }
                        Err(err) => eprintln!("{}", err),
                    }
                }
                return Ok(false);
            } else if let Some(arg) = trimmed.strip_prefix("/target") {
                let value = arg.trim();
                if value.is_empty() {
                    println!(
                        "target: {}",
                        state.target.as_deref().unwrap_or("(from settings)")
                    );
                } else if value == "clear" {
                    state.target = None;
                    println!("target cleared");
                } else {
                    state.target = Some(value.to_string());
                    println!("target set to {}", value);
                }
                return Ok(false);
            } else {
                eprintln!("unknown command: {}", trimmed);
                return Ok(false);
            }
        }
    };

    match bundle_localizer::run(state.config.clone(), command) {
        Ok(output) => {
            println!("{}", output.text);
            if !output.success {
                println!("(failed)");
            }
        }
        Err(err) => eprintln!("error: {:#}", err),
    }
    Ok(false)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /apply [direct|bilingual]    Patch the target");
    println!("  /restore                     Restore the target from its backup");
    println!("  /validate                    Validate the dictionary");
    println!("  /fix                         Validate and repair the dictionary");
    println!("  /merge                       Merge pending additions");
    println!("  /detect                      Write the untranslated report");
    println!("  /mode <direct|bilingual>     Set default mode (or show current)");
    println!("  /target <path|clear>         Set target file (or show current)");
}

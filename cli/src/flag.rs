use clap_lex::RawArgs;
use std::error::Error;
use std::path::PathBuf;

pub const USAGE: &str = "mcjs runs CommonJS scripts on an embedded QuickJS engine.\n\n\
USAGE:\n  \
  mcjs run <file> [args...]   Run a script as the main module\n  \
  mcjs eval <code> [args...]  Evaluate a script from the command line\n\n\
OPTIONS:\n  \
  --config <file>             Load environment settings from a JSON file\n  \
  -h, --help                  Print this help\n\n\
ENVIRONMENT:\n  \
  MCJS_LOG                    Log filter, e.g. `debug` or `mcjs_runtime=trace`";

#[derive(Debug, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub script_args: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Run { file_path: String },
    Eval { code: String },
    /// `requested` is false when no command was given at all
    Help { requested: bool },
}

pub fn parse_args(args: Vec<String>) -> Result<CliArgs, Box<dyn Error>> {
    let raw = RawArgs::new(args);
    let mut cursor = raw.cursor();
    raw.next(&mut cursor); // skip program name

    let mut config: Option<PathBuf> = None;
    let mut command: Option<Command> = None;

    while let Some(arg) = raw.next(&mut cursor) {
        if let Some((flag, inline)) = arg.to_long() {
            match flag {
                Ok("config") => {
                    let path = match inline {
                        Some(value) => Some(value),
                        None => raw.next_os(&mut cursor),
                    }
                    .ok_or("--config requires a file path")?;
                    config = Some(PathBuf::from(path));
                }
                Ok("help") => {
                    command = Some(Command::Help { requested: true });
                    break;
                }
                _ => {
                    return Err(format!("Unknown option '{}'", arg.display()).into());
                }
            }
            continue;
        }

        let value = arg
            .to_value()
            .map_err(|_| format!("Invalid UTF-8 in argument '{}'", arg.display()))?;
        match value {
            "-h" => {
                command = Some(Command::Help { requested: true });
                break;
            }
            "run" => {
                let file_path = next_value(&raw, &mut cursor)
                    .ok_or("A file path is required for the run command")?;
                command = Some(Command::Run { file_path });
                break;
            }
            "eval" => {
                let code = next_value(&raw, &mut cursor)
                    .ok_or("Code string is required for eval command")?;
                command = Some(Command::Eval { code });
                break;
            }
            _ if value.starts_with('-') => {
                return Err(format!("Unknown option '{value}'").into());
            }
            _ => {
                // A bare file path runs it
                command = Some(Command::Run {
                    file_path: value.to_string(),
                });
                break;
            }
        }
    }

    // Everything after the file path or code belongs to the script.
    // An exhausted cursor sits past the end, where `remaining` would panic.
    let script_args = if raw.is_end(&cursor) {
        Vec::new()
    } else {
        raw.remaining(&mut cursor)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    };

    Ok(CliArgs {
        command: command.unwrap_or(Command::Help { requested: false }),
        config,
        script_args,
    })
}

fn next_value(raw: &RawArgs, cursor: &mut clap_lex::ArgCursor) -> Option<String> {
    raw.next_os(cursor)
        .map(|value| value.to_string_lossy().into_owned())
}

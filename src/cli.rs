//! Minimal CLI: infer → (pydantic model | raw definitions)
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::infer::{Definition, Inference};
use crate::render;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer named model definitions from JSON and emit pydantic source or the raw definition list
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and emit a pydantic model module
    Pydantic(PydanticOut),
    /// infer and print the raw definition sequence as JSON
    Defs(DefsOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// synthetic key the root value is classified under (names the root type)
    #[arg(long, default_value = "data")]
    root_key: String,

    /// what to do when structurally divergent siblings share a key
    #[arg(long, value_enum, default_value_t = MergeMode::Ask)]
    merge: MergeMode,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum MergeMode {
    /// prompt on the terminal
    Ask,
    /// merge without asking
    Always,
    /// keep every shape as its own type
    Never,
}

#[derive(Args, Debug)]
struct PydanticOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .py file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DefsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        init_tracing();
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Pydantic(target) => {
                let modules = target
                    .input_settings
                    .infer_each()?
                    .into_iter()
                    .map(|defs| render::render_module(&defs))
                    .collect::<Vec<_>>();
                write_output(target.out.as_deref(), &modules.join("\n\n"))
            }
            Command::Defs(target) => {
                let runs = target.input_settings.infer_each()?;
                let json = serde_json::to_string_pretty(&runs)?;
                write_output(target.out.as_deref(), &json)
            }
        }
    }
}

impl InputSettings {
    /// Run one inference per input document, in input order.
    fn infer_each(&self) -> Result<Vec<Vec<Definition>>> {
        let mut confirm = self.confirm_fn();
        let mut runs = Vec::new();
        for path in resolve_file_path_patterns(&self.input)? {
            let value = load_json(&path)
                .with_context(|| format!("reading {}", display_input(&path)))?;
            let defs = Inference::new()
                .run(&value, &self.root_key, confirm.as_mut())
                .with_context(|| format!("inferring {}", display_input(&path)))?;
            runs.push(defs);
        }
        Ok(runs)
    }

    fn confirm_fn(&self) -> Box<dyn FnMut(&[Definition]) -> bool> {
        match self.merge {
            MergeMode::Ask => Box::new(console_confirm),
            MergeMode::Always => Box::new(|_| true),
            MergeMode::Never => Box::new(|_| false),
        }
    }
}

/// Show the candidate definitions on stderr and read a y/N answer.
fn console_confirm(candidates: &[Definition]) -> bool {
    eprintln!(
        "{}",
        "divergent structures found under the same key:".yellow().bold()
    );
    for candidate in candidates {
        eprintln!("{}", candidate.text().cyan());
    }
    eprint!("{}", "merge them into a single definition? [y/N] ".bold());
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn init_tracing() {
    // Ignore failure when a subscriber is already installed (tests).
    let _ = tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    );
}

fn display_input(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "<stdin>".to_string()
    } else {
        path.display().to_string()
    }
}

fn load_json(path: &Path) -> Result<serde_json::Value> {
    let source = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    parse_json_with_path(&source)
}

/// Deserialize with JSON-path context in error messages.
fn parse_json_with_path(src: &str) -> Result<serde_json::Value> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path}: {}", err.into_inner())
    })
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, content)?;
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // An explicit glob matching nothing is an input error.
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn literal_paths_pass_through_unchanged() {
        let paths = resolve_file_path_patterns(["a.json", "-"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("-")]);
    }

    #[test]
    fn unmatched_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        assert!(resolve_file_path_patterns([pattern]).is_err());
    }

    #[test]
    fn glob_pattern_expands_to_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let paths = resolve_file_path_patterns([pattern]).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn parse_error_carries_json_path() {
        let err = parse_json_with_path(r#"{"a": {"b": [1, }]}}"#).unwrap_err();
        assert!(err.to_string().contains("at JSON path"));
    }

    #[test]
    fn end_to_end_file_to_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"a": "x", "c": {{"ca": "y", "cb": ["z"]}}}}"#).unwrap();

        let settings = InputSettings {
            input: vec![file.path().display().to_string()],
            root_key: "data".to_string(),
            merge: MergeMode::Never,
        };
        let runs = settings.infer_each().unwrap();
        assert_eq!(runs.len(), 1);
        let module = render::render_module(&runs[0]);
        assert!(module.contains("class CType(BaseModel):"));
        assert!(module.contains("class DataType(BaseModel):"));
    }
}

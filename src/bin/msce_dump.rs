use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::{Confirm, Input};
use indoc::indoc;
use log::{Level, info};
use simplelog::{Config, WriteLogger};

use msce::{DecoderSettings, PlaceholderTable, SetupManifest};

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[path = "msce_dump/render.rs"]
mod render;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsceOutputFormat {
    Text,
    Json,
    JsonLines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Path(PathBuf),
    Stdin,
}

struct MsceDump {
    decoder_settings: DecoderSettings,
    input: InputSource,
    output_format: MsceOutputFormat,
    dos_names: bool,
    output: Box<dyn Write>,
    verbosity_level: Option<Level>,
}

impl MsceDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = match matches.get_one::<String>("INPUT") {
            Some(path) if path == "-" => InputSource::Stdin,
            Some(path) => InputSource::Path(PathBuf::from(path)),
            None => InputSource::Path(prompt_for_input_path()?),
        };

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("text")
        {
            "json" => MsceOutputFormat::Json,
            "jsonl" => MsceOutputFormat::JsonLines,
            _ => MsceOutputFormat::Text,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        let mut placeholders = PlaceholderTable::ce_directories();
        if let Some(install_dir) = matches.get_one::<String>("install-dir") {
            placeholders = placeholders.with_install_dir(install_dir.as_str());
        }

        let decoder_settings = DecoderSettings::new()
            .placeholders(placeholders)
            .allow_duplicate_ids(matches.get_flag("allow-duplicate-ids"))
            .parallel(cfg!(feature = "multithreading"));

        let output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(
                Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| {
                        format!("An error occurred while creating output file at `{path}`")
                    })?,
            ),
            None => Box::new(io::stdout()),
        };

        Ok(MsceDump {
            decoder_settings,
            input,
            output_format,
            dos_names: matches.get_flag("dos-names"),
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `MsceDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let data = self.read_input()?;
        info!("Read {} bytes of manifest data", data.len());

        let manifest = SetupManifest::parse_with_settings(&data, &self.decoder_settings)
            .with_context(|| format!("Failed to decode {}", self.input_name()))?;

        match self.output_format {
            MsceOutputFormat::Text => {
                render::write_text(&mut self.output, &manifest, self.dos_names)?
            }
            MsceOutputFormat::Json => render::write_json(&mut self.output, &manifest)?,
            MsceOutputFormat::JsonLines => render::write_json_lines(&mut self.output, &manifest)?,
        }

        self.output.flush().context("Failed to flush output")?;
        Ok(())
    }

    fn input_name(&self) -> String {
        match &self.input {
            InputSource::Path(path) => path.display().to_string(),
            InputSource::Stdin => "<stdin>".to_owned(),
        }
    }

    fn read_input(&self) -> Result<Vec<u8>> {
        match &self.input {
            InputSource::Path(path) => {
                fs::read(path).with_context(|| format!("Failed to open file {}", path.display()))
            }
            InputSource::Stdin => {
                let mut data = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut data)
                    .context("Failed to read manifest from stdin")?;
                Ok(data)
            }
        }
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                    .context("Failed to write confirmation prompt to term")?;

                if !confirmed {
                    bail!("Cancelled");
                }
            }
            return Ok(File::create(p)?);
        }

        // Ok to assume p is not an existing directory
        match p.parent() {
            Some(parent) => {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
                Ok(File::create(p)?)
            }
            None => bail!("Output file cannot be root."),
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            // Logs go to stderr so they never interleave with JSON written to stdout.
            if let Err(e) = WriteLogger::init(level.to_level_filter(), Config::default(), io::stderr())
            {
                eprintln!("Failed to initialize logging: {e}");
            }
        }
    }
}

fn prompt_for_input_path() -> Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Paste here the path to a \"*.000\" file")
        .interact_text()
        .context("I/O error while reading path from the terminal")?;

    Ok(PathBuf::from(path.trim().trim_matches('"')))
}

fn command() -> Command {
    Command::new("msce_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to dump Windows CE setup manifests (MSCE / *.000)")
        .arg(
            Arg::new("INPUT")
                .help("Path to the manifest. Pass `-` to read from stdin. Prompts for a path when omitted."),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json", "jsonl"])
                .default_value("text")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "text"  - human readable dump, one section after another.
                        "json"  - the whole manifest as one indented JSON document.
                        "jsonl" - one JSON object per record, tagged with its section.
                "#)),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("PATH")
                .help(indoc!("Writes output to the file specified instead of stdout, errors will still be printed to stderr.
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                       Will create parent directories if needed.")),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("install-dir")
                .long("install-dir")
                .value_name("DIR")
                .help("Expands `%CE0%` to DIR instead of the literal `InstallDir`."),
        )
        .arg(
            Arg::new("allow-duplicate-ids")
                .long("allow-duplicate-ids")
                .action(ArgAction::SetTrue)
                .help("When set, a repeated ID inside a section replaces the earlier record instead of failing."),
        )
        .arg(
            Arg::new("dos-names")
                .long("dos-names")
                .action(ArgAction::SetTrue)
                .help("Text output only: show FILES destinations as DOS 8.3 names."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!("-v - info, -vv - debug, -vvv - trace.
                       trace output is only available in debug builds, as it is extremely verbose")),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = MsceDump::from_cli_matches(&matches).and_then(|mut app| app.run());
    if let Err(e) = result {
        eprintln!("{e:?}");
        exit(1);
    }
}

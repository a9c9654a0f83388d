use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::Level;
use ned::err::NeError;
use ned::ne_output::{write_json, write_text};
use ned::{NameInfoPolicy, NeParser, ParserSettings, ResourceTableBase};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NeOutputFormat {
    Text,
    Json,
}

struct NeDump {
    parser_settings: ParserSettings,
    input: PathBuf,
    output_format: NeOutputFormat,
    no_indent: bool,
    output: Box<dyn Write>,
    verbosity_level: Option<Level>,
}

impl NeDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .expect("This is a required argument"),
        );

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("text")
        {
            "json" | "jsonl" => NeOutputFormat::Json,
            _ => NeOutputFormat::Text,
        };

        let no_indent = match (
            matches.get_flag("no-indent"),
            matches.get_one::<String>("output-format").map(String::as_str),
        ) {
            // "jsonl" --> --no-indent
            (false, Some(fmt)) => fmt == "jsonl",
            (true, Some("jsonl")) => {
                eprintln!("no need to pass both `--no-indent` and `-o jsonl`");
                true
            }
            (v, _) => v,
        };

        let resource_table_base = match matches
            .get_one::<String>("resource-table-base")
            .map(String::as_str)
        {
            Some("header") => ResourceTableBase::HeaderRelative,
            _ => ResourceTableBase::FileAbsolute,
        };

        let name_info = if matches.get_flag("skip-name-info") {
            NameInfoPolicy::Skip
        } else {
            NameInfoPolicy::Ignore
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than  -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        let output: Box<dyn Write> = if let Some(path) = matches.get_one::<String>("output-target")
        {
            Box::new(
                Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| {
                        format!("An error occurred while creating output file at `{path}`")
                    })?,
            )
        } else {
            Box::new(io::stdout())
        };

        Ok(NeDump {
            parser_settings: ParserSettings::new()
                .resource_table_base(resource_table_base)
                .name_info(name_info)
                .read_resources(!matches.get_flag("no-resources")),
            input,
            output_format,
            no_indent,
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `NeDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let mut parser = NeParser::from_path(&self.input)
            .with_context(|| format!("Failed to open file {}", self.input.display()))?
            .with_configuration(self.parser_settings.clone());

        let exe = parser.parse();
        if !exe.is_ready() {
            bail!("Failed to read file: {}", exe.last_error());
        }

        let rendered = match self.output_format {
            NeOutputFormat::Text => write_text(&exe, &mut self.output),
            NeOutputFormat::Json => write_json(&exe, &mut self.output, !self.no_indent),
        };

        match rendered {
            Ok(()) => {}
            // Closed pipe (e.g. `| head`), nothing left to do.
            Err(NeError::FailedToWriteOutput { source })
                if source.kind() == io::ErrorKind::BrokenPipe =>
            {
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to write output"),
        }

        self.output.flush().context("Failed to flush output")
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
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => Err(format_err!(
                        "Failed to write confirmation prompt to term caused by\n{e}"
                    )),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
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
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level.to_level_filter(),
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e:?}");
            }
        }
    }
}

fn command() -> Command {
    Command::new("NE Dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to inspect 16-bit New Executable (NE) headers and resource directories")
        .arg(Arg::new("INPUT").required(true).help("Path to an NE executable (EXE/DLL/DRV/FON)."))
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json", "jsonl"])
                .default_value("text")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "text"  - prints a human readable summary.
                        "json"  - prints a JSON document.
                        "jsonl" - same as json with --no-indent.
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
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("When set, JSON output will not be indented."),
        )
        .arg(
            Arg::new("resource-table-base")
                .long("resource-table-base")
                .value_parser(["absolute", "header"])
                .default_value("absolute")
                .help("Whether the resource table offset is measured from the start of the file or from the NE header."),
        )
        .arg(
            Arg::new("skip-name-info")
                .long("skip-name-info")
                .action(ArgAction::SetTrue)
                .help("Seek past the name-info records following each resource type instead of reading the next type right after its metadata."),
        )
        .arg(
            Arg::new("no-resources")
                .long("no-resources")
                .action(ArgAction::SetTrue)
                .help("Only decode the NE header."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!("Sets debug prints level for the application:
                    -v   - info
                    -vv  - debug
                    -vvv - trace
                    NOTE: trace output is only available in debug builds, as it is extremely verbose.")),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = NeDump::from_cli_matches(&matches).and_then(|mut app| app.run());
    if let Err(e) = result {
        eprintln!("ned: {e:#}");
        exit(1);
    }
}

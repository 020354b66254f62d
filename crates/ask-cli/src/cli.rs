use std::path::PathBuf;

use session_core::source::SourceKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceArg {
    File { kind: SourceKind, path: PathBuf },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Video { url: String },
    Document { source: SourceArg },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub command: Command,
    /// Questions from `--question`; when empty, questions are read from stdin.
    pub questions: Vec<String>,
    pub transcript_out: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing subcommand (expected `video` or `document`)")]
    MissingCommand,
    #[error("unknown subcommand: {0}")]
    UnknownCommand(String),
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("{0} needs a non-blank question")]
    BlankQuestion(String),
    #[error("video requires --url")]
    MissingUrl,
    #[error("document requires exactly one of --pdf, --txt, --file or --text")]
    SourceCount,
    #[error("cannot infer a pdf or txt upload from file name: {0}")]
    UnsupportedFile(String),
    #[error("{0} is only supported by the document command")]
    DocumentOnly(&'static str),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = args.into_iter();
        let command_name = match iter.next() {
            Some(arg) if matches!(arg.as_str(), "--help" | "-h") => {
                return Err(CliError::HelpRequested);
            }
            Some(arg) => arg,
            None => return Err(CliError::MissingCommand),
        };
        let is_document = match command_name.as_str() {
            "video" => false,
            "document" => true,
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };

        let mut url = None;
        let mut sources = Vec::new();
        let mut questions = Vec::new();
        let mut transcript_out = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--url" if !is_document => url = Some(required_value(&mut iter, &arg)?),
                "--question" | "-q" => {
                    let question = required_value(&mut iter, &arg)?;
                    if question.trim().is_empty() {
                        return Err(CliError::BlankQuestion(arg));
                    }
                    questions.push(question);
                }
                "--pdf" if is_document => sources.push(SourceArg::File {
                    kind: SourceKind::Pdf,
                    path: PathBuf::from(required_value(&mut iter, &arg)?),
                }),
                "--txt" if is_document => sources.push(SourceArg::File {
                    kind: SourceKind::Txt,
                    path: PathBuf::from(required_value(&mut iter, &arg)?),
                }),
                "--file" if is_document => {
                    let path = PathBuf::from(required_value(&mut iter, &arg)?);
                    let kind = SourceKind::from_path(&path)
                        .ok_or_else(|| CliError::UnsupportedFile(path.display().to_string()))?;
                    sources.push(SourceArg::File { kind, path });
                }
                "--text" if is_document => {
                    sources.push(SourceArg::Text(required_value(&mut iter, &arg)?));
                }
                "--transcript-out" if is_document => {
                    transcript_out = Some(PathBuf::from(required_value(&mut iter, &arg)?));
                }
                "--transcript-out" => return Err(CliError::DocumentOnly("--transcript-out")),
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        let command = if is_document {
            if sources.len() != 1 {
                return Err(CliError::SourceCount);
            }
            Command::Document {
                source: sources.remove(0),
            }
        } else {
            Command::Video {
                url: url.ok_or(CliError::MissingUrl)?,
            }
        };

        Ok(Self {
            command,
            questions,
            transcript_out,
        })
    }
}

fn required_value<I>(iter: &mut I, arg: &str) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    iter.next()
        .ok_or_else(|| CliError::MissingValue(arg.to_string()))
}

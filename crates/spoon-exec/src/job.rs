//! Plain descriptions of what to run, filled in by the binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use spoon_core::spec::{ColFormatDirective, ColTypeDirective, FileSpec};

/// Code evaluated once before any formula is compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preamble {
    /// Make `np` available (`import numpy as np`).
    pub numpy: bool,
    /// `--before` snippets, run in order.
    pub before: Vec<String>,
}

/// A new column: its spec (name plus optional output format) and formula.
pub type NewColumn = (ColFormatDirective, String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Cat {
        inputs: Vec<FileSpec>,
    },
    Apply {
        input: Option<FileSpec>,
        columns: Vec<NewColumn>,
    },
    Filter {
        input: Option<FileSpec>,
        formulas: Vec<String>,
    },
    Sort {
        input: Option<FileSpec>,
        keys: Vec<String>,
        numeric: bool,
        reverse: bool,
        random: bool,
    },
    Join {
        inputs: Vec<FileSpec>,
        left: bool,
        right: bool,
        empty: bool,
    },
    Aggregate {
        input: Option<FileSpec>,
        keys: Vec<String>,
        columns: Vec<NewColumn>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Cat { .. } => "cat",
            Command::Apply { .. } => "apply",
            Command::Filter { .. } => "filter",
            Command::Sort { .. } => "sort",
            Command::Join { .. } => "join",
            Command::Aggregate { .. } => "aggregate",
        }
    }

    /// The sources to open, with stdin filled in where none was given.
    /// `cat` without inputs reads stdin; `join` with fewer than two inputs
    /// joins stdin with them.
    pub fn inputs(&self) -> Vec<FileSpec> {
        match self {
            Command::Cat { inputs } if inputs.is_empty() => vec![FileSpec::stdin()],
            Command::Cat { inputs } => inputs.clone(),
            Command::Join { inputs, .. } if inputs.len() < 2 => {
                std::iter::once(FileSpec::stdin())
                    .chain(inputs.iter().cloned())
                    .collect()
            }
            Command::Join { inputs, .. } => inputs.clone(),
            Command::Apply { input, .. }
            | Command::Filter { input, .. }
            | Command::Sort { input, .. }
            | Command::Aggregate { input, .. } => {
                vec![input.clone().unwrap_or_else(FileSpec::stdin)]
            }
        }
    }

    /// New columns whose spec may carry an output format.
    pub fn new_columns(&self) -> &[NewColumn] {
        match self {
            Command::Apply { columns, .. } | Command::Aggregate { columns, .. } => columns,
            _ => &[],
        }
    }
}

/// One invocation: a command plus everything shared by all commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub command: Command,
    /// Type coercions registered on every input before the operation.
    pub types: Vec<ColTypeDirective>,
    /// `-f` output formats.
    pub formats: Vec<ColFormatDirective>,
    /// Destination file; stdout when absent.
    pub output: Option<PathBuf>,
}

impl Job {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            types: Vec::new(),
            formats: Vec::new(),
            output: None,
        }
    }

    /// Output formats in application order: new-column formats last
    /// declared first, then the `-f` ones. Columns declared without a
    /// format contribute nothing.
    pub fn output_formats(&self) -> Vec<&ColFormatDirective> {
        self.command
            .new_columns()
            .iter()
            .rev()
            .map(|(spec, _)| spec)
            .filter(|spec| !spec.format.is_empty())
            .chain(self.formats.iter())
            .collect()
    }
}

//! Argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use spoon_core::config::parse_delimiter;
use spoon_core::prelude::*;
use spoon_exec::{Command, Job, Preamble};

const CAT_EXAMPLES: &str = "\
Examples:
  Change delimiter of a csv file:
    spoon cat -d \"\\t\" -u \";\" file.csv > result.csv

  Change delimiter of a csv file with specified output:
    spoon cat -o result.csv -d \"\\t\" -u \";\" file.csv

  Cat two csv files:
    spoon cat file1.csv file2.csv

  Reformat two columns of a csv files:
    spoon cat -f a_colname:5.1f -f another_colname:04d file.csv

  Cat one csv file, keeping only a column:
    spoon cat file.csv:a_col

  Cat two csv files, renaming a column on the second file:
    spoon cat file1.csv file2.csv:new_col=old_col,another_col";

const APPLY_EXAMPLES: &str = "\
Examples:
  Combine text columns by a formula:
    spoon apply -a name \"lastname.upper()+' '+firstname.lower()\" file.csv

  Sum to integer columns:
    spoon apply -t cola:int -t colb:int -a colsum \"cola+colb\" file.csv

  Sum to integer columns and format the result:
    spoon apply -t cola:int -t colb:int -a colsum:05d \"cola+colb\" file.csv

  Compute complex expression between columns:
    spoon apply -b \"import math\" -t x:float -t y:float \\
                -a norm \"math.sqrt(x**2+y**2)\" file.csv

  Multiple computation can be done reusing newly created columns:
    spoon apply -t x:int -a x2p1 \"x**2+1\" -a x2p1m1 \"x2p1-1\" file.csv";

const FILTER_EXAMPLES: &str = "\
Examples:
  Filter csv file using two columns:
    spoon filter -a \"lastname!=firstname\" file.csv

  Chain filters on csv file:
    spoon filter -a \"lastname.startswith('Doe')\" -a \"firstname.startswith('John')\" file.csv

  Filter csv file with float column price:
    spoon filter -t price:float -a \"price>12.5\" file.csv

  Filter csv file with complex expression:
    spoon filter -b \"import math\" -t x:float -t y:float -t z:float \\
                 -a \"math.sqrt(x**2+y**2)>z\" file.csv";

const SORT_EXAMPLES: &str = "\
Examples:
  Sort csv file using column cola:
    spoon sort -k cola file.csv

  Sort csv file using columns cola and colb:
    spoon sort -k cola -k colb file.csv

  Sort csv file using numerical mode on column numcol:
    spoon sort -n -k numcol file.csv

  Shuffle csv file:
    spoon sort -R file.csv";

const JOIN_EXAMPLES: &str = "\
Examples:
  Operate NATURAL JOIN on two csv files:
    spoon join file1.csv file2.csv

  Operate two NATURAL JOIN on three csv files:
    spoon join file1.csv file2.csv file3.csv

  Operate LEFT JOIN on two csv files:
    spoon join -l file1.csv file2.csv

  Operate RIGHT JOIN on two csv files:
    spoon join -r file1.csv file2.csv

  Operate OUTER JOIN on two csv files:
    spoon join -lr file1.csv file2.csv";

const AGGREGATE_EXAMPLES: &str = "\
Examples:
  Keeping unique lines, one line per group:
    spoon aggregate -k group file.csv

  Computing the total mean grade:
    spoon aggregate --np -t grade:float -a meangrade \"np.mean(grade)\" file.csv

  Computing the total mean grade specifing a format:
    spoon aggregate --np -t grade:float -a meangrade:.2f \"np.mean(grade)\" file.csv

  Computing the mean grade by group:
    spoon aggregate --np -t grade:float -a meangrade \"np.mean(grade)\" -k group file.csv

  Computing the mean grade, median, standard deviation by group:
    spoon aggregate --np -t grade:float \\
                    -a meangrade \"np.mean(grade)\" \\
                    -a mediangrade \"np.median(grade)\" \\
                    -a stdgrade \"np.std(grade)\" \\
                    -k group file.csv";

#[derive(Parser, Debug)]
#[command(name = "spoon")]
#[command(version, about = "A tool to manipulate csv files with headers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options every subcommand accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Input delimiter (default: ',')
    #[arg(short = 'd', long = "delim", value_parser = parse_delimiter)]
    pub delim: Option<u8>,

    /// Output file, else output on stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Output delimiter (default: ',')
    #[arg(short = 'u', long = "output-delim", value_parser = parse_delimiter)]
    pub output_delim: Option<u8>,

    /// Apply a format on a column on output. The argument must be a column
    /// name followed by a colon and a format specifier, e.g. "a_colname:5d"
    /// or "a_colname:+.2f". Can be given several times.
    #[arg(short = 'f', long = "format", value_name = "COL:FMT", value_parser = ColFormatDirective::parse)]
    pub format: Vec<ColFormatDirective>,
}

/// Options of the subcommands that evaluate formulas.
#[derive(Args, Debug, Clone)]
pub struct TypedArgs {
    /// Run the following code before evaluating any expression: imports,
    /// constants and `def` functions. Can be given several times.
    #[arg(short = 'b', long = "before", value_name = "CODE")]
    pub before: Vec<String>,

    /// Shortcut to `--before "import numpy as np"`
    #[arg(long = "np")]
    pub numpy: bool,

    /// Apply a type conversion on a column prior to expressions, e.g.
    /// "a_column:int" or "a_column:float". See "--before" to define non
    /// standard types. Can be given several times.
    #[arg(short = 't', long = "type", value_name = "COL:TYPE", value_parser = ColTypeDirective::parse)]
    pub types: Vec<ColTypeDirective>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Concatenate csv files
    #[command(after_help = CAT_EXAMPLES)]
    Cat {
        #[command(flatten)]
        common: CommonArgs,

        /// Input files, optionally followed by ":col1,new=old,..." to keep
        /// and rename columns. Stdin when none is given; "-" names stdin.
        #[arg(value_name = "INPUT", value_parser = FileSpec::parse)]
        inputs: Vec<FileSpec>,
    },

    /// Apply a formula to compute a new column
    #[command(after_help = APPLY_EXAMPLES)]
    Apply {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        typed: TypedArgs,

        /// Append a new column (or update an existing one). COLSPEC is the
        /// column name, optionally followed by ":" and a format specifier.
        /// Columns created earlier are visible to later formulas.
        #[arg(short = 'a', long = "add", visible_alias = "add-column", num_args = 2, allow_hyphen_values = true, value_names = ["COLSPEC", "FORMULA"])]
        add: Vec<String>,

        /// Input file specification (stdin when absent)
        #[arg(value_name = "INPUT", value_parser = FileSpec::parse)]
        input: Option<FileSpec>,
    },

    /// Filter a csv with formulas
    #[command(after_help = FILTER_EXAMPLES)]
    Filter {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        typed: TypedArgs,

        /// Keep the rows on which the formula is true. Can be given several
        /// times; a row must pass every formula.
        #[arg(short = 'a', long = "add", visible_alias = "add-filter", allow_hyphen_values = true, value_name = "FILTER_FORMULA")]
        add: Vec<String>,

        /// Input file specification (stdin when absent)
        #[arg(value_name = "INPUT", value_parser = FileSpec::parse)]
        input: Option<FileSpec>,
    },

    /// Sort csv files
    #[command(after_help = SORT_EXAMPLES)]
    Sort {
        #[command(flatten)]
        common: CommonArgs,

        /// Column used for sorting. Can be given several times.
        #[arg(short = 'k', long = "key")]
        keys: Vec<String>,

        /// Compare according to numerical value
        #[arg(short = 'n', long = "numeric-sort")]
        numeric: bool,

        /// Reverse the result of comparisons
        #[arg(short = 'r', long)]
        reverse: bool,

        /// Shuffle; rows with equal keys stay together
        #[arg(short = 'R', long = "random-sort")]
        random: bool,

        /// Seed for --random-sort (overrides SPOON_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Input file specification (stdin when absent)
        #[arg(value_name = "INPUT", value_parser = FileSpec::parse)]
        input: Option<FileSpec>,
    },

    /// Operate join on csv files
    #[command(after_help = JOIN_EXAMPLES)]
    Join {
        #[command(flatten)]
        common: CommonArgs,

        /// Left join: keep every row of the left file
        #[arg(short = 'l', long)]
        left: bool,

        /// Right join: keep every row of the right file
        #[arg(short = 'r', long)]
        right: bool,

        /// Let rows whose join columns are all empty match each other
        #[arg(short = 'e', long)]
        empty: bool,

        /// Input files; stdin is joined first when only one is given
        #[arg(value_name = "INPUT", required = true, num_args = 1.., value_parser = FileSpec::parse)]
        inputs: Vec<FileSpec>,
    },

    /// Apply aggregation formulas to compute new columns
    #[command(after_help = AGGREGATE_EXAMPLES)]
    Aggregate {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        typed: TypedArgs,

        /// Append an aggregated column. Every column is bound to the list of
        /// its values in the group.
        #[arg(short = 'a', long = "add", visible_alias = "add-aggregation", num_args = 2, allow_hyphen_values = true, value_names = ["COLSPEC", "FORMULA"])]
        add: Vec<String>,

        /// Column used for grouping. Can be given several times.
        #[arg(short = 'k', long = "key")]
        keys: Vec<String>,

        /// Input file specification (stdin when absent)
        #[arg(value_name = "INPUT", value_parser = FileSpec::parse)]
        input: Option<FileSpec>,
    },
}

/// Everything `main` needs to run one invocation.
#[derive(Debug)]
pub struct Invocation {
    pub config: SpoonConfig,
    pub preamble: Preamble,
    pub job: Job,
}

fn new_columns(add: &[String]) -> Result<Vec<(ColFormatDirective, String)>> {
    add.chunks(2)
        .map(|pair| match pair {
            [colspec, formula] => Ok((ColFormatDirective::parse_new_column(colspec)?, formula.clone())),
            _ => Err(Error::spec("--add expects COLSPEC and FORMULA")),
        })
        .collect()
}

impl Commands {
    /// Merge the flags over `config` and describe the job.
    pub fn into_invocation(self, mut config: SpoonConfig) -> Result<Invocation> {
        let (common, typed, command) = match self {
            Commands::Cat { common, inputs } => (common, None, Command::Cat { inputs }),
            Commands::Apply { common, typed, add, input } => {
                let columns = new_columns(&add)?;
                (common, Some(typed), Command::Apply { input, columns })
            }
            Commands::Filter { common, typed, add, input } => (
                common,
                Some(typed),
                Command::Filter {
                    input,
                    formulas: add,
                },
            ),
            Commands::Sort {
                common,
                keys,
                numeric,
                reverse,
                random,
                seed,
                input,
            } => {
                if seed.is_some() {
                    config.seed = seed;
                }
                (
                    common,
                    None,
                    Command::Sort {
                        input,
                        keys,
                        numeric,
                        reverse,
                        random,
                    },
                )
            }
            Commands::Join {
                common,
                left,
                right,
                empty,
                inputs,
            } => (
                common,
                None,
                Command::Join {
                    inputs,
                    left,
                    right,
                    empty,
                },
            ),
            Commands::Aggregate {
                common,
                typed,
                add,
                keys,
                input,
            } => {
                let columns = new_columns(&add)?;
                (common, Some(typed), Command::Aggregate { input, keys, columns })
            }
        };

        if let Some(d) = common.delim {
            config.delimiter = d;
        }
        if let Some(d) = common.output_delim {
            config.output_delimiter = d;
        }
        let (preamble, types) = match typed {
            Some(t) => (
                Preamble {
                    numpy: t.numpy,
                    before: t.before,
                },
                t.types,
            ),
            None => (Preamble::default(), Vec::new()),
        };
        let job = Job {
            command,
            types,
            formats: common.format,
            output: common.output,
        };
        Ok(Invocation {
            config,
            preamble,
            job,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(args: &[&str]) -> Invocation {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.command.into_invocation(SpoonConfig::default()).unwrap()
    }

    #[test]
    fn apply_pairs_colspecs_with_formulas() {
        let inv = invocation(&[
            "spoon", "apply", "-t", "a:int", "-a", "c:05d", "a+1", "-a", "d", "c*2", "in.csv",
        ]);
        match &inv.job.command {
            Command::Apply { input, columns } => {
                assert_eq!(input.as_ref().unwrap().filename, "in.csv");
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].0.column, "c");
                assert_eq!(columns[0].0.format, "05d");
                assert_eq!(columns[1].1, "c*2");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(inv.job.types[0].type_expr, "int");
    }

    #[test]
    fn delimiters_and_seed_override_config() {
        let inv = invocation(&["spoon", "sort", "-d", "\\t", "-u", ";", "--seed", "9", "-R"]);
        assert_eq!(inv.config.delimiter, b'\t');
        assert_eq!(inv.config.output_delimiter, b';');
        assert_eq!(inv.config.seed, Some(9));
    }

    #[test]
    fn join_flags_combine() {
        let inv = invocation(&["spoon", "join", "-lr", "a.csv", "b.csv:k,x=y"]);
        match inv.job.command {
            Command::Join { inputs, left, right, empty } => {
                assert!(left && right && !empty);
                assert_eq!(inputs.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_directives_are_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["spoon", "cat", "-f", "nocolon"]).is_err());
        assert!(Cli::try_parse_from(["spoon", "cat", "-d", "ab"]).is_err());
        assert!(Cli::try_parse_from(["spoon", "join"]).is_err());
        assert!(Cli::try_parse_from(["spoon", "apply", "-a", "only_one"]).is_err());
    }

    #[test]
    fn formulas_may_start_with_a_minus() {
        let inv = invocation(&["spoon", "apply", "-a", "neg", "-x", "-a", "y", "x", "in.csv"]);
        match &inv.job.command {
            Command::Apply { columns, input } => {
                assert_eq!(columns[0].1, "-x");
                assert_eq!(columns[1].0.column, "y");
                assert_eq!(input.as_ref().unwrap().filename, "in.csv");
            }
            other => panic!("unexpected command {other:?}"),
        }

        let inv = invocation(&["spoon", "filter", "-a", "-x < 0"]);
        assert!(matches!(inv.job.command, Command::Filter { ref formulas, .. } if formulas == &["-x < 0"]));

        let inv = invocation(&["spoon", "aggregate", "-k", "g", "-a", "m", "-max(v)"]);
        assert!(matches!(inv.job.command, Command::Aggregate { ref columns, .. } if columns[0].1 == "-max(v)"));
    }

    #[test]
    fn scipy_shortcut_is_not_offered() {
        assert!(Cli::try_parse_from(["spoon", "apply", "--sp", "-a", "c", "1"]).is_err());
    }

    #[test]
    fn filter_collects_every_formula() {
        let inv = invocation(&["spoon", "filter", "--np", "-b", "X = 1", "-a", "a>1", "-a", "b<2"]);
        assert!(inv.preamble.numpy);
        assert_eq!(inv.preamble.before, vec!["X = 1"]);
        match inv.job.command {
            Command::Filter { formulas, input } => {
                assert_eq!(formulas, vec!["a>1", "b<2"]);
                assert!(input.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

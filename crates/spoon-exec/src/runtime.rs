//! Runtime: resolve a `Job` against the formula context and run it.
//!
//! Everything that can be rejected without rows (directive syntax, formula
//! syntax, type names, key columns) is rejected before the sink writes its
//! header.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use spoon_core::config::SpoonConfig;
use spoon_core::spec::FileSpec;
use spoon_expr::{Context, ContextBuilder, ExprError};
use spoon_io::{CsvSink, CsvSource};
use spoon_operators::{
    join_all, Aggregate, ColumnFormat, HashJoin, OpError, Operator, RowStream, Sort,
};

use crate::job::{Command, Job, Preamble};
use crate::metrics::emit_span;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Core(#[from] spoon_core::Error),

    #[error(transparent)]
    Formula(#[from] ExprError),

    #[error(transparent)]
    Op(#[from] OpError),

    #[error(transparent)]
    Io(#[from] spoon_io::Error),
}

impl ExecError {
    /// The output consumer went away; nothing left to report.
    pub fn is_downstream_closed(&self) -> bool {
        matches!(self, ExecError::Io(e) if e.is_downstream_closed())
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub command: &'static str,
    pub inputs: usize,
    pub rows_written: u64,
}

/// Engine owns the run configuration and the immutable formula context.
pub struct Engine {
    config: SpoonConfig,
    ctx: Arc<Context>,
}

impl Engine {
    /// Run the preamble and freeze the resulting context.
    pub fn new(config: SpoonConfig, preamble: &Preamble) -> Result<Self> {
        let mut builder = ContextBuilder::new();
        if preamble.numpy {
            builder.import_numpy();
        }
        for code in &preamble.before {
            builder.run(code)?;
        }
        Ok(Self {
            config,
            ctx: builder.build(),
        })
    }

    pub fn config(&self) -> &SpoonConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Open one source with the configured delimiter.
    pub fn open(&self, spec: &FileSpec) -> Result<RowStream> {
        Ok(CsvSource::new(spec.clone(), &self.config).open()?)
    }

    /// Open the job's sources and write its result to the job's output.
    pub fn run(&self, job: &Job) -> Result<RunSummary> {
        let formats = self.output_formats(job)?;
        let inputs = job
            .command
            .inputs()
            .iter()
            .map(|spec| self.open(spec))
            .collect::<Result<Vec<_>>>()?;
        let stream = self.pipeline(job, inputs)?;
        let mut sink = CsvSink::create(job.output.as_deref(), &self.config)?.with_formats(formats);
        self.drain(job, stream, &mut sink)
    }

    /// Like `run`, over already opened inputs and an arbitrary writer.
    pub fn run_with<W: Write>(
        &self,
        job: &Job,
        inputs: Vec<RowStream>,
        writer: W,
    ) -> Result<(RunSummary, W)> {
        let formats = self.output_formats(job)?;
        let stream = self.pipeline(job, inputs)?;
        let mut sink = CsvSink::from_writer(writer, self.config.output_delimiter).with_formats(formats);
        let summary = self.drain(job, stream, &mut sink)?;
        Ok((summary, sink.into_inner()?))
    }

    fn drain<W: Write>(&self, job: &Job, mut stream: RowStream, sink: &mut CsvSink<W>) -> Result<RunSummary> {
        let started = Instant::now();
        let rows_written = sink.write_stream(&mut stream)?;
        let summary = RunSummary {
            command: job.command.name(),
            inputs: job.command.inputs().len(),
            rows_written,
        };
        emit_span(
            "run",
            &[
                ("command", summary.command.to_string()),
                ("rows", rows_written.to_string()),
                ("elapsed_ms", started.elapsed().as_millis().to_string()),
            ],
        );
        Ok(summary)
    }

    fn output_formats(&self, job: &Job) -> Result<Vec<ColumnFormat>> {
        Ok(job
            .output_formats()
            .into_iter()
            .map(ColumnFormat::from_directive)
            .collect::<spoon_core::Result<Vec<_>>>()?)
    }

    /// Register types on every input, then wire the job's operation.
    pub fn pipeline(&self, job: &Job, mut inputs: Vec<RowStream>) -> Result<RowStream> {
        info!(command = job.command.name(), inputs = inputs.len(), "building pipeline");
        for directive in &job.types {
            let binding = Arc::new(self.ctx.resolve_type(&directive.type_expr)?);
            for input in &mut inputs {
                input.add_type(directive.column.clone(), binding.clone());
            }
        }

        let stream = match &job.command {
            Command::Cat { .. } => {
                let mut inputs = inputs.into_iter();
                let first = inputs
                    .next()
                    .ok_or_else(|| OpError::Plan("cat needs at least one input".into()))?;
                inputs.try_fold(first, |acc, next| acc.concat(next))?
            }
            Command::Apply { columns, .. } => {
                let mut input = single(inputs)?;
                for (colspec, formula) in columns {
                    let formula = self.ctx.compile(formula)?;
                    input.add_apply(colspec.column.clone(), Arc::new(formula));
                }
                input
            }
            Command::Filter { formulas, .. } => {
                let mut input = single(inputs)?;
                for formula in formulas {
                    input.add_filter(Arc::new(self.ctx.compile(formula)?));
                }
                input
            }
            Command::Sort {
                keys,
                numeric,
                reverse,
                random,
                ..
            } => {
                let sort = Sort {
                    keys: keys.clone(),
                    numeric: *numeric,
                    reverse: *reverse,
                    random: *random,
                    seed: self.config.seed,
                };
                let input = single(inputs)?;
                log_plan(&sort, &input)?;
                input.sort(&sort)?
            }
            Command::Join {
                left, right, empty, ..
            } => {
                let join = HashJoin {
                    left_outer: *left,
                    right_outer: *right,
                    empty_as_value: *empty,
                };
                debug!(footprint = ?join.memory_need(), "join");
                join_all(inputs, &join)?
            }
            Command::Aggregate { keys, columns, .. } => {
                let mut aggregate = Aggregate::new(keys.clone());
                for (colspec, formula) in columns {
                    let formula = self.ctx.compile(formula)?;
                    aggregate = aggregate.with_aggregation(colspec.column.clone(), Arc::new(formula));
                }
                let input = single(inputs)?;
                log_plan(&aggregate, &input)?;
                input.aggregate(&aggregate)?
            }
        };
        debug!(schema = %stream.schema(), origin = stream.origin(), "pipeline ready");
        Ok(stream)
    }
}

fn single(inputs: Vec<RowStream>) -> std::result::Result<RowStream, OpError> {
    let n = inputs.len();
    let mut inputs = inputs.into_iter();
    match (inputs.next(), n) {
        (Some(input), 1) => Ok(input),
        _ => Err(OpError::Plan(format!("expected exactly one input, got {n}"))),
    }
}

fn log_plan(op: &dyn Operator, input: &RowStream) -> std::result::Result<(), OpError> {
    let plan = op
        .plan(std::slice::from_ref(input.schema()))
        .map_err(|e| e.in_source(input.origin()))?;
    debug!(
        op = op.name(),
        output = %plan.output_schema,
        footprint = ?plan.footprint,
        materializes = plan.footprint.materializes(),
        "planned"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use spoon_core::spec::{ColFormatDirective, ColTypeDirective};
    use spoon_core::{Row, Schema};

    use super::*;

    fn csv(text: &str) -> RowStream {
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().unwrap_or("").split(',').collect();
        let schema = Schema::new(header.iter().copied());
        let rows = lines
            .map(|l| {
                header
                    .iter()
                    .zip(l.split(','))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<Row>()
            })
            .collect();
        RowStream::from_rows(schema, rows)
    }

    fn run(engine: &Engine, job: &Job, inputs: Vec<RowStream>) -> Result<String> {
        let (_, out) = engine.run_with(job, inputs, Vec::new())?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn engine() -> Engine {
        Engine::new(SpoonConfig::default(), &Preamble::default()).unwrap()
    }

    fn new_column(spec: &str, formula: &str) -> (ColFormatDirective, String) {
        (ColFormatDirective::parse_new_column(spec).unwrap(), formula.to_string())
    }

    #[test]
    fn typed_apply_sums_columns() {
        let mut job = Job::new(Command::Apply {
            input: None,
            columns: vec![new_column("c", "a+b")],
        });
        job.types = vec![
            ColTypeDirective::parse("a:int").unwrap(),
            ColTypeDirective::parse("b:int").unwrap(),
        ];
        let out = run(&engine(), &job, vec![csv("a,b\n1,2\n3,4")]).unwrap();
        assert_eq!(out, "a,b,c\r\n1,2,3\r\n3,4,7\r\n");
    }

    #[test]
    fn new_column_format_applies_on_output() {
        let mut job = Job::new(Command::Apply {
            input: None,
            columns: vec![new_column("s:05d", "int(a)*2")],
        });
        job.formats = vec![ColFormatDirective::parse("a:.1f").unwrap()];
        let out = run(&engine(), &job, vec![csv("a\n21")]).unwrap();
        assert_eq!(out, "a,s\r\n21.0,00042\r\n");
    }

    #[test]
    fn filter_keeps_rows_passing_every_formula() {
        let job = Job::new(Command::Filter {
            input: None,
            formulas: vec!["x != 'b'".into(), "len(x) == 1".into()],
        });
        let out = run(&engine(), &job, vec![csv("x\na\nb\ncc\nd")]).unwrap();
        assert_eq!(out, "x\r\na\r\nd\r\n");
    }

    #[test]
    fn preamble_defines_types_and_functions() {
        let preamble = Preamble {
            numpy: true,
            before: vec!["def half(v): float(v) / 2".into(), "OFFSET = 10".into()],
        };
        let engine = Engine::new(SpoonConfig::default(), &preamble).unwrap();
        let mut job = Job::new(Command::Aggregate {
            input: None,
            keys: vec!["g".into()],
            columns: vec![new_column("m:.2f", "np.mean(v) + OFFSET")],
        });
        job.types = vec![ColTypeDirective::parse("v:half").unwrap()];
        let out = run(&engine, &job, vec![csv("g,v\nx,1\nx,2\ny,4")]).unwrap();
        assert_eq!(out, "g,m\r\nx,10.75\r\ny,12.00\r\n");
    }

    #[test]
    fn join_and_cat_fold_left_to_right() {
        let e = engine();
        let join = Job::new(Command::Join {
            inputs: vec![],
            left: true,
            right: false,
            empty: false,
        });
        let out = run(&e, &join, vec![csv("k,a\n1,x\n2,y"), csv("k,b\n1,p")]).unwrap();
        assert_eq!(out, "k,a,b\r\n1,x,p\r\n2,y,\r\n");

        let cat = Job::new(Command::Cat { inputs: vec![] });
        let out = run(&e, &cat, vec![csv("a\n1"), csv("b\n2")]).unwrap();
        assert_eq!(out, "a,b\r\n1,\r\n,2\r\n");
    }

    #[test]
    fn sort_with_seeded_config() {
        let config = SpoonConfig {
            seed: Some(7),
            ..SpoonConfig::default()
        };
        let e = Engine::new(config, &Preamble::default()).unwrap();
        let job = Job::new(Command::Sort {
            input: None,
            keys: vec!["n".into()],
            numeric: true,
            reverse: true,
            random: false,
        });
        let out = run(&e, &job, vec![csv("n\n2\n10\n9")]).unwrap();
        assert_eq!(out, "n\r\n10\r\n9\r\n2\r\n");
    }

    #[test]
    fn errors_surface_before_output() {
        let e = engine();
        let bad_type = Job {
            types: vec![ColTypeDirective::parse("a:nosuchtype").unwrap()],
            ..Job::new(Command::Cat { inputs: vec![] })
        };
        assert!(matches!(
            run(&e, &bad_type, vec![csv("a\n1")]),
            Err(ExecError::Formula(_))
        ));

        let bad_key = Job::new(Command::Sort {
            input: None,
            keys: vec!["zz".into()],
            numeric: false,
            reverse: false,
            random: false,
        });
        let err = run(&e, &bad_key, vec![csv("a\n1")]).unwrap_err();
        assert!(matches!(err, ExecError::Op(OpError::Core(ref c)) if c.is_schema()));

        let bad_format = Job {
            formats: vec![ColFormatDirective::parse("a:.2d").unwrap()],
            ..Job::new(Command::Cat { inputs: vec![] })
        };
        assert!(matches!(
            run(&e, &bad_format, vec![csv("a\n1")]),
            Err(ExecError::Core(spoon_core::Error::Spec(_)))
        ));
    }

    #[test]
    fn evaluation_errors_abort_the_run() {
        let job = Job::new(Command::Filter {
            input: None,
            formulas: vec!["int(x) > 0".into()],
        });
        let err = run(&engine(), &job, vec![csv("x\n1\nnope")]).unwrap_err();
        assert!(matches!(
            err,
            ExecError::Io(spoon_io::Error::Core(spoon_core::Error::Eval(_)))
        ));
    }
}

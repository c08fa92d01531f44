//! Typed view: coercions, computed columns and filters over CSV input.

mod test_data_gen;

use std::fs;
use std::sync::Arc;

use spoon_core::config::SpoonConfig;
use spoon_core::spec::FileSpec;
use spoon_core::Error;
use spoon_exec::{Command, Engine, Job, Preamble};
use spoon_expr::{Context, ContextBuilder};
use test_data_gen::{column, create_temp_dir, stream, write_file};

#[test]
fn computed_columns_see_earlier_ones() {
    let ctx = Context::empty();
    let mut s = stream("x\n1\n3\n");
    s.add_type("x", Arc::new(ctx.resolve_type("int").unwrap()));
    s.add_apply("x2p1", Arc::new(ctx.compile("x**2+1").unwrap()));
    s.add_apply("x2p1m1", Arc::new(ctx.compile("x2p1-1").unwrap()));
    assert_eq!(s.schema().names, vec!["x", "x2p1", "x2p1m1"]);

    let rows = s.collect_rows().unwrap();
    assert_eq!(column(&rows, "x2p1"), vec!["2", "10"]);
    assert_eq!(column(&rows, "x2p1m1"), vec!["1", "9"]);
    // Typed columns are written back as their original text.
    assert_eq!(column(&rows, "x"), vec!["1", "3"]);
}

#[test]
fn apply_can_overwrite_an_existing_column() {
    let ctx = Context::empty();
    let mut s = stream("name\nDoe\n");
    s.add_apply("name", Arc::new(ctx.compile("name.upper()").unwrap()));
    assert_eq!(s.schema().names, vec!["name"]);
    assert_eq!(s.collect_rows().unwrap()[0]["name"], "DOE");
}

#[test]
fn float_filters_and_chained_filters() {
    let ctx = Context::empty();
    let mut s = stream("item,price\na,10\nb,12.5\nc,13\nd,99\n");
    s.add_type("price", Arc::new(ctx.resolve_type("float").unwrap()));
    s.add_filter(Arc::new(ctx.compile("price > 12.5").unwrap()));
    s.add_filter(Arc::new(ctx.compile("item != 'd'").unwrap()));
    let rows = s.collect_rows().unwrap();
    assert_eq!(column(&rows, "item"), vec!["c"]);
}

#[test]
fn preamble_functions_serve_as_types() {
    let mut builder = ContextBuilder::new();
    builder
        .run("import math\ndef cents(v): int(round(float(v) * 100))")
        .unwrap();
    let ctx = builder.build();
    let mut s = stream("x,y\n3,4\n");
    s.add_type("x", Arc::new(ctx.resolve_type("float").unwrap()));
    s.add_type("y", Arc::new(ctx.resolve_type("cents").unwrap()));
    s.add_apply("norm", Arc::new(ctx.compile("math.sqrt(x**2 + (y/100)**2)").unwrap()));
    s.add_apply("c", Arc::new(ctx.compile("y").unwrap()));
    let rows = s.collect_rows().unwrap();
    assert_eq!(rows[0]["norm"], "5.0");
    assert_eq!(rows[0]["c"], "400");
}

#[test]
fn coercion_failure_aborts_the_stream() {
    let ctx = Context::empty();
    let mut s = stream("a\n1\nx\n3\n");
    s.add_type("a", Arc::new(ctx.resolve_type("int").unwrap()));
    let results: Vec<_> = s.rows().unwrap().collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::Eval(_))));
}

#[test]
fn unbound_name_is_a_schema_error() {
    let ctx = Context::empty();
    let mut s = stream("a\n1\n");
    s.add_filter(Arc::new(ctx.compile("b == '1'").unwrap()));
    let err = s.rows().unwrap().next().unwrap().unwrap_err();
    assert!(err.is_schema());
    assert_eq!(err.to_string(), "Columns {'b'} are not found in fixture.csv.");
}

#[test]
fn schema_errors_name_the_input_file() {
    let dir = create_temp_dir();
    let people = write_file(&dir, "people.csv", "id,name\n1,ann\n");
    let input = FileSpec::parse(&people.to_string_lossy()).unwrap();
    let engine = Engine::new(SpoonConfig::default(), &Preamble::default()).unwrap();

    let mut filter = Job::new(Command::Filter {
        input: Some(input.clone()),
        formulas: vec!["nope == '1'".into()],
    });
    filter.output = Some(dir.join("filtered.csv"));
    let err = engine.run(&filter).unwrap_err().to_string();
    assert!(err.contains("nope") && err.contains("people.csv"), "{err}");

    let sort = Job::new(Command::Sort {
        input: Some(input.clone()),
        keys: vec!["zz".into()],
        numeric: false,
        reverse: false,
        random: false,
    });
    let err = engine.run(&sort).unwrap_err().to_string();
    assert!(err.contains("zz") && err.contains("people.csv"), "{err}");

    let mut formatted = Job::new(Command::Cat { inputs: vec![input] });
    formatted.formats = vec![spoon_core::spec::ColFormatDirective::parse("gone:d").unwrap()];
    formatted.output = Some(dir.join("out.csv"));
    let err = engine.run(&formatted).unwrap_err().to_string();
    assert!(err.contains("gone") && err.contains("people.csv"), "{err}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn typing_an_absent_column_fails_before_reading() {
    let ctx = Context::empty();
    let mut s = stream("a\n1\n");
    s.add_type("zz", Arc::new(ctx.resolve_type("int").unwrap()));
    assert!(s.rows().err().unwrap().is_schema());
}

#[test]
fn streams_are_single_pass() {
    let mut s = stream("a\n1\n");
    assert_eq!(s.collect_rows().unwrap().len(), 1);
    assert!(s.is_consumed());
    assert!(matches!(s.rows().err(), Some(Error::AlreadyConsumed)));
}

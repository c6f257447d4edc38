//! Stdin-driven demo runner: parses CLI args into one `ops::` operator,
//! reads newline-delimited `key=value,key=value` records from stdin,
//! threads each through the operator and prints whatever it forwards or
//! emits. The minimal stand-in for the teacher's `Runtime`+`Server`
//! wiring - there's no listener, no storage engine, just one operator
//! and a pipe.

use clap::Parser;
use cli::{build, BuiltOperator, Cli};
use label::{Label, Registry};
use record::Value;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tuple::{Member, Record, Tuple, TuplePool};

fn main() {
    let cli = Cli::parse();
    let registry = Registry::new();
    let pool = Arc::new(TuplePool::new());

    let mut operator = match build(&registry, &pool, &cli.operator) {
        Ok(op) => op,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error reading stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let tuple = parse_record(&registry, &pool, &line);
        for forwarded in operator.process(&tuple, &pool) {
            print_tuple(&mut out, &forwarded);
        }
    }
    for emitted in operator.flush(&pool) {
        print_tuple(&mut out, &emitted);
    }
}

/// Turns one `key=value,key=value` line into a growable tuple, one
/// member per field, registering each key as an indexed label and
/// guessing the value's type (int, then double, then timestamp-shaped
/// `sec.usec`, else string).
fn parse_record(registry: &Registry, pool: &Arc<TuplePool>, line: &str) -> Tuple {
    let tuple = Tuple::new(pool, registry.index_len());
    for field in line.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (key, value) = match field.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (field, ""),
        };
        let label = registry.register_indexed(key);
        let member = Record::scalar(parse_value(value), vec![label]);
        let _ = tuple.add_member(member, &pool.stats);
    }
    tuple
}

fn parse_value(text: &str) -> Value<'static> {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(d) = text.parse::<f64>() {
        return Value::from(d);
    }
    Value::from(text.to_string())
}

fn print_tuple(out: &mut impl Write, tuple: &Tuple) {
    let fields: Vec<String> = tuple.members().iter().map(format_member).collect();
    let _ = writeln!(out, "{}", fields.join(","));
}

fn format_member(member: &Member) -> String {
    let names: Vec<&str> = member.labels.iter().map(Label::name).collect();
    let value = match member.as_value() {
        Some(v) => v.to_string(),
        None => "<nested>".to_string(),
    };
    format!("{}={}", names.join("."), value)
}

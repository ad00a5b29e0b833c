use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use sqlexpr_rust::{Classifier, Expression, FieldMap, KindFilter, ParseOptions};
use std::io::{self, Write};
use tracing::info;

/// Classify and render SQL select expressions
#[derive(Debug, Parser)]
#[command(name = "sqlexpr", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for the expression CLI
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify a single expression
    Parse {
        /// Expression text, e.g. "SUM(amount) AS total"
        expression: String,
        #[command(flatten)]
        options: ExprOptions,
    },
    /// Read expressions from stdin, one per line
    Repl {
        #[command(flatten)]
        options: ExprOptions,
    },
    /// List registered functions
    Functions,
}

/// Parsing hints and the field map shared by `parse` and `repl`
#[derive(Debug, Clone, ClapArgs)]
pub struct ExprOptions {
    /// Split a trailing " AS alias" off the expression
    #[arg(long)]
    pub alias: bool,

    /// Only accept these kinds (repeatable)
    #[arg(long = "must-be", value_name = "KIND", value_parser = parse_kind)]
    pub must_be: Vec<KindFilter>,

    /// Reject these kinds (repeatable; replaces the default of Wildcard)
    #[arg(long = "must-not-be", value_name = "KIND", value_parser = parse_kind)]
    pub must_not_be: Vec<KindFilter>,

    /// Accept a bare `*`
    #[arg(long, conflicts_with = "must_not_be")]
    pub allow_wildcard: bool,

    /// Map a field to its column (repeatable)
    #[arg(long = "field", value_name = "NAME=COLUMN", value_parser = parse_field_mapping)]
    pub fields: Vec<(String, String)>,
}

impl ExprOptions {
    pub fn parse_options(&self) -> ParseOptions {
        let mut options = ParseOptions::default().must_be(self.must_be.iter().cloned());
        options.parse_alias = self.alias;
        if self.allow_wildcard {
            options = options.allow_any();
        } else if !self.must_not_be.is_empty() {
            options = options.must_not_be(self.must_not_be.iter().cloned());
        }
        options
    }

    pub fn field_map(&self) -> FieldMap {
        self.fields.iter().cloned().collect()
    }
}

fn parse_kind(s: &str) -> Result<KindFilter, String> {
    s.parse()
}

fn parse_field_mapping(s: &str) -> Result<(String, String)> {
    let (name, column) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=COLUMN, got '{}'", s))?;
    let (name, column) = (name.trim(), column.trim());
    if name.is_empty() || column.is_empty() {
        return Err(anyhow!("Field mapping needs both a name and a column: '{}'", s));
    }
    Ok((name.to_string(), column.to_string()))
}

/// Wraps an alias in backticks, doubling any it already contains
pub fn quote_identifier(alias: &str) -> String {
    format!("`{}`", alias.replace('`', "``"))
}

/// Describes an expression the way `parse` and the REPL print it
pub fn describe(expr: &Expression, field_map: &FieldMap) -> Vec<String> {
    let mut lines = vec![
        format!("kind: {}", expr.kind()),
        format!("fields: {}", expr.fields().join(", ")),
        format!("alias: {}", expr.alias()),
    ];
    if expr.is_aggregate() {
        lines.push("aggregate: yes".to_string());
    }

    let unmapped: Vec<&str> = expr
        .fields()
        .into_iter()
        .filter(|field| !field_map.contains_key(*field))
        .collect();
    if unmapped.is_empty() {
        if let Ok(sql) = expr.render(field_map) {
            lines.push(format!("sql: {}", sql));
            lines.push(format!("select: {} AS {}", sql, quote_identifier(&expr.alias())));
        }
    } else {
        lines.push(format!("unmapped: {}", unmapped.join(", ")));
    }
    lines
}

pub fn handle_parse(classifier: &Classifier, text: &str, options: &ExprOptions) -> Result<()> {
    let expr = classifier
        .parse(text, &options.parse_options())
        .with_context(|| format!("Invalid expression '{}'", text))?;
    info!("Parsed expression: {:?}", expr);

    for line in describe(&expr, &options.field_map()) {
        println!("{}", line);
    }
    Ok(())
}

pub fn handle_functions(classifier: &Classifier) -> Result<()> {
    for def in classifier.registry().iter() {
        println!("{} ({})", def.name(), def.category());
    }
    Ok(())
}

pub struct InputBuffer {
    buffer: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Reads one line; returns false at end of input
    pub fn read_input(&mut self) -> Result<bool> {
        self.buffer.clear();
        io::stdout().flush()?;
        let read = io::stdin().read_line(&mut self.buffer)?;
        self.buffer = self.buffer.trim_end().to_string();
        Ok(read > 0)
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_prompt() {
    print!("sqlexpr> ");
}

fn print_help() {
    println!(".exit       leave the REPL");
    println!(".functions  list registered functions");
    println!(".help       show this message");
    println!("Anything else is classified as an expression.");
}

/// Handles one REPL line; returns true when the loop should stop
pub fn handle_command(classifier: &Classifier, line: &str, options: &ExprOptions) -> Result<bool> {
    match line.trim() {
        ".exit" => Ok(true),
        ".functions" => {
            handle_functions(classifier)?;
            Ok(false)
        }
        ".help" => {
            print_help();
            Ok(false)
        }
        "" => Ok(false),
        cmd if cmd.starts_with('.') => {
            println!("Unrecognized command '{}'.", cmd);
            Ok(false)
        }
        _ => {
            // Invalid expressions are reported, not fatal, inside the REPL
            if let Err(e) = handle_parse(classifier, line, options) {
                println!("error: {:#}", e);
            }
            Ok(false)
        }
    }
}

pub fn repl_mode(classifier: &Classifier, options: &ExprOptions) -> Result<()> {
    let mut input_buffer = InputBuffer::new();

    loop {
        print_prompt();
        if !input_buffer.read_input()? {
            println!();
            break Ok(());
        }

        if handle_command(classifier, &input_buffer.buffer, options)? {
            break Ok(());
        }
    }
}

pub fn execute_command(args: Args) -> Result<()> {
    let classifier = Classifier::default();

    match args.command {
        Command::Parse {
            expression,
            options,
        } => handle_parse(&classifier, &expression, &options),
        Command::Repl { options } => repl_mode(&classifier, &options),
        Command::Functions => handle_functions(&classifier),
    }
}

use crate::cli::OutputFormat;
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            println!("{pretty}");
        }
        OutputFormat::Table => {
            print_as_table(value);
        }
    }
}

/// Print a list of identifiers.
pub fn print_ids(ids: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_value(&Value::from(ids.to_vec()), format),
        OutputFormat::Table => {
            if ids.is_empty() {
                println!("No identifiers found.");
                return;
            }
            println!("{}", ids_table(ids));
            println!("Total: {}", ids.len());
        }
    }
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn ids_table(ids: &[String]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Identifier"]);
    for (i, id) in ids.iter().enumerate() {
        builder.push_record([(i + 1).to_string(), id.clone()]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn print_as_table(value: &Value) {
    match value {
        Value::Object(obj) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (k, v) in obj {
                builder.push_record([k.clone(), display_scalar(v)]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
        other => println!("{}", display_scalar(other)),
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::Null => "(nil)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

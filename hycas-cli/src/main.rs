use std::{
    io::{self, BufRead},
    ops::Range,
    path::PathBuf,
};

use anyhow::{Context as _, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Parser as ClapParser;
use hycas::{
    parser::ParserError,
    preferences::Preferences,
    prelude::*,
    serialize::format_complex,
};
use log::{debug, info};

const INPUT_ID: &str = "input";

#[derive(ClapParser)]
#[command(name = "hycas", version, about = "Reduce and approximate mathematical expressions")]
pub struct Arguments {
    /// Expressions to evaluate; lines are read from stdin when none are given
    expressions: Vec<String>,

    /// Preferences file, defaults to $HYCAS_CONFIG or the user configuration directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Angle unit: radian, degree or gradian
    #[arg(long)]
    angle: Option<AngleUnit>,

    /// Complex format: real, cartesian or polar
    #[arg(long)]
    complex: Option<ComplexFormat>,

    /// Significant digits of approximations
    #[arg(long)]
    digits: Option<usize>,

    /// Float layout: decimal, scientific or engineering
    #[arg(long)]
    mode: Option<PrintFloatMode>,

    /// Expression pool capacity in bytes
    #[arg(long)]
    capacity: Option<usize>,

    /// Print the exact result only
    #[arg(long)]
    exact_only: bool,

    /// Lay results out for the terminal, with colors
    #[arg(long)]
    pretty: bool,
}

impl Arguments {
    /// File preferences with the command-line overrides applied.
    fn preferences(&self) -> Result<Preferences> {
        let mut preferences = match &self.config {
            Some(path) => Preferences::load(path)
                .with_context(|| format!("cannot load preferences from {}", path.display()))?,
            None => Preferences::load_or_default().context("cannot load preferences")?,
        };
        if let Some(angle) = self.angle {
            preferences.angle_unit = angle;
        }
        if let Some(complex) = self.complex {
            preferences.complex_format = complex;
        }
        if let Some(digits) = self.digits {
            preferences.significant_digits = digits;
        }
        if let Some(mode) = self.mode {
            preferences.print_float_mode = mode;
        }
        if let Some(capacity) = self.capacity {
            preferences.pool_capacity = capacity;
        }
        preferences.validate()?;
        Ok(preferences)
    }
}

/// Char range of a byte range, as ariadne labels count characters.
fn char_span(text: &str, span: Range<usize>) -> Range<usize> {
    let to_chars = |byte: usize| text.char_indices().take_while(|&(index, _)| index < byte).count();
    let start = to_chars(span.start.min(text.len()));
    let end = to_chars(span.end.min(text.len())).max(start + 1);
    start..end
}

fn report_parse_error(text: &str, error: &ParserError) {
    let span = (INPUT_ID, char_span(text, error.span()));
    let printed = Report::build(ReportKind::Error, span.clone())
        .with_message("cannot parse expression")
        .with_label(Label::new(span).with_message(error.to_string()).with_color(Color::Red))
        .finish()
        .eprint((INPUT_ID, Source::from(text)));
    if printed.is_err() {
        eprintln!("error: {error}");
    }
}

/// Calculator state kept across lines.
struct Session {
    pool: Pool,
    context: VariableContext,
    preferences: Preferences,
    exact_only: bool,
    pretty: bool,
}

impl Session {
    fn new(preferences: Preferences, exact_only: bool, pretty: bool) -> Self {
        Self { pool: preferences.create_pool(), context: VariableContext::new(), preferences, exact_only, pretty }
    }

    fn evaluate(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let parsed = match self.pool.parse(text) {
            Ok(parsed) => parsed,
            Err(error) => {
                report_parse_error(text, &error);
                return Ok(());
            }
        };

        let reduction = self.preferences.reduction_context(&self.context, Target::User);
        let reduced = parsed.reduce(reduction).context("reduction failed")?;
        let approximation = ApproximationContext::from(&reduction);
        let value = reduced.approximate_evaluation::<f64>(&approximation);

        if parsed.kind() == ExprType::Store {
            self.store(&parsed, &reduced)?;
        }
        self.context.set_value("ans", &reduced)?;
        self.print(&reduced, value)?;
        debug!("pool holds {} nodes, {} bytes free", self.pool.number_of_nodes(), self.pool.free_bytes());
        Ok(())
    }

    /// Record `value→x` with its reduced value, `body→f(t)` with its body as written.
    fn store(&mut self, parsed: &Expression, reduced: &Expression) -> Result<()> {
        let name = match parsed.child(1) {
            Some(target) if target.kind() == ExprType::Symbol => {
                let name = target.name().unwrap_or_default();
                self.context.set_value(&name, reduced)?;
                name
            }
            _ => self.context.store(parsed)?,
        };
        info!("stored `{name}`");
        Ok(())
    }

    fn print(&self, reduced: &Expression, value: Evaluation<f64>) -> Result<()> {
        let Preferences { print_float_mode: mode, significant_digits: digits, complex_format, .. } = self.preferences;
        if self.pretty {
            reduced.create_layout(mode, digits).print()?;
        } else {
            println!("{}", reduced.serialize(mode, digits));
        }
        if self.exact_only {
            return Ok(());
        }
        let format = |value: num_complex::Complex<f64>| format_complex(value, mode, digits, complex_format);
        let approximate = match value {
            Evaluation::Complex(value) => Some(format(value)),
            Evaluation::List(values) => Some(format!("{{{}}}", values.into_iter().map(format).collect::<Vec<_>>().join(","))),
            Evaluation::Matrix(_) => None,
        };
        if let Some(approximate) = approximate.filter(|text| *text != reduced.serialize(mode, digits)) {
            println!("≈ {approximate}");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let arguments = Arguments::parse();
    let preferences = arguments.preferences()?;
    let mut session = Session::new(preferences, arguments.exact_only, arguments.pretty);

    if !arguments.expressions.is_empty() {
        for expression in &arguments.expressions {
            session.evaluate(expression)?;
        }
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        if let Err(error) = session.evaluate(&line?) {
            eprintln!("error: {error:#}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_count_characters() {
        assert_eq!(char_span("1+2#", 3..4), 3..4);
        assert_eq!(char_span("π×#", 4..5), 2..3);
        assert_eq!(char_span("1+", 2..2), 2..3);
    }

    #[test]
    fn session_keeps_values_between_lines() {
        let mut session = Session::new(Preferences::default(), true, false);
        session.evaluate("3→x").unwrap();
        session.evaluate("t^2→f(t)").unwrap();
        session.evaluate("f(x)+1").unwrap();
        let ans = session.context.symbol_definition("ans").unwrap();
        assert_eq!(ans.to_string(), "10");
        session.evaluate("ans×2").unwrap();
        assert_eq!(session.context.symbol_definition("ans").unwrap().to_string(), "20");
    }

    #[test]
    fn stored_lists_feed_list_functions() {
        let mut session = Session::new(Preferences::default(), false, false);
        session.evaluate("{1,2,6}→L").unwrap();
        session.evaluate("mean(L)").unwrap();
        assert_eq!(session.context.symbol_definition("ans").unwrap().to_string(), "3");
        session.evaluate("sum(L)+ans").unwrap();
        assert_eq!(session.context.symbol_definition("ans").unwrap().to_string(), "12");
    }

    #[test]
    fn command_line_overrides_are_validated() {
        let arguments = Arguments::parse_from(["hycas", "--digits", "40", "1+1"]);
        assert!(arguments.preferences().is_err());
        let arguments = Arguments::parse_from(["hycas", "--angle", "degree", "--exact-only", "1"]);
        assert!(arguments.exact_only);
        assert_eq!(arguments.angle, Some(AngleUnit::Degree));
    }
}

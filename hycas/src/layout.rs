//! RcDoc-based presentation of expressions with termcolor annotations.
//!
//! Role
//! - [`Expression::create_layout`] turns a tree into a [`Layout`]: an annotated document that
//!   renders to the same text as [`Expression::serialize`] when it fits on one line, and breaks
//!   long sums, argument lists and matrix rows when it does not.
//! - [`Layout::render_colored`] maps the annotations to colors on any `termcolor` sink;
//!   parentheses are colored by nesting depth so matching pairs share a color.

use std::io::{self, Write};

use pretty::{RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{
    expr::{Expression, variant::ExprType},
    serialize::{format_decimal, needs_parentheses},
    settings::PrintFloatMode,
};

/// Width used when the terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 80;

/// Styles used to annotate parts of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct,
    Paren(u8),
    Number,
    Operator,
    Symbol,
    Function,
    /// `undef` and `nonreal`.
    Poison,
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Style::Punct => {
                spec.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 4 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::Yellow,
                    _ => Color::Magenta,
                };
                spec.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Number => {
                spec.set_fg(Some(Color::Cyan));
            }
            Style::Operator => {
                spec.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Symbol => {
                spec.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Function => {
                spec.set_fg(Some(Color::Magenta));
            }
            Style::Poison => {
                spec.set_fg(Some(Color::Red)).set_bold(true);
            }
        }
        spec
    }
}

type Doc = RcDoc<'static, Style>;

fn styled(style: Style, text: impl Into<String>) -> Doc {
    RcDoc::as_string(text.into()).annotate(style)
}

fn op(text: &'static str) -> Doc {
    styled(Style::Operator, text)
}

fn lparen(depth: u8) -> Doc {
    styled(Style::Paren(depth), "(")
}

fn rparen(depth: u8) -> Doc {
    styled(Style::Paren(depth), ")")
}

fn infix_symbol(kind: ExprType) -> &'static str {
    match kind {
        ExprType::Addition => "+",
        ExprType::Subtraction => "-",
        ExprType::Multiplication => "×",
        ExprType::Division => "/",
        ExprType::Power => "^",
        _ => "→",
    }
}

struct LayoutBuilder {
    mode: PrintFloatMode,
    significant_digits: usize,
}

impl LayoutBuilder {
    fn operand(&self, parent: ExprType, index: usize, child: &Expression, depth: u8) -> Doc {
        if needs_parentheses(parent, index, child) {
            lparen(depth).append(self.build(child, depth.wrapping_add(1))).append(rparen(depth)).group()
        } else {
            self.build(child, depth)
        }
    }

    /// `(a, b, …)` breaking after the commas when too wide.
    fn arguments(&self, children: &[Expression], depth: u8) -> Doc {
        let inner = depth.wrapping_add(1);
        let separator = styled(Style::Punct, ",").append(RcDoc::line_());
        let arguments = RcDoc::intersperse(children.iter().map(|child| self.build(child, inner)), separator);
        lparen(depth).append(arguments.nest(2)).append(rparen(depth)).group()
    }

    fn matrix(&self, e: &Expression, depth: u8) -> Doc {
        let (_, columns) = e.matrix_dimensions().unwrap_or((0, 0));
        let children = e.children();
        let rows = children.chunks(columns.max(1)).map(|row| {
            let entries = RcDoc::intersperse(row.iter().map(|entry| self.build(entry, depth)), styled(Style::Punct, ","));
            styled(Style::Punct, "[").append(entries).append(styled(Style::Punct, "]"))
        });
        styled(Style::Punct, "[")
            .append(RcDoc::intersperse(rows, RcDoc::line_()).nest(1))
            .append(styled(Style::Punct, "]"))
            .group()
    }

    fn build(&self, e: &Expression, depth: u8) -> Doc {
        use ExprType::*;
        let kind = e.kind();
        match kind {
            Undefined => styled(Style::Poison, "undef"),
            Nonreal => styled(Style::Poison, "nonreal"),
            Rational => styled(Style::Number, e.rational().map(|r| r.to_string()).unwrap_or_default()),
            Decimal => styled(
                Style::Number,
                e.decimal().map(|d| format_decimal(&d, self.mode, self.significant_digits)).unwrap_or_default(),
            ),
            Infinity => match e.infinity_is_negative() {
                Some(true) => styled(Style::Number, "-inf"),
                _ => styled(Style::Number, "inf"),
            },
            Constant => styled(Style::Symbol, e.constant().map(|c| c.symbol()).unwrap_or_default()),
            Symbol => styled(Style::Symbol, e.name().unwrap_or_default()),
            Function => styled(Style::Function, e.name().unwrap_or_default()).append(self.arguments(&e.children(), depth)),
            Addition | Subtraction | Multiplication | Division | Power | Store | Comparison => {
                let symbol = match kind {
                    Comparison => e.comparison_operator().map(|c| c.symbol()).unwrap_or("="),
                    _ => infix_symbol(kind),
                };
                // Only sums and differences offer a line break before their operator.
                let breaks = matches!(kind, Addition | Subtraction);
                let children = e.children();
                let operands = children.iter().enumerate().map(|(index, child)| {
                    let operand = self.operand(kind, index, child, depth);
                    match index {
                        0 => operand,
                        _ if breaks => RcDoc::line_().append(op(symbol)).append(operand),
                        _ => op(symbol).append(operand),
                    }
                });
                RcDoc::concat(operands).nest(2).group()
            }
            Opposite => {
                let child = e.child(0).map(|child| self.operand(kind, 0, &child, depth)).unwrap_or_else(RcDoc::nil);
                op("-").append(child)
            }
            Factorial => {
                let child = e.child(0).map(|child| self.operand(kind, 0, &child, depth)).unwrap_or_else(RcDoc::nil);
                child.append(op("!"))
            }
            Parenthesis => self.arguments(&e.children(), depth),
            Matrix => self.matrix(e, depth),
            List => {
                let separator = styled(Style::Punct, ",").append(RcDoc::line_());
                let children = e.children();
                let elements = RcDoc::intersperse(children.iter().map(|child| self.build(child, depth)), separator);
                styled(Style::Punct, "{").append(elements.nest(1)).append(styled(Style::Punct, "}")).group()
            }
            _ => styled(Style::Function, kind.function_name().unwrap_or("undef"))
                .append(self.arguments(&e.children(), depth)),
        }
    }
}

/// Annotated document ready to be rendered at any width.
#[derive(Clone)]
pub struct Layout(Doc);

// Maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor> {
    out: &'w mut W,
}

impl<'a, W: WriteColor> RenderAnnotated<'a, Style> for ColorWriter<'_, W> {
    fn push_annotation(&mut self, annotation: &'a Style) -> io::Result<()> {
        self.out.set_color(&annotation.to_color_spec())
    }

    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<W: WriteColor> pretty::Render for ColorWriter<'_, W> {
    type Error = io::Error;

    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }

    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    fn fail_doc(&self) -> Self::Error {
        io::Error::other("layout rendering failed")
    }
}

impl Layout {
    /// Plain text laid out for `width` columns.
    pub fn render(&self, width: usize) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.0.render_fmt(width, &mut out);
        out
    }

    /// Colored output on a `termcolor` sink.
    pub fn render_colored<W: WriteColor>(&self, width: usize, out: &mut W) -> io::Result<()> {
        let mut writer = ColorWriter { out };
        self.0.render_raw(width, &mut writer)
    }

    /// Print to stdout with colors when supported, at the terminal width.
    pub fn print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.render_colored(terminal_width(), &mut stdout)?;
        writeln!(stdout)
    }
}

/// Width of the terminal, or [`DEFAULT_WIDTH`] when it cannot be determined.
pub fn terminal_width() -> usize {
    term_size::dimensions().map(|(width, _)| width).unwrap_or(DEFAULT_WIDTH)
}

impl Expression {
    /// Build the presentation document of this tree.
    pub fn create_layout(&self, mode: PrintFloatMode, significant_digits: usize) -> Layout {
        Layout(LayoutBuilder { mode, significant_digits }.build(self, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pool, settings::DEFAULT_SIGNIFICANT_DIGITS};
    use termcolor::Buffer;

    fn layout(text: &str) -> Layout {
        let pool = Pool::with_capacity(32768);
        pool.parse(text).unwrap().create_layout(PrintFloatMode::Decimal, DEFAULT_SIGNIFICANT_DIGITS)
    }

    #[test]
    fn wide_layout_matches_serialization() {
        for text in ["1+2×(3-x)", "-(a+b)", "f(x)^2", "[[1,2][3,4]]", "root(8,3)", "x≤3", "mean({1,2},{})"] {
            let pool = Pool::with_capacity(32768);
            let e = pool.parse(text).unwrap();
            let layout = e.create_layout(PrintFloatMode::Decimal, DEFAULT_SIGNIFICANT_DIGITS);
            assert_eq!(layout.render(200), e.to_string());
        }
    }

    #[test]
    fn narrow_layout_breaks_sums() {
        let rendered = layout("alpha+beta+gamma+delta").render(10);
        assert!(rendered.lines().count() > 1);
        assert_eq!(rendered.replace(['\n', ' '], ""), "alpha+beta+gamma+delta");
    }

    #[test]
    fn colored_rendering_keeps_the_text() {
        let mut buffer = Buffer::no_color();
        layout("sin(x)+1").render_colored(80, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer.into_inner()).unwrap(), "sin(x)+1");
    }
}

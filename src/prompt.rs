//! Numbered choice lists on stdin/stdout.

use anyhow::Context;
use std::io::{self, BufRead, Write};

/// Print `items` as a numbered list and read a 1-based choice.
///
/// An empty answer picks `default` when given. Returns `None` for an invalid
/// answer or end of input.
pub fn choose(
    label: &str,
    items: &[String],
    default: Option<usize>,
) -> anyhow::Result<Option<usize>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    choose_from(&mut stdin.lock(), &mut stdout, label, items, default)
}

fn choose_from(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    items: &[String],
    default: Option<usize>,
) -> anyhow::Result<Option<usize>> {
    writeln!(output, "\n{label}:")?;
    for (i, item) in items.iter().enumerate() {
        writeln!(output, "{:2}. {item}", i + 1)?;
    }
    match default {
        Some(d) => write!(output, "Choice (1-{}, default {}): ", items.len(), d + 1)?,
        None => write!(output, "Choice (1-{}): ", items.len())?,
    }
    output.flush().context("flush prompt")?;

    let mut line = String::new();
    if input.read_line(&mut line).context("read choice")? == 0 {
        return Ok(None);
    }
    Ok(parse_choice(line.trim(), items.len(), default))
}

fn parse_choice(answer: &str, len: usize, default: Option<usize>) -> Option<usize> {
    if answer.is_empty() {
        return default;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

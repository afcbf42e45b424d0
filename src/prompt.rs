use std::io::{BufRead, Write};

use crate::error::DeployResult;

/// Print `question` and read one trimmed line.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> DeployResult<String> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Yes/no question. A blank answer takes `default`; only `y` and
/// `yes` count as yes.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: bool,
) -> DeployResult<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = ask(input, output, &format!("{question} {hint} "))?;
    Ok(match answer.to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

/// Require the literal word `yes` before a destructive action.
pub fn confirm_destructive<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    warning: &str,
) -> DeployResult<bool> {
    writeln!(output, "WARNING: {warning}")?;
    let answer = ask(input, output, "Are you sure? Type 'yes' to confirm: ")?;
    Ok(answer == "yes")
}

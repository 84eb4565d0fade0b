//! Interactive question loop.
//!
//! Reads one question per line. `quit`, `exit`, and `q` (any case) or end of
//! input end the session; blank lines re-prompt. Errors from answering a
//! question are printed and the loop moves on to the next line.

use std::io::{BufRead, ErrorKind, Write};

use anyhow::Result;

use crate::answer::{Answer, Answerer};

const RULE_WIDTH: usize = 60;
const EXIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

fn is_exit_command(input: &str) -> bool {
    let lowered = input.to_lowercase();
    EXIT_COMMANDS.contains(&lowered.as_str())
}

pub fn write_banner<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "RAG System - Ask questions about MongoDB")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "Type 'quit' or 'exit' to stop\n")
}

pub fn write_answer<W: Write>(out: &mut W, answer: &Answer) -> std::io::Result<()> {
    writeln!(out, "\nAnswer: {}\n", answer.text)?;
    if !answer.sources.is_empty() {
        let pages: Vec<String> = answer
            .sources
            .iter()
            .map(|s| format!("{} p.{} ({:.3})", s.source, s.page, s.score))
            .collect();
        writeln!(out, "Sources: {}\n", pages.join(", "))?;
    }
    writeln!(out, "{}\n", "-".repeat(RULE_WIDTH))
}

fn write_error<W: Write>(out: &mut W, err: &dyn std::fmt::Display) -> std::io::Result<()> {
    writeln!(out, "\nError: {:#}\n", err)?;
    writeln!(out, "{}\n", "-".repeat(RULE_WIDTH))
}

/// Run the loop until an exit command or end of input.
///
/// `show_prompt` controls whether `Ask a question: ` is written before each
/// read; it is off when stdin is not a terminal.
pub async fn run_loop<R: BufRead, W: Write>(
    answerer: &Answerer,
    mut input: R,
    out: &mut W,
    show_prompt: bool,
) -> Result<()> {
    write_banner(out)?;

    let mut line = String::new();
    loop {
        if show_prompt {
            write!(out, "Ask a question: ")?;
            out.flush()?;
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                writeln!(out, "\nGoodbye!")?;
                break;
            }
            Ok(_) => {}
            // The offending line has been consumed; keep reading.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                log::warn!("unreadable input line: {}", e);
                write_error(out, &e)?;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        let question = line.trim();
        if is_exit_command(question) {
            writeln!(out, "\nGoodbye!")?;
            break;
        }
        if question.is_empty() {
            writeln!(out, "Please enter a question.\n")?;
            continue;
        }

        writeln!(out, "\nSearching and generating answer...")?;
        match answerer.answer(question).await {
            Ok(answer) => write_answer(out, &answer)?,
            Err(e) => {
                log::warn!("question failed: {:#}", e);
                write_error(out, &e)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

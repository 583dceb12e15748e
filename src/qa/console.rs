use super::{Answer, QaEngine, QaError, Question, QuestionKind};
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Serializes prompts from concurrently running transformers.
static PROMPT: Mutex<()> = Mutex::new(());

/// Prompts on stderr and reads answers from stdin.
///
/// Selections are entered as option numbers (comma-separated for
/// multi-select); an empty line accepts the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEngine;

impl ConsoleEngine {
    fn render(question: &Question, out: &mut impl Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "? {}", question.prompt)?;
        for hint in &question.hints {
            writeln!(out, "  Hint: {}", hint)?;
        }
        match &question.kind {
            QuestionKind::MultiSelect { options, default } => {
                for (i, option) in options.iter().enumerate() {
                    let mark = if default.contains(option) { "x" } else { " " };
                    writeln!(out, "  {:>2}) [{}] {}", i + 1, mark, option)?;
                }
                write!(out, "Select (e.g. 1,3) [defaults marked x]: ")?;
            }
            QuestionKind::Select { options, default } => {
                for (i, option) in options.iter().enumerate() {
                    writeln!(out, "  {:>2}) {}", i + 1, option)?;
                }
                write!(out, "Select [{}]: ", default)?;
            }
            QuestionKind::Input { default } => {
                write!(out, "Value [{}]: ", default)?;
            }
        }
        out.flush()
    }

    fn parse(question: &Question, line: &str) -> Answer {
        let line = line.trim();
        if line.is_empty() {
            return question.default_answer();
        }
        match &question.kind {
            QuestionKind::MultiSelect { options, .. } => Answer::Multi(
                line.split(',')
                    .filter_map(|part| pick(options, part.trim()))
                    .collect(),
            ),
            QuestionKind::Select { options, default } => {
                Answer::Single(pick(options, line).unwrap_or_else(|| default.clone()))
            }
            QuestionKind::Input { .. } => Answer::Single(line.to_string()),
        }
    }
}

/// Accepts either a 1-based option number or the option text itself.
fn pick(options: &[String], input: &str) -> Option<String> {
    if let Ok(index) = input.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| options.get(i)).cloned();
    }
    options.iter().find(|o| o.as_str() == input).cloned()
}

impl QaEngine for ConsoleEngine {
    fn ask(&self, question: &Question) -> Result<Answer, QaError> {
        let _guard = PROMPT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::render(question, &mut io::stderr())?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(Self::parse(question, &line))
    }
}

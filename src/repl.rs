// File: src/repl.rs
//
// Interactive REPL for Moss. One VM lives for the whole session, so
// globals and functions defined earlier stay available. Input with
// unbalanced delimiters continues on the next line.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::vm::Vm;

pub struct Repl {
    vm: Vm,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        Ok(Repl { vm: Vm::new(), editor })
    }

    fn show_banner(&self) {
        println!("{}", "Moss interactive shell".bright_cyan().bold());
        println!(
            "  Type {} for commands, {} to leave.",
            ":help".bright_yellow(),
            ":quit".bright_yellow()
        );
        println!();
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.show_banner();

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() {
                "moss> ".bright_green().to_string()
            } else {
                "....> ".bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());

                    if buffer.is_empty() && line.trim_start().starts_with(':') {
                        if self.handle_command(line.trim()) {
                            continue;
                        }
                        break;
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    if is_input_complete(&buffer) {
                        // Errors were already printed; the VM stays usable.
                        let _ = self.vm.interpret(&buffer);
                        buffer.clear();
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{} {}", "Error:".bright_red(), err);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handles `:commands`; returns false when the session should end.
    fn handle_command(&mut self, command: &str) -> bool {
        match command {
            ":help" | ":h" => {
                println!();
                println!("  {}   show this message", ":help".bright_yellow());
                println!("  {}   discard all definitions", ":reset".bright_yellow());
                println!("  {}    leave the shell", ":quit".bright_yellow());
                println!();
                println!("  Leave braces or parentheses unclosed to continue on the");
                println!("  next line.");
                println!();
                true
            }
            ":reset" | ":r" => {
                self.vm = Vm::new();
                println!("{}", "environment reset".bright_green());
                true
            }
            ":quit" | ":q" | ":exit" => false,
            _ => {
                println!(
                    "{} unknown command {}; try {}",
                    "Error:".bright_red(),
                    command.bright_yellow(),
                    ":help".bright_yellow()
                );
                true
            }
        }
    }
}

/// A line is complete once every delimiter opened outside a string has
/// been closed again.
fn is_input_complete(input: &str) -> bool {
    let mut parens = 0i32;
    let mut braces = 0i32;
    let mut in_string = false;
    let mut escape_next = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '/' if !in_string && chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' if !in_string => parens += 1,
            ')' if !in_string => parens -= 1,
            '{' if !in_string => braces += 1,
            '}' if !in_string => braces -= 1,
            _ => {}
        }
    }

    !in_string && parens <= 0 && braces <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_input_is_complete() {
        assert!(is_input_complete("print 1;"));
        assert!(is_input_complete("fun f() { return 1; }"));
        assert!(is_input_complete(""));
    }

    #[test]
    fn open_delimiters_continue_the_input() {
        assert!(!is_input_complete("fun f() {"));
        assert!(!is_input_complete("print (1 +"));
        assert!(!is_input_complete("var s = \"unclosed"));
    }

    #[test]
    fn strings_and_comments_hide_delimiters() {
        assert!(is_input_complete("print \"{\";"));
        assert!(is_input_complete("print 1; // {(\n"));
    }
}

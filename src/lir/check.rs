//! FileCheck-style golden tests for LIR listings.
//!
//! A listing file carries its own expectations in comment lines. Every
//! `; RUN:` line dumps the listing once, with the options its arguments
//! name, and the dump is checked against the `; CHECK` directives in file
//! order.
//!
//! ```text
//! ; RUN: lirdump --dump-nops %s
//! ; CHECK-LABEL: Dumping LIR insns for
//! ; CHECK: movs
//! ; CHECK-NEXT: -------- Method_Exit
//! ; CHECK-NOT: DecodeError
//! ```

use bumpalo::Bump;

use super::parser::parse_listing;
use crate::arm::dumper::UnitDumper;
use crate::core::config::{parse_address, DumpOptions};
use crate::core::session::DumpSession;

/// A CHECK directive extracted from a listing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match pattern on this or a later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-NOT: pattern - Must not occur before the next match
    CheckNot(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to dump the listing
#[derive(Debug, Clone)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

impl RunDirective {
    /// Dump options named by the arguments; unknown arguments are ignored.
    pub fn options(&self) -> Result<DumpOptions, String> {
        let mut options = DumpOptions::default();
        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dump-nops" => options.dump_nops = true,
                "--dump-masks" => options.dump_resource_masks = true,
                "--base-address" => {
                    let value = args
                        .next()
                        .ok_or_else(|| "--base-address needs a value".to_string())?;
                    options.base_address = parse_address(value)
                        .ok_or_else(|| format!("invalid base address '{value}'"))?;
                }
                _ => {}
            }
        }
        Ok(options)
    }
}

/// Test specification extracted from a listing file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub listing: String,
}

impl TestSpec {
    /// Parse a listing file to extract test specifications
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut listing_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if let Some((command, args)) = parts.split_first() {
                    run_directives.push(RunDirective {
                        command: command.to_string(),
                        args: args.iter().map(|s| s.to_string()).collect(),
                    });
                }
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NOT:") {
                check_directives.push(CheckDirective::CheckNot(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else if trimmed.starts_with("; CHECK") {
                return Err(format!("unknown check directive: {trimmed}"));
            } else {
                listing_lines.push(line);
            }
        }

        if run_directives.is_empty() {
            return Err("no RUN directive".to_string());
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            listing: listing_lines.join("\n"),
        })
    }
}

/// Test runner that dumps listings and validates the output
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a listing test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        for run_dir in &spec.run_directives {
            let output = self.execute_command(&spec.listing, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }
        Ok(())
    }

    /// Dump the listing as `run_dir` asks and return the output
    fn execute_command(&self, listing: &str, run_dir: &RunDirective) -> Result<String, String> {
        let options = run_dir.options()?;
        let arena = Bump::new();
        let session = DumpSession::new(&arena);
        let parsed = parse_listing(&session, listing).map_err(|e| e.to_string())?;

        let mut lines: Vec<String> = Vec::new();
        UnitDumper::new(options, &parsed.symbols, &session).dump(&parsed.unit, &mut lines);
        if self.verbose {
            println!("{} {}:", run_dir.command, run_dir.args.join(" "));
            print!("{}", session.stats());
        }
        Ok(lines.join("\n"))
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;
        let mut pending_nots: Vec<&str> = Vec::new();

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => pending_nots.push(pattern),

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    let Some(idx) = found else {
                        let kind = match directive {
                            CheckDirective::CheckLabel(_) => "CHECK-LABEL",
                            _ => "CHECK",
                        };
                        return Err(format!("{kind}: pattern '{pattern}' not found in output"));
                    };
                    check_absent(&output_lines[line_idx..line_idx + idx], &pending_nots)?;
                    pending_nots.clear();
                    line_idx += idx + 1;
                    if self.verbose {
                        println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    let Some(line) = output_lines.get(line_idx) else {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{pattern}'"));
                    };
                    if !line.contains(pattern.as_str()) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }
                    check_absent(&[], &pending_nots)?;
                    pending_nots.clear();
                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    let Some(line) = output_lines.get(line_idx) else {
                        continue; // End of output counts as empty
                    };
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }
                    pending_nots.clear();
                    line_idx += 1;
                }
            }
        }

        check_absent(&output_lines[line_idx.min(output_lines.len())..], &pending_nots)
    }
}

fn check_absent(lines: &[&str], patterns: &[&str]) -> Result<(), String> {
    for pattern in patterns {
        if let Some(line) = lines.iter().find(|line| line.contains(pattern)) {
            return Err(format!("CHECK-NOT: '{}' found in '{}'", pattern, line));
        }
    }
    Ok(())
}

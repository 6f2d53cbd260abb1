use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufRead},
    path::{Path, PathBuf},
    process::{exit, Command},
};

use clap::Parser;
use console::{style, Term};
use glob::glob;
use regex::Regex;

/// Runs the sample suite against the rox binary.
#[derive(Parser)]
#[command(name = "rox-tester")]
struct Args {
    /// Only run tests whose path, relative to the suite directory, starts with this prefix.
    filter: Option<String>,

    /// The binary under test.
    #[arg(long, default_value = "./target/release/rox")]
    binary: PathBuf,

    /// Directory searched for `.lox` test files.
    #[arg(long, default_value = "samples")]
    suite: PathBuf,
}

struct ExpectedOutput {
    line: usize,
    output: String,
}

impl ExpectedOutput {
    pub fn new(line: usize, output: String) -> Self {
        ExpectedOutput { line, output }
    }
}

struct Patterns {
    expected_output: Regex,
    expected_error: Regex,
    error_line: Regex,
    syntax_error: Regex,
    non_test: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Patterns {
            expected_output: Regex::new(r"// expect: ?(.*)")?,
            expected_error: Regex::new(r"// (Error.*)")?,
            error_line: Regex::new(r"// \[line (\d+)\] (Error.*)")?,
            syntax_error: Regex::new(r"\[line (\d+)\] (Error.+)")?,
            non_test: Regex::new(r"// nontest")?,
        })
    }
}

struct Test {
    path: String,
    expected_output: Vec<ExpectedOutput>,
    expected_errors: BTreeSet<String>,
    expected_exit_code: i32,
    expectations: u32,
}

impl Test {
    fn new(path: String) -> Self {
        Test {
            path,
            expected_output: Vec::new(),
            expected_errors: BTreeSet::new(),
            expected_exit_code: 0,
            expectations: 0,
        }
    }

    /// Collects the expectations embedded in the test file. Returns false if the file is not
    /// a test at all.
    fn parse(&mut self, patterns: &Patterns) -> io::Result<bool> {
        for (line_num, line) in read_lines(&self.path)?.enumerate() {
            let line = line?;

            // Not a test file at all, so ignore it.
            if patterns.non_test.is_match(&line) {
                return Ok(false);
            }

            if let Some(matched) = patterns
                .expected_output
                .captures(&line)
                .and_then(|captures| captures.get(1))
            {
                self.expected_output
                    .push(ExpectedOutput::new(line_num + 1, matched.as_str().to_string()));
                self.expectations += 1;
                continue;
            }

            if let Some(captures) = patterns.error_line.captures(&line) {
                self.expected_errors
                    .insert(format!("[line {}] {}", &captures[1], &captures[2]));
                self.expected_exit_code = 65;
                self.expectations += 1;
                continue;
            }

            if let Some(matched) = patterns
                .expected_error
                .captures(&line)
                .and_then(|captures| captures.get(1))
            {
                self.expected_errors
                    .insert(format!("[line {}] {}", line_num + 1, matched.as_str()));
                self.expected_exit_code = 65;
                self.expectations += 1;
                continue;
            }
        }

        Ok(true)
    }

    fn run(&self, binary: &Path, patterns: &Patterns) -> Vec<String> {
        let mut failures = Vec::new();

        let result = match Command::new(binary).arg(&self.path).output() {
            Ok(result) => result,
            Err(err) => {
                failures.push(format!("Failed to run {}: {}", binary.display(), err));
                return failures;
            }
        };

        // Validate errors
        let mut found_errors = BTreeSet::new();
        let mut unexpected_count = 0;
        for line in String::from_utf8_lossy(&result.stderr).lines() {
            if let Some(captures) = patterns.syntax_error.captures(line) {
                let error = format!("[line {}] {}", &captures[1], &captures[2]);
                if self.expected_errors.contains(&error) {
                    found_errors.insert(error);
                } else {
                    if unexpected_count < 10 {
                        failures.push(format!("Unexpected error: {}", line));
                    }
                    unexpected_count += 1;
                }
            } else if !line.is_empty() {
                if unexpected_count < 10 {
                    failures.push(format!("Unexpected output on stderr: {}", line));
                }
                unexpected_count += 1;
            }
        }
        if unexpected_count > 10 {
            failures.push(format!("(truncated {} more...)", unexpected_count - 10));
        }
        for error in self.expected_errors.difference(&found_errors) {
            failures.push(format!("Missing expected error: {}", error));
        }

        // Validate exit code
        let exit_code = result.status.code();
        if exit_code != Some(self.expected_exit_code) {
            failures.push(format!(
                "Expected return code {} and got {:?}.",
                self.expected_exit_code, exit_code
            ));
        }

        // Validate output
        let stdout = String::from_utf8_lossy(&result.stdout);
        let output_lines: Vec<&str> = stdout.lines().collect();
        for (index, line) in output_lines.iter().enumerate() {
            match self.expected_output.get(index) {
                Some(expected) if expected.output != *line => failures.push(format!(
                    "Expected output '{}' on line {} and got '{}'.",
                    expected.output, expected.line, line
                )),
                Some(_) => {}
                None => failures.push(format!("Got output '{}' when none was expected.", line)),
            }
        }
        for expected in self.expected_output.iter().skip(output_lines.len()) {
            failures.push(format!(
                "Missing expected output '{}' on line {}.",
                expected.output, expected.line
            ));
        }

        failures
    }
}

struct Tester {
    args: Args,
    patterns: Patterns,
    passed: u32,
    failed: u32,
    skipped: u32,
    expectations: u32,
}

impl Tester {
    fn new(args: Args, patterns: Patterns) -> Self {
        Tester {
            args,
            patterns,
            passed: 0,
            failed: 0,
            skipped: 0,
            expectations: 0,
        }
    }

    fn run_suite(&mut self) -> io::Result<bool> {
        let term = Term::stdout();

        let pattern = self.args.suite.join("**").join("*.lox");
        let paths = glob(&pattern.to_string_lossy())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        term.write_line("")?;
        for path in paths {
            let path = path.map_err(|err| err.into_error())?;
            self.run_test(&term, &path)?;
        }

        term.clear_last_lines(1)?;

        if self.failed == 0 {
            println!(
                "All {} tests passed ({} expectations).",
                style(self.passed).green(),
                self.expectations
            );
        } else {
            println!(
                "{} tests passed. {} tests failed.",
                style(self.passed).green(),
                style(self.failed).red()
            );
        }

        Ok(self.failed == 0)
    }

    fn run_test(&mut self, term: &Term, path: &Path) -> io::Result<()> {
        // Check if we are just running a subset of the tests.
        if let Some(filter) = &self.args.filter {
            let test_path = pathdiff::diff_paths(path, &self.args.suite)
                .unwrap_or_else(|| path.to_path_buf());
            if !test_path.to_string_lossy().starts_with(filter.as_str()) {
                return Ok(());
            }
        }

        term.clear_last_lines(1)?;
        term.write_line(&format!(
            "Passed: {} Failed: {} Skipped: {} ({})",
            style(self.passed).green(),
            style(self.failed).red(),
            style(self.skipped).yellow(),
            style(path.display())
        ))?;

        let mut test = Test::new(path.to_string_lossy().into_owned());
        if !test.parse(&self.patterns)? {
            self.skipped += 1;
            return Ok(());
        }
        self.expectations += test.expectations;

        let failures = test.run(&self.args.binary, &self.patterns);
        if failures.is_empty() {
            self.passed += 1;
        } else {
            self.failed += 1;
            term.clear_last_lines(1)?;
            println!("{}: {}", style("FAIL").red(), path.display());
            println!();
            for failure in &failures {
                println!("\t{}", style(failure).blue());
            }
            println!();
            term.write_line("")?;
        }

        Ok(())
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let patterns =
        Patterns::new().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let mut tester = Tester::new(args, patterns);
    if !tester.run_suite()? {
        exit(1);
    }

    Ok(())
}

// Returns an Iterator to the Reader of the lines of the file.
fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}

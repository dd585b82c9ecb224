//! Fixed vocabulary of text markers recognized in workflow run logs.
//!
//! All patterns target the two textual conventions emitted by the
//! unittest-style runners we see in GitHub Actions job logs. They are
//! compiled once and shared; nothing here is user-configurable at runtime.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Failure-block opener: a line beginning with `FAIL:` or `ERROR:`.
    pub static ref FAILURE_MARKER: Regex = Regex::new(r"(?m)^(?:FAIL|ERROR):").unwrap();

    /// Failure-block opener of the older divider format: a line of `=` characters.
    pub static ref DIVIDER_MARKER: Regex = Regex::new(r"(?m)^={6,}\s*$").unwrap();

    /// Test name as the full remainder of the marker line, qualifier included,
    /// e.g. `FAIL: testSPARQLQuery (tests.test_tableQuery.TestTableQuery)`.
    pub static ref TEST_NAME: Regex = Regex::new(r"(?m)^(?:FAIL|ERROR): (.+)$").unwrap();

    /// Test name cut at the first parenthesized qualifier.
    pub static ref TEST_NAME_UNQUALIFIED: Regex =
        Regex::new(r"(?m)^(?:FAIL|ERROR): (.+?)(?:\s\(|$)").unwrap();

    /// Error-type line, e.g. `AssertionError: False is not true`. The closed
    /// set of type names is extended conservatively; a block without any such
    /// line degrades to "Unknown error" downstream, it never fails parsing.
    pub static ref ERROR_MESSAGE: Regex =
        Regex::new(r"(?m)(AssertionError|Error|Exception|ImportError): (.+)$").unwrap();

    /// Source location line, e.g. `File "tests/test_x.py", line 206`.
    pub static ref FILE_LOCATION: Regex = Regex::new(r#"File "(.+?)", line (\d+)"#).unwrap();

    /// Run-summary line, e.g. `Ran 10 tests in 4.462s`.
    pub static ref RUN_SUMMARY: Regex = Regex::new(r"Ran (\d+) tests? in (\d+\.\d+)s").unwrap();

    /// Terminal status marker of a failed run, e.g. `FAILED (failures=1)`.
    pub static ref TERMINAL_FAILED: Regex = Regex::new(r"FAILED \(.+?\)").unwrap();

    /// Terminal status marker of a clean run: a bare `OK` line.
    pub static ref TERMINAL_OK: Regex = Regex::new(r"(?m)^\s*OK\s*$").unwrap();
}

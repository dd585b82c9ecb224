use serde::{Deserialize, Serialize};

use crate::patterns;

/// One failed test recovered from a workflow run log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FailedTest {
    /// Runner-specific test identifier, never empty.
    pub name: String,
    /// Short error description; "Unknown error" when no error-type line was found.
    pub error: String,
    /// Source file of the failure; empty when not recoverable from the text.
    pub file: String,
    /// Source line of the failure; 0 when not recoverable from the text.
    pub line: u32,
}

impl FailedTest {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Failed test: {}\n", self.name));
        out.push_str(&format!("Error: {}\n", self.error));
        if !self.file.is_empty() && self.line > 0 {
            out.push_str(&format!("Location: {}:{}\n", self.file, self.line));
        }
        out
    }
}

/// Aggregate statistics of one test run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestSummary {
    /// Total tests the runner reported; 0 means the summary line was not found.
    pub total_tests: u32,
    /// Elapsed seconds the runner reported; 0 when absent.
    pub time_taken: f64,
    /// Number of failures actually recovered from the log, which may be lower
    /// than the count the runner itself reported.
    pub num_failures: usize,
}

impl TestSummary {
    pub fn render(&self) -> String {
        format!(
            "Test Summary:\nTotal tests: {}\nTime taken: {:.2}s\nNumber of failures: {}\n",
            self.total_tests, self.time_taken, self.num_failures
        )
    }
}

/// Structured analysis of one workflow run log. Constructed once per log by
/// [`LogAnalyzer::analyze`] and immutable afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowRunAnalysis {
    /// "succeeded" or "failed".
    pub build_status: String,
    /// Failed tests in order of first appearance in the log.
    pub failed_tests: Vec<FailedTest>,
    pub test_summary: TestSummary,
}

impl WorkflowRunAnalysis {
    /// Human-readable rendering of the analysis. A pure projection of the
    /// fields, never parsed back.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Build Status: {}\n", self.build_status));
        if self.build_status == "failed" {
            out.push_str("\nFailed Tests:\n");
            for test in &self.failed_tests {
                out.push_str(&test.render());
                out.push('\n');
            }
        }
        out.push_str(&self.test_summary.render());
        out
    }

    pub fn show(&self) {
        println!("{}", self.render());
    }
}

/// Which lines open a test result block. Two historical log formats exist
/// and both stay supported for backward input compatibility.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockConvention {
    /// Blocks open at a `FAIL:` or `ERROR:` line.
    FailureMarkers,
    /// Blocks open at a `======` divider line of the older unittest format.
    Dividers,
}

/// How the overall build status is derived.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Failed iff a terminal `FAILED (...)` marker appears anywhere in the
    /// log, independent of how many structured failures were recovered.
    /// Run-summary counters are accepted anywhere in the log.
    TerminalMarker,
    /// Stricter variant: failed iff at least one structured failure was
    /// recovered, and the run-summary line only counts when its next
    /// non-blank line is `OK` or a `FAILED...` token.
    FailureList,
}

/// How the test name is cut out of the `FAIL:`/`ERROR:` line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// Keep the whole remainder of the line, parenthesized qualifier included.
    FullLine,
    /// Cut at the first ` (` so only the bare test method remains.
    StripQualifier,
}

/// Extracts structured facts from the raw text of one CI job log.
///
/// Purely computational: reads its input, allocates its result, touches no
/// shared state. "Pattern not found" is the only failure mode and always
/// degrades to a documented default instead of erroring, so [`analyze`]
/// returns a plain value.
///
/// [`analyze`]: LogAnalyzer::analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogAnalyzer {
    pub convention: BlockConvention,
    pub status_rule: StatusRule,
    pub name_rule: NameRule,
}

impl Default for LogAnalyzer {
    fn default() -> Self {
        Self {
            convention: BlockConvention::FailureMarkers,
            status_rule: StatusRule::TerminalMarker,
            name_rule: NameRule::FullLine,
        }
    }
}

impl LogAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the log into candidate test result blocks, in order of
    /// appearance. Each block runs from an opener line to the next blank line
    /// or the end of the text, whichever comes first; openers inside an
    /// already emitted block are not re-segmented. A log without any opener
    /// yields an empty list, which covers both "no failures" and "format
    /// unrecognized"; the terminal status marker disambiguates the two.
    pub fn extract_test_blocks<'a>(&self, logs: &'a str) -> Vec<&'a str> {
        let opener = match self.convention {
            BlockConvention::FailureMarkers => &*patterns::FAILURE_MARKER,
            BlockConvention::Dividers => &*patterns::DIVIDER_MARKER,
        };
        let mut blocks = Vec::new();
        let mut pos = 0;
        while pos < logs.len() {
            let m = match opener.find(&logs[pos..]) {
                Some(m) => m,
                None => break,
            };
            let start = pos + m.start();
            let end = logs[start..]
                .find("\n\n")
                .map(|offset| start + offset)
                .unwrap_or(logs.len());
            blocks.push(&logs[start..end]);
            pos = end;
        }
        blocks
    }

    /// Parse one candidate block into a failure record, or `None` for a block
    /// that carries no failure (a divider-only span, or one without a usable
    /// test name). Missing pieces degrade to defaults; malformed blocks never
    /// error.
    pub fn parse_test_block(&self, block: &str) -> Option<FailedTest> {
        if !block.contains("ERROR:") && !block.contains("FAIL:") {
            return None;
        }
        let name_pattern = match self.name_rule {
            NameRule::FullLine => &*patterns::TEST_NAME,
            NameRule::StripQualifier => &*patterns::TEST_NAME_UNQUALIFIED,
        };
        let name = name_pattern
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())?;
        if name.is_empty() {
            return None;
        }

        let error = patterns::ERROR_MESSAGE
            .captures(block)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str().trim_end().to_string())
            .unwrap_or_else(|| "Unknown error".to_string());

        let (file, line) = match patterns::FILE_LOCATION.captures(block) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            ),
            None => (String::new(), 0),
        };

        Some(FailedTest { name, error, file, line })
    }

    /// Recover `(total_tests, time_taken)` from the run-summary line,
    /// independent of block segmentation. `(0, 0.0)` when not found.
    pub fn extract_counters(&self, logs: &str) -> (u32, f64) {
        let caps = match patterns::RUN_SUMMARY.captures(logs) {
            Some(caps) => caps,
            None => return (0, 0.0),
        };
        if self.status_rule == StatusRule::FailureList && !self.summary_is_terminal(logs, &caps) {
            return (0, 0.0);
        }
        let total_tests = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let time_taken = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);
        (total_tests, time_taken)
    }

    /// The stricter acceptance check: the summary line must be immediately
    /// followed by the terminal `OK` / `FAILED...` token on the next
    /// non-blank line.
    fn summary_is_terminal(&self, logs: &str, caps: &regex::Captures) -> bool {
        let end = match caps.get(0) {
            Some(m) => m.end(),
            None => return false,
        };
        // Skip the rest of the summary line itself, then look at the next
        // non-blank line.
        let after_line = logs[end..].splitn(2, '\n').nth(1).unwrap_or("");
        match after_line.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => patterns::TERMINAL_OK.is_match(line) || line.starts_with("FAILED"),
            None => false,
        }
    }

    /// Analyze the full text of one CI job log. Idempotent: the result is a
    /// function of the input text and this analyzer's configuration only.
    pub fn analyze(&self, logs: &str) -> WorkflowRunAnalysis {
        let failed_tests: Vec<FailedTest> = self
            .extract_test_blocks(logs)
            .into_iter()
            .filter_map(|block| self.parse_test_block(block))
            .collect();

        let (total_tests, time_taken) = self.extract_counters(logs);

        let failed = match self.status_rule {
            StatusRule::TerminalMarker => patterns::TERMINAL_FAILED.is_match(logs),
            StatusRule::FailureList => !failed_tests.is_empty(),
        };
        let build_status = if failed { "failed" } else { "succeeded" }.to_string();

        let test_summary = TestSummary {
            total_tests,
            time_taken,
            num_failures: failed_tests.len(),
        };

        WorkflowRunAnalysis {
            build_status,
            failed_tests,
            test_summary,
        }
    }
}

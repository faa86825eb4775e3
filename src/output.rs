//! Rendering of `list` and `check` results

use std::io::Write;

use serde::Serialize;

use crate::check::ModuleCheck;
use crate::module_call::ParsedModuleCall;
use crate::parser::ModuleCallRecord;
use crate::source::SourceType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Markdown table with the essential columns
    #[default]
    Markdown,
    /// Markdown table including path and source
    MarkdownWide,
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
    /// JUnit XML report, one test case per module call
    Junit,
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encode junit xml: {0}")]
    Xml(#[from] quick_xml::SeError),
}

/// One module call in `list` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleRow {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub constraint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl ModuleRow {
    /// Row for a module call; without a parsed call only the raw data is shown
    pub fn new(record: &ModuleCallRecord, parsed: Option<&ParsedModuleCall>) -> Self {
        let mut row = Self {
            path: record.file.display().to_string(),
            name: record.name.clone(),
            source: record.source.clone(),
            constraint: record.version.clone(),
            ..Self::default()
        };
        if let Some(parsed) = parsed {
            row.source_type = Some(parsed.source.source_type());
            row.constraint = parsed.constraints_text.clone();
            row.version = parsed.version_text.clone();
        }
        row
    }
}

/// One module call in `check` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRow {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub constraint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_matching: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_overall: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub matching_update: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub non_matching_update: bool,
}

impl UpdateRow {
    /// Row for a successful check; `None` when the check failed
    pub fn from_check(check: &ModuleCheck) -> Option<Self> {
        let update = check.result.as_ref().ok()?;
        let parsed = check.parsed.as_ref()?;
        Some(Self {
            path: check.record.file.display().to_string(),
            name: check.record.name.clone(),
            source: check.record.source.clone(),
            constraint: parsed.constraints_text.clone(),
            version: parsed.version_text.clone(),
            latest_matching: update.latest_matching_version.clone().unwrap_or_default(),
            latest_overall: update.latest_overall_version.clone().unwrap_or_default(),
            matching_update: update.has_matching_update,
            non_matching_update: update.has_non_matching_update,
        })
    }

    pub fn has_update(&self) -> bool {
        self.matching_update || self.non_matching_update
    }

    /// `Y` for a matching update, `(Y)` for one outside the constraints, `?` when the version is unknown
    fn marker(&self) -> &'static str {
        if self.matching_update {
            "Y"
        } else if self.non_matching_update {
            "(Y)"
        } else if self.version.is_empty() {
            "?"
        } else {
            ""
        }
    }
}

pub fn sort_modules(rows: &mut [ModuleRow]) {
    rows.sort_by(|a, b| (&a.path, &a.name).cmp(&(&b.path, &b.name)));
}

pub fn sort_updates(rows: &mut [UpdateRow]) {
    rows.sort_by(|a, b| (&a.path, &a.name).cmp(&(&b.path, &b.name)));
}

pub fn write_modules<W: Write>(w: &mut W, rows: &[ModuleRow], format: Format) -> Result<(), OutputError> {
    match format {
        Format::Json => write_json(w, rows),
        Format::Jsonl => write_jsonl(w, rows),
        Format::Junit => write_junit(w, rows.iter().map(ModuleRow::test_case).collect()),
        Format::Markdown => write_table(
            w,
            &["Type", "Name", "Constraint", "Version"],
            rows.iter().map(|row| {
                vec![
                    row.source_type.map(|t| t.as_str()).unwrap_or_default(),
                    row.name.as_str(),
                    row.constraint.as_str(),
                    row.version.as_str(),
                ]
            }),
        ),
        Format::MarkdownWide => write_table(
            w,
            &["Type", "Name", "Constraint", "Version", "Source", "Path"],
            rows.iter().map(|row| {
                vec![
                    row.source_type.map(|t| t.as_str()).unwrap_or_default(),
                    row.name.as_str(),
                    row.constraint.as_str(),
                    row.version.as_str(),
                    row.source.as_str(),
                    row.path.as_str(),
                ]
            }),
        ),
    }
}

pub fn write_updates<W: Write>(w: &mut W, rows: &[UpdateRow], format: Format) -> Result<(), OutputError> {
    match format {
        Format::Json => write_json(w, rows),
        Format::Jsonl => write_jsonl(w, rows),
        Format::Junit => write_junit(w, rows.iter().map(UpdateRow::test_case).collect()),
        Format::Markdown => write_table(
            w,
            &["Update?", "Name", "Constraint", "Version", "Latest matching", "Latest"],
            rows.iter().map(|row| {
                vec![
                    row.marker(),
                    row.name.as_str(),
                    row.constraint.as_str(),
                    row.version.as_str(),
                    row.latest_matching.as_str(),
                    row.latest_overall.as_str(),
                ]
            }),
        ),
        Format::MarkdownWide => write_table(
            w,
            &[
                "Update?",
                "Name",
                "Path",
                "Source",
                "Constraint",
                "Version",
                "Latest matching",
                "Latest",
            ],
            rows.iter().map(|row| {
                vec![
                    row.marker(),
                    row.name.as_str(),
                    row.path.as_str(),
                    row.source.as_str(),
                    row.constraint.as_str(),
                    row.version.as_str(),
                    row.latest_matching.as_str(),
                    row.latest_overall.as_str(),
                ]
            }),
        ),
    }
}

fn write_json<W: Write, T: Serialize>(w: &mut W, rows: &[T]) -> Result<(), OutputError> {
    serde_json::to_writer(&mut *w, rows)?;
    writeln!(w)?;
    Ok(())
}

fn write_jsonl<W: Write, T: Serialize>(w: &mut W, rows: &[T]) -> Result<(), OutputError> {
    for row in rows {
        serde_json::to_writer(&mut *w, row)?;
        writeln!(w)?;
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename = "testsuites")]
struct JunitSuites {
    testsuite: JunitSuite,
}

#[derive(Serialize)]
struct JunitSuite {
    #[serde(rename = "@tests")]
    tests: usize,
    #[serde(rename = "@failures")]
    failures: usize,
    #[serde(rename = "@time")]
    time: &'static str,
    testcase: Vec<JunitCase>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct JunitCase {
    #[serde(rename = "@classname")]
    classname: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@time")]
    time: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<JunitFailure>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct JunitFailure {
    #[serde(rename = "@message")]
    message: String,
}

impl JunitCase {
    fn new(path: &str, name: &str, failure: Option<String>) -> Self {
        Self {
            classname: path.to_string(),
            name: name.to_string(),
            time: "0",
            failure: failure.map(|message| JunitFailure { message }),
        }
    }
}

impl ModuleRow {
    /// Fails when the call pins neither a version nor a constraint.
    ///
    /// A git `version` attribute has no effect, so git calls need a ref; local
    /// calls cannot carry either and always pass.
    fn test_case(&self) -> JunitCase {
        let passed = match self.source_type {
            Some(SourceType::Local) => true,
            Some(SourceType::Git) => !self.version.is_empty(),
            _ => !self.version.is_empty() || !self.constraint.is_empty(),
        };
        let failure = (!passed).then(|| {
            "Module reference does not explicitly specify a version or version constraint".to_string()
        });
        JunitCase::new(&self.path, &self.name, failure)
    }
}

impl UpdateRow {
    /// Fails when an update within the constraints exists
    fn test_case(&self) -> JunitCase {
        let failure = self.matching_update.then(|| {
            format!(
                "Module version can be updated to {} (from {})",
                self.latest_matching, self.version
            )
        });
        JunitCase::new(&self.path, &self.name, failure)
    }
}

fn write_junit<W: Write>(w: &mut W, cases: Vec<JunitCase>) -> Result<(), OutputError> {
    let suites = JunitSuites {
        testsuite: JunitSuite {
            tests: cases.len(),
            failures: cases.iter().filter(|case| case.failure.is_some()).count(),
            time: "0",
            testcase: cases,
        },
    };

    let mut xml = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut xml);
    serializer.indent(' ', 2);
    suites.serialize(serializer)?;

    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, "{}", xml)?;
    Ok(())
}

/// Writes a markdown table with columns padded to their widest cell
fn write_table<'a, W, I>(w: &mut W, headers: &[&str], rows: I) -> Result<(), OutputError>
where
    W: Write,
    I: Iterator<Item = Vec<&'a str>>,
{
    let headers: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<&str>> = rows.collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(w, "{}", table_line(&headers, &widths))?;
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(width + 2)).collect();
    writeln!(w, "|{}|", separator.join("|"))?;
    for row in &rows {
        writeln!(w, "{}", table_line(row, &widths))?;
    }
    Ok(())
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {:<width$} ", cell, width = *width))
        .collect();
    format!("|{}|", padded.join("|"))
}

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hellodiff_core::compare::{FieldBody, FieldReport};
use hellodiff_core::{ComparisonReport, DigestConsistency, DigestRecord, Ja3RawPayload};

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const LIGHT_RULE: &str = "──────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid output format '{}'. Expected 'text' or 'json'.", s),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// One NDJSON line.
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "lowercase")]
enum JsonRecord<'a> {
    Capture {
        generated_at: &'a str,
        label: &'a str,
        payload: &'a Ja3RawPayload,
    },
    Field {
        generated_at: &'a str,
        mismatches: usize,
        #[serde(flatten)]
        report: &'a FieldReport,
    },
    Digests {
        generated_at: &'a str,
        label: &'a str,
        ip: IpAddr,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<Vec<&'a str>>,
        digests: Vec<&'a str>,
    },
    Consistency {
        generated_at: &'a str,
        consistent: bool,
        #[serde(flatten)]
        check: &'a DigestConsistency,
    },
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn print_report(report: &ComparisonReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_report_text(report)),
        OutputFormat::Json => {
            for line in render_report_json(report, &timestamp())? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Per-field tables: one column per capture, mismatching rows marked `*`.
pub fn render_report_text(report: &ComparisonReport) -> String {
    let mut out = String::new();
    for field in &report.fields {
        out.push_str(HEAVY_RULE);
        out.push('\n');
        out.push_str(&format!("  {}  ({})\n", field.field, mismatch_summary(field)));
        out.push_str(&format!("  {}\n", LIGHT_RULE));

        match &field.body {
            FieldBody::Scalar(row) => {
                let width = label_width(&report.captures);
                for (label, value) in report.captures.iter().zip(&row.values) {
                    out.push_str(&format!("  {:<width$}  {}\n", label, value, width = width));
                }
            }
            FieldBody::Set { rows } => {
                let width = rows
                    .iter()
                    .map(|r| r.value.len())
                    .chain(std::iter::once("Value".len()))
                    .max()
                    .unwrap_or_default();
                let header: Vec<&str> = report.captures.iter().map(String::as_str).collect();
                out.push_str(&format!(
                    "    {:<width$}  {}\n",
                    "Value",
                    header.join("  "),
                    width = width
                ));
                for row in rows {
                    let marker = if row.is_mismatch() { '*' } else { ' ' };
                    let cells: Vec<String> = row
                        .membership
                        .iter()
                        .zip(&report.captures)
                        .map(|(included, label)| {
                            let mark = if *included { "✓" } else { "-" };
                            format!("{:<w$}", mark, w = label.chars().count())
                        })
                        .collect();
                    out.push_str(
                        format!(
                            "  {} {:<width$}  {}",
                            marker,
                            row.value,
                            cells.join("  "),
                            width = width
                        )
                        .trim_end(),
                    );
                    out.push('\n');
                }
            }
        }
    }

    out.push_str(HEAVY_RULE);
    out.push('\n');
    let mismatched = report.mismatched_fields();
    if mismatched.is_empty() {
        out.push_str(&format!(
            "  Identical across {} captures\n",
            report.captures.len()
        ));
    } else {
        out.push_str(&format!("  Mismatched fields: {}\n", mismatched.join(", ")));
    }
    out
}

/// A `capture` line per capture followed by a `field` line per field.
pub fn render_report_json(
    report: &ComparisonReport,
    generated_at: &str,
) -> serde_json::Result<Vec<String>> {
    let captures = report
        .captures
        .iter()
        .zip(&report.payloads)
        .map(|(label, payload)| JsonRecord::Capture {
            generated_at,
            label,
            payload,
        });
    let fields = report.fields.iter().map(|field| JsonRecord::Field {
        generated_at,
        mismatches: field.mismatches(),
        report: field,
    });
    captures.chain(fields).map(|r| serde_json::to_string(&r)).collect()
}

fn mismatch_summary(field: &FieldReport) -> String {
    match field.mismatches() {
        0 => "match".to_string(),
        1 => "1 mismatch".to_string(),
        n => format!("{} mismatches", n),
    }
}

fn label_width(labels: &[String]) -> usize {
    labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or_default()
}

/// Digests of one capture, grouped by destination.
pub struct DigestListing<'a> {
    pub label: &'a str,
    pub by_ip: &'a BTreeMap<IpAddr, Vec<DigestRecord>>,
}

pub fn print_digests(
    listings: &[DigestListing<'_>],
    consistency: Option<&DigestConsistency>,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_digests_text(listings, consistency, verbose)),
        OutputFormat::Json => {
            for line in render_digests_json(listings, consistency, verbose, &timestamp())? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

pub fn render_digests_text(
    listings: &[DigestListing<'_>],
    consistency: Option<&DigestConsistency>,
    verbose: bool,
) -> String {
    let mut out = String::new();
    for listing in listings {
        out.push_str(HEAVY_RULE);
        out.push('\n');
        out.push_str(&format!("  {}\n", listing.label));
        if listing.by_ip.is_empty() {
            out.push_str("  (no ClientHello digests)\n");
        }
        for (ip, records) in listing.by_ip {
            out.push_str(&format!("  {}\n", LIGHT_RULE));
            out.push_str(&format!("  {}  ({} ClientHellos)\n", ip, records.len()));
            for record in records {
                out.push_str(&format!("    JA3:     {}\n", record.digest));
                if verbose {
                    out.push_str(&format!("    JA3 raw: {}\n", record.raw));
                }
            }
        }
    }

    if let Some(check) = consistency {
        out.push_str(HEAVY_RULE);
        out.push('\n');
        for label in &check.inconsistent_within {
            out.push_str(&format!("  {}: digests differ between requests\n", label));
        }
        if check.consistent_across {
            out.push_str("  Digests consistent across captures\n");
        } else {
            out.push_str("  Digests differ across captures\n");
        }
    }
    out
}

pub fn render_digests_json(
    listings: &[DigestListing<'_>],
    consistency: Option<&DigestConsistency>,
    verbose: bool,
    generated_at: &str,
) -> serde_json::Result<Vec<String>> {
    let mut lines = Vec::new();
    for listing in listings {
        for (ip, records) in listing.by_ip {
            let record = JsonRecord::Digests {
                generated_at,
                label: listing.label,
                ip: *ip,
                raw: verbose.then(|| records.iter().map(|r| r.raw.as_str()).collect()),
                digests: records.iter().map(|r| r.digest.as_str()).collect(),
            };
            lines.push(serde_json::to_string(&record)?);
        }
    }
    if let Some(check) = consistency {
        lines.push(serde_json::to_string(&JsonRecord::Consistency {
            generated_at,
            consistent: check.is_consistent(),
            check,
        })?);
    }
    Ok(lines)
}

//! Field-by-field comparison of canonical payloads across captures.
//!
//! Every field is evaluated for every capture; the report is exhaustive even
//! when the first field already disagrees.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::canon::Canonical;
use crate::capture::DecodeAdapter;
use crate::error::CompareError;
use crate::fingerprint::{extract_payload, Ja3RawPayload};

/// Whether a field holds an unordered set or a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Set,
    Scalar,
}

#[derive(Clone, Copy)]
enum Render {
    Set(fn(&Ja3RawPayload) -> Vec<Member>),
    Scalar(fn(&Ja3RawPayload) -> String),
}

/// One comparable field of [`Ja3RawPayload`] and how to render it.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    render: Render,
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldKind {
        match self.render {
            Render::Set(_) => FieldKind::Set,
            Render::Scalar(_) => FieldKind::Scalar,
        }
    }

    fn evaluate(&self, payloads: &[&Ja3RawPayload]) -> FieldBody {
        match self.render {
            Render::Set(render) => {
                let sets: Vec<Vec<Member>> = payloads.iter().map(|p| render(p)).collect();
                FieldBody::Set {
                    rows: membership_rows(&sets),
                }
            }
            Render::Scalar(render) => {
                let values: Vec<String> = payloads.iter().map(|p| render(p)).collect();
                let equal = values.windows(2).all(|pair| pair[0] == pair[1]);
                FieldBody::Scalar(ScalarRow { values, equal })
            }
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Rendered set member; GREASE members never count as mismatches.
struct Member {
    value: String,
    grease: bool,
}

fn canonical_members<R: std::fmt::Display>(set: &BTreeSet<Canonical<R>>) -> Vec<Member> {
    set.iter()
        .map(|c| Member {
            value: c.to_string(),
            grease: c.is_grease(),
        })
        .collect()
}

fn plain_members(set: &BTreeSet<String>) -> Vec<Member> {
    set.iter()
        .map(|value| Member {
            value: value.clone(),
            grease: false,
        })
        .collect()
}

/// Compared fields, in report order.
pub static FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor {
        name: "tls_version",
        render: Render::Scalar(|p| p.tls_version.to_string()),
    },
    FieldDescriptor {
        name: "ciphers",
        render: Render::Set(|p| canonical_members(&p.ciphers)),
    },
    FieldDescriptor {
        name: "extensions",
        render: Render::Set(|p| canonical_members(&p.extensions)),
    },
    FieldDescriptor {
        name: "elliptic_curves",
        render: Render::Set(|p| canonical_members(&p.elliptic_curves)),
    },
    FieldDescriptor {
        name: "elliptic_curve_formats",
        render: Render::Set(|p| plain_members(&p.elliptic_curve_formats)),
    },
];

/// A set member and, per capture, whether the capture contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub value: String,
    pub membership: Vec<bool>,
    /// The value is the shared GREASE token
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub grease: bool,
}

impl ComparisonRow {
    /// Every capture contains the value.
    pub fn is_agreement(&self) -> bool {
        self.membership.iter().all(|included| *included)
    }

    /// Disagreement that counts against the comparison. Clients pick
    /// GREASE values at random, so their presence is not compared.
    pub fn is_mismatch(&self) -> bool {
        !self.grease && !self.is_agreement()
    }
}

/// The value of a scalar field in each capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarRow {
    pub values: Vec<String>,
    pub equal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldBody {
    Set { rows: Vec<ComparisonRow> },
    Scalar(ScalarRow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: &'static str,
    #[serde(flatten)]
    pub body: FieldBody,
}

impl FieldReport {
    /// Rows that are not shared by every capture (0 or 1 for scalars).
    pub fn mismatches(&self) -> usize {
        match &self.body {
            FieldBody::Set { rows } => rows.iter().filter(|r| r.is_mismatch()).count(),
            FieldBody::Scalar(row) => usize::from(!row.equal),
        }
    }

    pub fn rows(&self) -> &[ComparisonRow] {
        match &self.body {
            FieldBody::Set { rows } => rows,
            FieldBody::Scalar(_) => &[],
        }
    }
}

/// Comparison of N captures; columns follow the caller's capture order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub captures: Vec<String>,
    pub payloads: Vec<Ja3RawPayload>,
    pub fields: Vec<FieldReport>,
}

impl ComparisonReport {
    pub fn field(&self, name: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn payload(&self, label: &str) -> Option<&Ja3RawPayload> {
        self.captures
            .iter()
            .position(|c| c == label)
            .and_then(|idx| self.payloads.get(idx))
    }

    pub fn mismatched_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.mismatches() > 0)
            .map(|f| f.field)
            .collect()
    }

    pub fn is_identical(&self) -> bool {
        self.fields.iter().all(|f| f.mismatches() == 0)
    }
}

/// Union of the per-capture sets with membership vectors, full agreement
/// first. Ties keep first-seen order across captures.
fn membership_rows(sets: &[Vec<Member>]) -> Vec<ComparisonRow> {
    let lookup: Vec<BTreeSet<&str>> = sets
        .iter()
        .map(|set| set.iter().map(|m| m.value.as_str()).collect())
        .collect();

    let mut seen = BTreeSet::new();
    let mut rows: Vec<ComparisonRow> = sets
        .iter()
        .flatten()
        .filter(|member| seen.insert(member.value.as_str()))
        .map(|member| ComparisonRow {
            value: member.value.clone(),
            membership: lookup
                .iter()
                .map(|set| set.contains(member.value.as_str()))
                .collect(),
            grease: member.grease,
        })
        .collect();

    // `true > false`, so descending order favors leading inclusions.
    rows.sort_by(|a, b| b.membership.cmp(&a.membership));
    rows
}

/// Compare payloads that are already extracted.
pub fn compare_payloads(captures: &[(String, Ja3RawPayload)]) -> ComparisonReport {
    let payloads: Vec<&Ja3RawPayload> = captures.iter().map(|(_, p)| p).collect();
    let fields = FIELDS
        .iter()
        .map(|descriptor| FieldReport {
            field: descriptor.name,
            body: descriptor.evaluate(&payloads),
        })
        .collect();

    ComparisonReport {
        captures: captures.iter().map(|(label, _)| label.clone()).collect(),
        payloads: captures.iter().map(|(_, p)| p.clone()).collect(),
        fields,
    }
}

/// Extract and compare every capture.
///
/// The first capture that cannot be fingerprinted aborts the comparison;
/// no report is produced against an incomplete set.
pub fn compare_raw<A>(
    adapter: &A,
    captures: &[(String, PathBuf)],
    target: IpAddr,
) -> Result<ComparisonReport, CompareError>
where
    A: DecodeAdapter + ?Sized,
{
    info!("Comparing {} captures for target {}", captures.len(), target);

    let mut payloads = Vec::with_capacity(captures.len());
    for (label, path) in captures {
        let payload = extract_payload(adapter, path, target).map_err(|source| CompareError {
            label: label.clone(),
            path: path.clone(),
            source,
        })?;
        payloads.push((label.clone(), payload));
    }

    Ok(compare_payloads(&payloads))
}

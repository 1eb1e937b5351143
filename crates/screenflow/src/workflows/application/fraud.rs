//! Stateless fraud scoring over extracted document data.

use super::domain::{DocumentExtraction, DocumentKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const INCOME_MISMATCH_THRESHOLD: f64 = 1_000.0;
const LOW_CONFIDENCE_FLOOR: f64 = 0.7;
const UNUSUALLY_HIGH_MONTHLY_INCOME: f64 = 50_000.0;
const UNUSUALLY_LOW_MONTHLY_INCOME: f64 = 2_000.0;
const REVIEW_SCORE_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    IncomeMismatch,
    LowExtractionConfidence,
    MissingEmployerInfo,
    UnusuallyHighIncome,
    UnusuallyLowIncome,
    MissingIdVerification,
}

impl SignalKind {
    pub const fn label(self) -> &'static str {
        match self {
            SignalKind::IncomeMismatch => "income_mismatch",
            SignalKind::LowExtractionConfidence => "low_extraction_confidence",
            SignalKind::MissingEmployerInfo => "missing_employer_info",
            SignalKind::UnusuallyHighIncome => "unusually_high_income",
            SignalKind::UnusuallyLowIncome => "unusually_low_income",
            SignalKind::MissingIdVerification => "missing_id_verification",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One named anomaly contributing to the fraud score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignal {
    pub kind: SignalKind,
    pub severity: SignalSeverity,
    pub details: String,
}

/// Verdict produced once per run and stored on the subject record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub score: u8,
    pub confidence: f64,
    pub signals: Vec<FraudSignal>,
}

impl FraudAnalysis {
    /// Routing verdict: a flagged score or shaky extraction sends the
    /// application to a human.
    pub fn needs_review(&self) -> bool {
        self.score > REVIEW_SCORE_THRESHOLD || self.confidence < LOW_CONFIDENCE_FLOOR
    }
}

/// Scores a set of per-document extraction results.
///
/// Deterministic and free of I/O: the same extractions always produce the
/// same verdict. Signal checks are independent and additive, evaluated in a
/// fixed order, and the accumulated score is clamped to 100.
pub fn analyze(documents: &[DocumentExtraction]) -> FraudAnalysis {
    let mut signals = Vec::new();
    let mut score: u32 = 0;

    let pay_stub = first_of_kind(documents, DocumentKind::PayStub);
    let tax_return = first_of_kind(documents, DocumentKind::TaxReturn);
    let id_verification = first_of_kind(documents, DocumentKind::IdVerification);

    let monthly_income = pay_stub.and_then(|doc| number_field(&doc.data, "monthly_income"));
    let annual_income = tax_return.and_then(|doc| number_field(&doc.data, "annual_income"));

    // Cross-check declared monthly income against the tax return equivalent.
    if let (Some(monthly), Some(annual)) = (monthly_income, annual_income) {
        let monthly_from_tax = annual / 12.0;
        if (monthly - monthly_from_tax).abs() > INCOME_MISMATCH_THRESHOLD {
            signals.push(FraudSignal {
                kind: SignalKind::IncomeMismatch,
                severity: SignalSeverity::High,
                details: format!(
                    "Pay stub shows ${monthly}/month, but tax return shows ${monthly_from_tax:.0}/month"
                ),
            });
            score += 60;
        }
    }

    let confidence = mean_confidence(documents);
    if confidence < LOW_CONFIDENCE_FLOOR {
        signals.push(FraudSignal {
            kind: SignalKind::LowExtractionConfidence,
            severity: SignalSeverity::Medium,
            details: format!(
                "Average document extraction confidence is only {:.0}%",
                confidence * 100.0
            ),
        });
        score += 30;
    }

    if pay_stub
        .and_then(|doc| doc.data.get("employer_name"))
        .is_none()
    {
        signals.push(FraudSignal {
            kind: SignalKind::MissingEmployerInfo,
            severity: SignalSeverity::Medium,
            details: "Could not extract employer name from pay stub".to_string(),
        });
        score += 20;
    }

    if let Some(monthly) = monthly_income {
        if monthly > UNUSUALLY_HIGH_MONTHLY_INCOME {
            signals.push(FraudSignal {
                kind: SignalKind::UnusuallyHighIncome,
                severity: SignalSeverity::Medium,
                details: format!("Monthly income of ${monthly} is unusually high"),
            });
            score += 25;
        } else if monthly < UNUSUALLY_LOW_MONTHLY_INCOME {
            signals.push(FraudSignal {
                kind: SignalKind::UnusuallyLowIncome,
                severity: SignalSeverity::Low,
                details: format!("Monthly income of ${monthly} may not meet rental requirements"),
            });
            score += 15;
        }
    }

    if id_verification.is_none() {
        signals.push(FraudSignal {
            kind: SignalKind::MissingIdVerification,
            severity: SignalSeverity::Medium,
            details: "No ID verification document found".to_string(),
        });
        score += 20;
    }

    FraudAnalysis {
        score: score.min(100) as u8,
        confidence,
        signals,
    }
}

fn first_of_kind(
    documents: &[DocumentExtraction],
    kind: DocumentKind,
) -> Option<&DocumentExtraction> {
    documents.iter().find(|doc| doc.kind == kind)
}

fn number_field(data: &Value, field: &str) -> Option<f64> {
    data.get(field).and_then(Value::as_f64)
}

fn mean_confidence(documents: &[DocumentExtraction]) -> f64 {
    let total: f64 = documents.iter().map(|doc| doc.confidence).sum();
    total / documents.len().max(1) as f64
}

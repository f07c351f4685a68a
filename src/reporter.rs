/**
This module renders an `F1Agreement` as a Markdown report and flattens it into serializable rows.
*/
use crate::agreement::{AgreementError, F1Agreement};
use itertools::{izip, Itertools};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Inter-annotator agreement report. It is displayed as a Markdown document with GitHub tables.
///
/// # Example
///
/// ```rust
/// use rusiaa::{Annotation, EvaluationMode, F1Agreement, IaaReport, InMemorySource};
///
/// let source = InMemorySource::new()
///     .with_annotations("doc", "ann1", vec![Annotation::textbound("PER", vec![(0, 5)])])
///     .with_annotations("doc", "ann2", vec![Annotation::textbound("PER", vec![(0, 5)])]);
/// let labels = vec![String::from("PER")];
/// let agreement = F1Agreement::from_source(&source, labels, EvaluationMode::Instance, false).unwrap();
/// let report = IaaReport::new(agreement, 2);
///
/// assert!(report.to_string().contains("* Mean F1: 1.00, SD F1: 0.00"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IaaReport {
    agreement: F1Agreement,
    precision: usize,
    one_vs_rest: Option<String>,
    matrix: bool,
}

impl IaaReport {
    pub fn new(agreement: F1Agreement, precision: usize) -> Self {
        Self {
            agreement,
            precision,
            one_vs_rest: None,
            matrix: false,
        }
    }

    /// Adds the agreement of `annotator` with the other annotators to the report.
    pub fn one_vs_rest(mut self, annotator: &str) -> Result<Self, AgreementError> {
        if !self.agreement.annotators().iter().any(|a| a == annotator) {
            return Err(AgreementError::UnknownAnnotator(String::from(annotator)));
        }
        self.one_vs_rest = Some(String::from(annotator));
        Ok(self)
    }

    /// Adds the pairwise F1 matrix to the report.
    pub fn with_matrix(mut self, matrix: bool) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn agreement(&self) -> &F1Agreement {
        &self.agreement
    }

    fn score(&self, value: f64) -> String {
        format_score(value, self.precision)
    }

    fn mean_sd_line(&self, (mean, sd): (f64, f64)) -> String {
        format!("* Mean F1: {}, SD F1: {}", self.score(mean), self.score(sd))
    }

    fn mean_sd_table(&self, header: &str, names: &[String], mean: &[f64], sd: &[f64]) -> String {
        let rows = izip!(names, mean, sd)
            .map(|(name, &mean, &sd)| (name.clone(), vec![mean, sd]))
            .collect_vec();
        github_table(header, &["Mean F1", "SD F1"], &rows, self.precision)
    }

    /// Renders the report as Markdown.
    pub fn render(&self) -> Result<String, AgreementError> {
        let agreement = &self.agreement;
        let mut sections = vec![
            String::from("# Inter-Annotator Agreement Report"),
            format!("* {} F1 agreement", agreement.mode()),
            String::from("## Project Setup"),
            format!(
                "* {} annotators: {}\n* {} agreement documents\n* {} labels",
                agreement.annotators().len(),
                agreement.annotators().join(", "),
                agreement.documents().len(),
                agreement.labels().len()
            ),
        ];

        let (mean, sd) = agreement.mean_sd_per_document();
        sections.push(String::from("## Agreement per Document"));
        sections.push(self.mean_sd_table(
            "Document",
            agreement.documents(),
            mean.as_slice().unwrap_or_default(),
            sd.as_slice().unwrap_or_default(),
        ));

        let (mean, sd) = agreement.mean_sd_per_label();
        sections.push(String::from("## Agreement per Label"));
        sections.push(self.mean_sd_table(
            "Label",
            agreement.labels(),
            mean.as_slice().unwrap_or_default(),
            sd.as_slice().unwrap_or_default(),
        ));

        sections.push(String::from("## Overall Agreement"));
        sections.push(self.mean_sd_line(agreement.mean_sd_total()));

        if let Some(annotator) = &self.one_vs_rest {
            let (mean, sd) = agreement.mean_sd_per_label_one_vs_rest(annotator)?;
            sections.push(format!("## Agreement of {} vs. Rest", annotator));
            sections.push(self.mean_sd_table(
                "Label",
                agreement.labels(),
                mean.as_slice().unwrap_or_default(),
                sd.as_slice().unwrap_or_default(),
            ));
            sections.push(self.mean_sd_line(agreement.mean_sd_total_one_vs_rest(annotator)?));
        }

        if self.matrix {
            let matrix = agreement.compute_total_f1_matrix();
            let rows = agreement
                .annotators()
                .iter()
                .zip(matrix.rows())
                .map(|(annotator, row)| (annotator.clone(), row.to_vec()))
                .collect_vec();
            let columns = agreement.annotators().iter().map(String::as_str).collect_vec();
            sections.push(String::from("## Pairwise F1 Matrix"));
            sections.push(github_table("Annotator", &columns, &rows, self.precision));
        }

        Ok(sections.join("\n\n") + "\n")
    }

    /// Flattens the scores of the report into rows, one per document, label and overall score.
    pub fn rows(&self) -> Result<Vec<AgreementRow>, AgreementError> {
        let agreement = &self.agreement;
        let mut rows = Vec::new();
        let (mean, sd) = agreement.mean_sd_per_document();
        rows.extend(AgreementRow::many(Scope::Document, None, agreement.documents(), &mean, &sd));
        let (mean, sd) = agreement.mean_sd_per_label();
        rows.extend(AgreementRow::many(Scope::Label, None, agreement.labels(), &mean, &sd));
        let (mean, sd) = agreement.mean_sd_total();
        rows.push(AgreementRow {
            scope: Scope::Overall,
            annotator: None,
            name: String::from("Overall"),
            mean,
            sd,
        });
        if let Some(annotator) = &self.one_vs_rest {
            let (mean, sd) = agreement.mean_sd_per_label_one_vs_rest(annotator)?;
            rows.extend(AgreementRow::many(
                Scope::Label,
                Some(annotator),
                agreement.labels(),
                &mean,
                &sd,
            ));
            let (mean, sd) = agreement.mean_sd_total_one_vs_rest(annotator)?;
            rows.push(AgreementRow {
                scope: Scope::Overall,
                annotator: Some(annotator.clone()),
                name: String::from("Overall"),
                mean,
                sd,
            });
        }
        Ok(rows)
    }
}

impl Display for IaaReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let report = self.render().map_err(|_| std::fmt::Error)?;
        write!(f, "{}", report)
    }
}

/// Slice of the agreement a row belongs to.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Document,
    Label,
    Overall,
}

/// A single score of the report. The `annotator` is set for the one-vs-rest scores. NaN scores
/// are serialized as `null` by JSON serializers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementRow {
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub annotator: Option<String>,
    pub name: String,
    pub mean: f64,
    pub sd: f64,
}

impl AgreementRow {
    fn many<'a>(
        scope: Scope,
        annotator: Option<&'a String>,
        names: &'a [String],
        mean: &'a ndarray::Array1<f64>,
        sd: &'a ndarray::Array1<f64>,
    ) -> impl Iterator<Item = AgreementRow> + 'a {
        izip!(names, mean, sd).map(move |(name, &mean, &sd)| AgreementRow {
            scope,
            annotator: annotator.cloned(),
            name: name.clone(),
            mean,
            sd,
        })
    }
}

/// Formats a score with `precision` digits. NaN is written `nan`.
pub fn format_score(value: f64, precision: usize) -> String {
    if value.is_nan() {
        String::from("nan")
    } else {
        format!("{:.*}", precision, value)
    }
}

/// Renders a GitHub flavored Markdown table. The first column holds names and is left aligned, the
/// other columns hold scores and are right aligned.
fn github_table(
    name_header: &str,
    score_headers: &[&str],
    rows: &[(String, Vec<f64>)],
    precision: usize,
) -> String {
    let cells = rows
        .iter()
        .map(|(name, scores)| {
            let mut line = vec![name.clone()];
            line.extend(scores.iter().map(|&s| format_score(s, precision)));
            line
        })
        .collect_vec();
    let headers = std::iter::once(name_header)
        .chain(score_headers.iter().copied())
        .collect_vec();
    let widths = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            cells
                .iter()
                .filter_map(|line| line.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect_vec();
    let format_line = |line: Vec<&str>| {
        let padded = line
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(col, (cell, &width))| {
                if col == 0 {
                    format!("{:<width$}", cell)
                } else {
                    format!("{:>width$}", cell)
                }
            })
            .join(" | ");
        format!("| {} |", padded)
    };
    let separator = widths.iter().map(|w| "-".repeat(w + 2)).join("|");
    let mut lines = vec![format_line(headers), format!("|{}|", separator)];
    lines.extend(
        cells
            .iter()
            .map(|line| format_line(line.iter().map(String::as_str).collect())),
    );
    lines.join("\n")
}

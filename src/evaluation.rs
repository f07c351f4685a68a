/**
This module compares the annotations of two annotators on a single document and splits them into
true positives, false positives and false negatives. The first annotator is considered to be the
reference (expected) and the second one the prediction.
*/
use ahash::{AHashMap, AHashSet};
use brat_reader::Textbound;
use enum_iterator::Sequence;
use itertools::repeat_n;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use token_overlap::{OverlapError, Span, TokenOverlap};

use crate::tensor::CountKind;

/// Kind of annotation. Only textbound annotations take part in the agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationKind {
    Textbound,
}

impl Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Textbound => write!(f, "T"),
        }
    }
}

/// A single annotation. Two annotations are equal if they have the same kind, label and offsets,
/// regardless of the annotator or of the annotation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub label: String,
    pub offsets: Vec<Span>,
}

impl Annotation {
    pub fn textbound<S: Into<String>>(label: S, offsets: Vec<Span>) -> Self {
        Self {
            kind: AnnotationKind::Textbound,
            label: label.into(),
            offsets,
        }
    }
}

impl From<Textbound> for Annotation {
    fn from(value: Textbound) -> Self {
        Self::textbound(value.label, value.spans)
    }
}

impl Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {:?})", self.kind, self.label, self.offsets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("Token-based evaluation requires the tokens of the document")]
    MissingTokens,
    #[error(transparent)]
    Overlap(#[from] OverlapError),
}

/// Result of the comparison of two annotation sets. The annotations are kept as is; they are
/// counted by the accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub true_positives: Vec<Annotation>,
    pub false_positives: Vec<Annotation>,
    pub false_negatives: Vec<Annotation>,
}

impl Comparison {
    pub fn get(&self, kind: CountKind) -> &[Annotation] {
        match kind {
            CountKind::TruePositive => &self.true_positives,
            CountKind::FalsePositive => &self.false_positives,
            CountKind::FalseNegative => &self.false_negatives,
        }
    }
}

/// Strategy used to compare the annotations of two annotators.
pub trait Evaluator: Send + Sync {
    /// * `expected`: Annotations of the first annotator of the pair
    /// * `predicted`: Annotations of the second annotator of the pair
    /// * `tokens`: Token lookup of the document, if it was computed
    fn compare(
        &self,
        expected: &[Annotation],
        predicted: &[Annotation],
        tokens: Option<&TokenOverlap>,
    ) -> Result<Comparison, EvaluationError>;

    /// Does this evaluator need the tokens of the document?
    fn needs_tokens(&self) -> bool {
        false
    }
}

/// Exact span match. The annotations of each annotator are treated as a set: duplicates collapse.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceEvaluator;

impl Evaluator for InstanceEvaluator {
    fn compare(
        &self,
        expected: &[Annotation],
        predicted: &[Annotation],
        _tokens: Option<&TokenOverlap>,
    ) -> Result<Comparison, EvaluationError> {
        let expected: AHashSet<&Annotation> = expected.iter().collect();
        let predicted: AHashSet<&Annotation> = predicted.iter().collect();
        Ok(Comparison {
            true_positives: expected.intersection(&predicted).copied().cloned().collect(),
            false_positives: predicted.difference(&expected).copied().cloned().collect(),
            false_negatives: expected.difference(&predicted).copied().cloned().collect(),
        })
    }
}

/// Token overlap match. Annotations are split into one annotation per overlapping token before
/// being compared, so long annotations weigh more than short ones. Sub-token annotations are
/// expanded to full tokens.
///
/// Duplicated source annotations are removed first, but two different annotations overlapping the
/// same token produce that token twice: the comparison uses multiset semantics. Boundary errors
/// between adjacent annotations with the same label are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEvaluator;

impl TokenEvaluator {
    fn expand(
        annotations: &[Annotation],
        tokens: &TokenOverlap,
    ) -> Result<AHashMap<Annotation, usize>, OverlapError> {
        let unique: AHashSet<&Annotation> = annotations.iter().collect();
        let mut bag: AHashMap<Annotation, usize> = AHashMap::with_capacity(unique.len());
        for annotation in unique {
            for &(start, end) in annotation.offsets.iter() {
                for &span in tokens.overlapping_tokens(start, end)? {
                    let token_annotation = Annotation {
                        kind: annotation.kind,
                        label: annotation.label.clone(),
                        offsets: vec![span],
                    };
                    *bag.entry(token_annotation).or_insert(0) += 1;
                }
            }
        }
        Ok(bag)
    }
}

impl Evaluator for TokenEvaluator {
    fn compare(
        &self,
        expected: &[Annotation],
        predicted: &[Annotation],
        tokens: Option<&TokenOverlap>,
    ) -> Result<Comparison, EvaluationError> {
        let tokens = tokens.ok_or(EvaluationError::MissingTokens)?;
        let expected = Self::expand(expected, tokens)?;
        let predicted = Self::expand(predicted, tokens)?;
        let mut comparison = Comparison::default();
        for (annotation, &expected_count) in expected.iter() {
            let predicted_count = predicted.get(annotation).copied().unwrap_or(0);
            let common = expected_count.min(predicted_count);
            comparison
                .true_positives
                .extend(repeat_n(annotation.clone(), common));
            comparison
                .false_negatives
                .extend(repeat_n(annotation.clone(), expected_count - common));
        }
        for (annotation, &predicted_count) in predicted.iter() {
            let expected_count = expected.get(annotation).copied().unwrap_or(0);
            let extra = predicted_count.saturating_sub(expected_count);
            comparison
                .false_positives
                .extend(repeat_n(annotation.clone(), extra));
        }
        Ok(comparison)
    }

    fn needs_tokens(&self) -> bool {
        true
    }
}

/// Granularity of the comparison. The `EvaluationMode` is chosen once per computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Sequence, Serialize, Deserialize,
)]
pub enum EvaluationMode {
    /// Exact span match of whole annotations
    #[default]
    Instance,
    /// Match of the tokens covered by the annotations
    Token,
}

impl EvaluationMode {
    pub fn evaluator(&self) -> Box<dyn Evaluator> {
        match self {
            Self::Instance => Box::new(InstanceEvaluator),
            Self::Token => Box::new(TokenEvaluator),
        }
    }
}

impl Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::Instance => "Instance-based",
            Self::Token => "Token-based",
        };
        write!(f, "{}", str_content)
    }
}

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone, Error)]
#[error("Impossible to parse the string ({0}) into an EvaluationMode")]
pub struct EvaluationModeParsingError(String);

impl FromStr for EvaluationMode {
    type Err = EvaluationModeParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instance" | "exact" => Ok(Self::Instance),
            "token" | "tokens" => Ok(Self::Token),
            _ => Err(EvaluationModeParsingError(String::from(s))),
        }
    }
}

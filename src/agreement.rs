/**
This module gathers the counts of every pair of annotators into a `CountsTensor` and derives the
F1 agreement statistics from it. The computation has two states: the `Accumulator` is filled one
document at a time, and once every document has been seen it is frozen into an `F1Agreement`
which only answers queries.
*/
use crate::evaluation::{Annotation, Comparison, EvaluationError, EvaluationMode, Evaluator};
use crate::input::{AnnFile, Document, InputError, InputSource};
use crate::metrics::{mean_sd, MeanSd};
use crate::tensor::{
    f1_per_pair, f1_per_pair_and_document, f1_per_pair_and_label, CountKind, CountsTensor,
    PAIR_AXIS,
};
use ahash::AHashMap;
use enum_iterator::all;
use itertools::Itertools;
use ndarray::prelude::*;
use rayon::prelude::*;
use thiserror::Error;
use token_overlap::TokenOverlap;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum AgreementError {
    #[error("At least two annotators are needed to compute an agreement, got {0}")]
    TooFewAnnotators(usize),
    #[error("Unknown label `{label}` found in document `{document}`. Is it declared in annotation.conf?")]
    UnknownLabel { label: String, document: String },
    #[error("More documents than the {expected} declared ones")]
    TooManyDocuments { expected: usize },
    #[error("Unknown document `{0}`")]
    UnknownDocument(String),
    #[error("Document `{0}` was added more than once")]
    DuplicateDocument(String),
    #[error("Unknown annotator `{0}`")]
    UnknownAnnotator(String),
    #[error("Annotator `{annotator}` appears more than once in document `{document}`")]
    DuplicateAnnotator { annotator: String, document: String },
    #[error("No label was given and the project does not declare any")]
    MissingLabels,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Unordered pairs of annotators, identified by their position on the annotator axis. The pairs
/// are enumerated in lexicographic order: (0, 1), (0, 2), ..., (1, 2), ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIndex {
    num_annotators: usize,
    pairs: Vec<(usize, usize)>,
}

impl PairIndex {
    pub fn new(num_annotators: usize) -> Self {
        Self {
            num_annotators,
            pairs: (0..num_annotators).tuple_combinations().collect(),
        }
    }

    /// Sorts the two positions of a pair.
    #[inline]
    pub fn canonical(a: usize, b: usize) -> (usize, usize) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Slot of the pair on the pair axis, in either order. Returns `None` for a pair made of the
    /// same annotator twice or of an unknown position.
    pub fn get(&self, a: usize, b: usize) -> Option<usize> {
        let (i, j) = Self::canonical(a, b);
        if i == j || j >= self.num_annotators {
            return None;
        }
        // pairs starting before `i`, then the offset of `j` among the pairs starting at `i`
        Some(i * self.num_annotators - i * (i + 1) / 2 + (j - i - 1))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn num_annotators(&self) -> usize {
        self.num_annotators
    }

    /// Canonical pairs, indexed by slot.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Slots of the pairs containing `annotator`, in ascending order.
    pub fn involving(&self, annotator: usize) -> Vec<usize> {
        self.pairs
            .iter()
            .positions(|&(a, b)| a == annotator || b == annotator)
            .collect()
    }
}

fn index_map(values: &[String]) -> AHashMap<String, usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (v.clone(), i))
        .collect()
}

/// Building state of the agreement computation. The annotators, documents and labels are fixed at
/// construction; documents are then added one by one with `add_document`.
pub struct Accumulator {
    annotators: Vec<String>,
    documents: Vec<String>,
    labels: Vec<String>,
    annotator2index: AHashMap<String, usize>,
    document2index: AHashMap<String, usize>,
    label2index: AHashMap<String, usize>,
    pairs: PairIndex,
    counts: CountsTensor,
    mode: EvaluationMode,
    evaluator: Box<dyn Evaluator>,
    parallel: bool,
    num_seen_documents: usize,
    seen: Vec<bool>,
}

impl Accumulator {
    /// * `annotators`: Sorted and deduplicated before use
    /// * `documents`: Deduplicated, order is kept
    /// * `labels`: Deduplicated, order is kept
    /// * `mode`: Granularity of the comparison
    pub fn new(
        annotators: Vec<String>,
        documents: Vec<String>,
        labels: Vec<String>,
        mode: EvaluationMode,
    ) -> Result<Self, AgreementError> {
        let annotators: Vec<String> = annotators.into_iter().sorted().dedup().collect();
        if annotators.len() < 2 {
            return Err(AgreementError::TooFewAnnotators(annotators.len()));
        }
        let documents: Vec<String> = documents.into_iter().unique().collect();
        let labels: Vec<String> = labels.into_iter().unique().collect();
        let pairs = PairIndex::new(annotators.len());
        info!(
            annotators = annotators.len(),
            pairs = pairs.len(),
            documents = documents.len(),
            labels = labels.len(),
            %mode,
            "allocating the counts tensor"
        );
        let counts = CountsTensor::zeros(pairs.len(), documents.len(), labels.len());
        let seen = vec![false; documents.len()];
        Ok(Self {
            annotator2index: index_map(&annotators),
            document2index: index_map(&documents),
            label2index: index_map(&labels),
            annotators,
            documents,
            labels,
            pairs,
            counts,
            mode,
            evaluator: mode.evaluator(),
            parallel: false,
            num_seen_documents: 0,
            seen,
        })
    }

    /// Runs the comparisons of the pairs of a document on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compares every pair of annotators present on `document` and adds the resulting counts.
    pub fn add_document<S: InputSource + ?Sized>(
        &mut self,
        source: &S,
        document: &Document,
    ) -> Result<(), AgreementError> {
        if self.num_seen_documents >= self.documents.len() {
            return Err(AgreementError::TooManyDocuments {
                expected: self.documents.len(),
            });
        }
        let doc_index = *self
            .document2index
            .get(&document.doc_id)
            .ok_or_else(|| AgreementError::UnknownDocument(document.doc_id.clone()))?;
        if self.seen[doc_index] {
            return Err(AgreementError::DuplicateDocument(document.doc_id.clone()));
        }
        self.seen[doc_index] = true;
        self.num_seen_documents += 1;

        let mut present: Vec<(usize, &AnnFile)> = Vec::with_capacity(document.ann_files.len());
        for ann_file in document.ann_files.iter() {
            let index = *self
                .annotator2index
                .get(&ann_file.annotator_id)
                .ok_or_else(|| AgreementError::UnknownAnnotator(ann_file.annotator_id.clone()))?;
            present.push((index, ann_file));
        }
        present.sort_by_key(|(index, _)| *index);
        if let Some(((_, duplicate), _)) = present.iter().tuple_windows().find(|(a, b)| a.0 == b.0)
        {
            return Err(AgreementError::DuplicateAnnotator {
                annotator: duplicate.annotator_id.clone(),
                document: document.doc_id.clone(),
            });
        }
        debug!(
            document = %document.doc_id,
            annotators = present.len(),
            "adding document"
        );

        let annotations: Vec<Vec<Annotation>> = present
            .iter()
            .map(|(_, ann_file)| source.read_annotations(ann_file))
            .collect::<Result<_, _>>()?;
        let tokens = if self.evaluator.needs_tokens() {
            Some(TokenOverlap::from_text(&source.read_text(document)?))
        } else {
            None
        };

        // (slot, expected, predicted), the lower axis position being the expected one
        let jobs: Vec<(usize, usize, usize)> = (0..present.len())
            .tuple_combinations()
            .filter_map(|(i, j)| {
                self.pairs
                    .get(present[i].0, present[j].0)
                    .map(|slot| (slot, i, j))
            })
            .collect();
        let evaluator = self.evaluator.as_ref();
        let compare = |&(slot, i, j): &(usize, usize, usize)| {
            evaluator
                .compare(&annotations[i], &annotations[j], tokens.as_ref())
                .map(|comparison| (slot, comparison))
        };
        let comparisons: Vec<Result<(usize, Comparison), EvaluationError>> = if self.parallel {
            jobs.par_iter().map(compare).collect()
        } else {
            jobs.iter().map(compare).collect()
        };

        for result in comparisons {
            let (slot, comparison) = result?;
            self.fold(slot, doc_index, &comparison)?;
        }
        Ok(())
    }

    fn fold(
        &mut self,
        slot: usize,
        doc_index: usize,
        comparison: &Comparison,
    ) -> Result<(), AgreementError> {
        for kind in all::<CountKind>() {
            for annotation in comparison.get(kind) {
                let Some(&label) = self.label2index.get(&annotation.label) else {
                    let (a, b) = self.pairs.pairs()[slot];
                    error!(
                        label = %annotation.label,
                        document = %self.documents[doc_index],
                        pair = %format!("{} vs. {}", self.annotators[a], self.annotators[b]),
                        known_labels = ?self.labels,
                        "unknown label, every label must be declared in the [entities] section of annotation.conf"
                    );
                    return Err(AgreementError::UnknownLabel {
                        label: annotation.label.clone(),
                        document: self.documents[doc_index].clone(),
                    });
                };
                self.counts.increment(slot, doc_index, kind, label);
            }
        }
        Ok(())
    }

    /// Freezes the counts.
    pub fn finish(self) -> F1Agreement {
        if self.num_seen_documents < self.documents.len() {
            warn!(
                expected = self.documents.len(),
                seen = self.num_seen_documents,
                "fewer documents than declared, the missing ones count as empty"
            );
        }
        F1Agreement {
            annotators: self.annotators,
            documents: self.documents,
            labels: self.labels,
            pairs: self.pairs,
            counts: self.counts,
            mode: self.mode,
        }
    }
}

/// Enumerates the documents of a source once and returns the sorted annotators and the sorted
/// documents.
pub fn collect_annotators_and_documents<S: InputSource + ?Sized>(
    source: &S,
) -> Result<(Vec<String>, Vec<String>), InputError> {
    let mut annotators = Vec::new();
    let mut documents = Vec::new();
    for document in source.documents()? {
        annotators.extend(document.ann_files.into_iter().map(|f| f.annotator_id));
        documents.push(document.doc_id);
    }
    let annotators = annotators.into_iter().sorted().dedup().collect();
    let documents = documents.into_iter().sorted().dedup().collect();
    Ok((annotators, documents))
}

/// F1 agreement between every pair of annotators, for every document and every label.
///
/// The scores are computed by first summing the counts, then computing one F1 score per pair and
/// finally taking the mean and the (population) standard deviation over the pairs. A score is NaN
/// when neither annotator of the pair produced any annotation in the slice; NaN propagates to the
/// mean and the standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct F1Agreement {
    annotators: Vec<String>,
    documents: Vec<String>,
    labels: Vec<String>,
    pairs: PairIndex,
    counts: CountsTensor,
    mode: EvaluationMode,
}

impl F1Agreement {
    /// Discovers the annotators and documents of `source`, then compares every pair of annotators
    /// on every document.
    pub fn from_source<S: InputSource + ?Sized>(
        source: &S,
        labels: Vec<String>,
        mode: EvaluationMode,
        parallel: bool,
    ) -> Result<Self, AgreementError> {
        let (annotators, documents) = collect_annotators_and_documents(source)?;
        Self::with_universe(source, annotators, documents, labels, mode, parallel)
    }

    /// Same as `from_source`, with the annotators and documents given by the caller.
    pub fn with_universe<S: InputSource + ?Sized>(
        source: &S,
        annotators: Vec<String>,
        documents: Vec<String>,
        labels: Vec<String>,
        mode: EvaluationMode,
        parallel: bool,
    ) -> Result<Self, AgreementError> {
        let mut accumulator =
            Accumulator::new(annotators, documents, labels, mode)?.parallel(parallel);
        for document in source.documents()? {
            accumulator.add_document(source, &document)?;
        }
        Ok(accumulator.finish())
    }

    pub fn annotators(&self) -> &[String] {
        &self.annotators
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn pairs(&self) -> &PairIndex {
        &self.pairs
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn counts(&self) -> ArrayView4<'_, usize> {
        self.counts.view()
    }

    fn annotator_index(&self, annotator: &str) -> Result<usize, AgreementError> {
        self.annotators
            .iter()
            .position(|a| a == annotator)
            .ok_or_else(|| AgreementError::UnknownAnnotator(String::from(annotator)))
    }

    /// Mean and standard deviation of the F1 scores of each label, in `labels()` order.
    pub fn mean_sd_per_label(&self) -> MeanSd<Ix1> {
        let counts = self.counts.sum_over_documents();
        mean_sd(f1_per_pair_and_label(counts.view()).view())
    }

    /// Mean and standard deviation of the F1 scores of each document, in `documents()` order.
    pub fn mean_sd_per_document(&self) -> MeanSd<Ix1> {
        let counts = self.counts.sum_over_labels();
        mean_sd(f1_per_pair_and_document(counts.view()).view())
    }

    pub fn mean_sd_total(&self) -> (f64, f64) {
        let counts = self.counts.sum_over_documents_and_labels();
        let (mean, sd) = mean_sd(f1_per_pair(counts.view()).view());
        (mean.into_scalar(), sd.into_scalar())
    }

    /// Same as `mean_sd_per_label`, restricted to the pairs containing `annotator`.
    pub fn mean_sd_per_label_one_vs_rest(
        &self,
        annotator: &str,
    ) -> Result<MeanSd<Ix1>, AgreementError> {
        let slots = self.pairs.involving(self.annotator_index(annotator)?);
        let counts = self.counts.sum_over_documents();
        let f1 = f1_per_pair_and_label(counts.view()).select(PAIR_AXIS, &slots);
        let (mean, mut sd) = mean_sd(f1.view());
        if slots.len() == 1 {
            sd.fill(0.0);
        }
        Ok((mean, sd))
    }

    /// Same as `mean_sd_total`, restricted to the pairs containing `annotator`.
    pub fn mean_sd_total_one_vs_rest(&self, annotator: &str) -> Result<(f64, f64), AgreementError> {
        let slots = self.pairs.involving(self.annotator_index(annotator)?);
        let counts = self.counts.sum_over_documents_and_labels();
        let f1 = f1_per_pair(counts.view()).select(PAIR_AXIS, &slots);
        let (mean, sd) = mean_sd(f1.view());
        let sd = if slots.len() == 1 {
            0.0
        } else {
            sd.into_scalar()
        };
        Ok((mean.into_scalar(), sd))
    }

    /// Overall F1 score of every pair of annotators as a symmetric matrix, with ones on the
    /// diagonal. Rows and columns follow `annotators()`.
    pub fn compute_total_f1_matrix(&self) -> Array2<f64> {
        let counts = self.counts.sum_over_documents_and_labels();
        let f1 = f1_per_pair(counts.view());
        let mut matrix = Array2::eye(self.annotators.len());
        for (slot, &(a, b)) in self.pairs.pairs().iter().enumerate() {
            matrix[[a, b]] = f1[slot];
            matrix[[b, a]] = f1[slot];
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Documents, InMemorySource};
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| String::from(*v)).collect()
    }

    fn l(start: usize, end: usize) -> Annotation {
        Annotation::textbound("L", vec![(start, end)])
    }

    /// a and b agree, c disagrees with both.
    fn three_annotators() -> InMemorySource {
        InMemorySource::new()
            .with_annotations("doc", "c", vec![l(2, 3)])
            .with_annotations("doc", "a", vec![l(0, 1)])
            .with_annotations("doc", "b", vec![l(0, 1)])
    }

    fn compute(source: &InMemorySource, parallel: bool) -> F1Agreement {
        F1Agreement::from_source(source, strings(&["L"]), EvaluationMode::Instance, parallel)
            .unwrap()
    }

    #[test]
    fn test_pair_index() {
        let index = PairIndex::new(4);
        assert_eq!(index.len(), 6);
        assert_eq!(
            index.pairs(),
            &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
        for &(a, b) in index.pairs() {
            assert_eq!(index.get(a, b), index.get(b, a));
            assert!(index.get(a, b).is_some());
        }
        assert_eq!(index.get(2, 2), None);
        assert_eq!(index.get(0, 4), None);
        assert_eq!(index.involving(1), vec![0, 3, 4]);
        assert_eq!(index.involving(3), vec![2, 4, 5]);
    }

    #[test]
    fn test_pair_index_covers_every_pair_once() {
        fn slots_are_symmetric_and_distinct(n: u8) -> TestResult {
            let n = usize::from(n % 40);
            if n < 2 {
                return TestResult::discard();
            }
            let index = PairIndex::new(n);
            if index.len() != n * (n - 1) / 2 {
                return TestResult::failed();
            }
            let mut slots = Vec::with_capacity(index.len());
            for a in 0..n {
                for b in 0..n {
                    let slot = index.get(a, b);
                    if a == b {
                        if slot.is_some() {
                            return TestResult::failed();
                        }
                        continue;
                    }
                    if slot != index.get(b, a) {
                        return TestResult::failed();
                    }
                    if a < b {
                        slots.extend(slot);
                    }
                }
            }
            let expected: Vec<usize> = (0..index.len()).collect();
            let canonical = index
                .pairs()
                .iter()
                .enumerate()
                .all(|(slot, &(a, b))| index.get(a, b) == Some(slot));
            TestResult::from_bool(slots == expected && canonical && index.get(0, n).is_none())
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(slots_are_symmetric_and_distinct as fn(u8) -> TestResult)
    }

    #[test]
    fn test_f1_matrix_is_symmetric_with_unit_diagonal() {
        fn matrix_is_symmetric(spans: Vec<(u8, u8, u8)>) -> TestResult {
            if spans.is_empty() {
                return TestResult::discard();
            }
            let mut source = InMemorySource::new();
            for annotator in 0..4u8 {
                let annotations = spans
                    .iter()
                    .filter(|&&(owner, _, _)| owner % 5 != annotator)
                    .map(|&(_, start, len)| {
                        let start = usize::from(start % 20);
                        l(start, start + usize::from(len % 3))
                    })
                    .collect();
                source = source.with_annotations("doc", &format!("ann{annotator}"), annotations);
            }
            let agreement = compute(&source, false);
            let matrix = agreement.compute_total_f1_matrix();
            let n = agreement.annotators().len();
            let symmetric = (0..n).all(|i| {
                matrix[[i, i]] == 1.0
                    && (0..n).all(|j| {
                        let (x, y) = (matrix[[i, j]], matrix[[j, i]]);
                        x == y || (x.is_nan() && y.is_nan())
                    })
            });
            TestResult::from_bool(n == 4 && symmetric)
        }
        QuickCheck::new()
            .tests(200)
            .quickcheck(matrix_is_symmetric as fn(Vec<(u8, u8, u8)>) -> TestResult)
    }

    #[rstest]
    #[case(vec![], 0)]
    #[case(vec!["a"], 1)]
    #[case(vec!["a", "a"], 1)]
    fn test_too_few_annotators(#[case] annotators: Vec<&str>, #[case] expected: usize) {
        let actual = Accumulator::new(
            strings(&annotators),
            strings(&["doc"]),
            strings(&["L"]),
            EvaluationMode::Instance,
        );
        assert!(matches!(actual, Err(AgreementError::TooFewAnnotators(n)) if n == expected));
    }

    #[test]
    fn test_three_annotators() {
        let agreement = compute(&three_annotators(), false);
        assert_eq!(agreement.annotators(), &strings(&["a", "b", "c"]));
        assert_eq!(agreement.pairs().len(), 3);
        assert_eq!(agreement.counts().shape(), &[3, 1, 3, 1]);

        let (mean, sd) = agreement.mean_sd_total();
        assert!((mean - 1.0 / 3.0).abs() < 1e-12);
        assert!((sd - (2.0_f64 / 9.0).sqrt()).abs() < 1e-12);

        let (mean, sd) = agreement.mean_sd_per_label();
        assert!((mean[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((sd[0] - (2.0_f64 / 9.0).sqrt()).abs() < 1e-12);

        assert_eq!(agreement.mean_sd_total_one_vs_rest("c").unwrap(), (0.0, 0.0));
        assert_eq!(agreement.mean_sd_total_one_vs_rest("a").unwrap(), (0.5, 0.5));
        let (mean, sd) = agreement.mean_sd_per_label_one_vs_rest("b").unwrap();
        assert_eq!((mean[0], sd[0]), (0.5, 0.5));
        assert!(matches!(
            agreement.mean_sd_total_one_vs_rest("d"),
            Err(AgreementError::UnknownAnnotator(_))
        ));

        let expected = array![[1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(agreement.compute_total_f1_matrix(), expected);
    }

    #[test]
    fn test_one_vs_rest_of_single_pair_has_no_spread() {
        let source = InMemorySource::new()
            .with_annotations("doc", "a", vec![l(0, 1), l(2, 3)])
            .with_annotations("doc", "b", vec![l(0, 1)]);
        let agreement = compute(&source, false);
        let (mean, sd) = agreement.mean_sd_total_one_vs_rest("a").unwrap();
        assert!((mean - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(sd, 0.0);
        assert_eq!(agreement.mean_sd_total_one_vs_rest("b").unwrap(), (mean, 0.0));
    }

    #[test]
    fn test_counts_of_pair() {
        let source = InMemorySource::new()
            .with_annotations("doc", "a", vec![l(0, 1), l(2, 3)])
            .with_annotations("doc", "b", vec![l(0, 1), l(4, 5), l(6, 7)]);
        let agreement = compute(&source, false);
        let counts = agreement.counts();
        assert_eq!(counts[[0, 0, CountKind::TruePositive.index(), 0]], 1);
        assert_eq!(counts[[0, 0, CountKind::FalsePositive.index(), 0]], 2);
        assert_eq!(counts[[0, 0, CountKind::FalseNegative.index(), 0]], 1);
    }

    #[test]
    fn test_empty_slices_are_nan() {
        let source = InMemorySource::new()
            .with_annotations("doc", "a", vec![])
            .with_annotations("doc", "b", vec![]);
        let agreement = compute(&source, false);
        let (mean, sd) = agreement.mean_sd_total();
        assert!(mean.is_nan());
        assert!(sd.is_nan());
        assert!(agreement.compute_total_f1_matrix()[[0, 1]].is_nan());
    }

    #[test]
    fn test_too_many_documents() {
        let source = three_annotators().with_annotations("other", "a", vec![]);
        let actual = F1Agreement::with_universe(
            &source,
            strings(&["a", "b", "c"]),
            strings(&["doc"]),
            strings(&["L"]),
            EvaluationMode::Instance,
            false,
        );
        assert!(matches!(
            actual,
            Err(AgreementError::TooManyDocuments { expected: 1 })
        ));
    }

    /// Yields its documents in the given order, repeats included.
    struct Replay {
        inner: InMemorySource,
        order: Vec<&'static str>,
    }

    impl InputSource for Replay {
        fn documents(&self) -> Result<Documents<'_>, InputError> {
            let documents: Vec<Document> = self.inner.documents()?.collect();
            let replayed: Vec<Document> = self
                .order
                .iter()
                .filter_map(|id| documents.iter().find(|d| d.doc_id == *id).cloned())
                .collect();
            Ok(Box::new(replayed.into_iter()))
        }

        fn read_annotations(&self, file: &AnnFile) -> Result<Vec<Annotation>, InputError> {
            self.inner.read_annotations(file)
        }

        fn read_text(&self, document: &Document) -> Result<String, InputError> {
            self.inner.read_text(document)
        }
    }

    #[test]
    fn test_document_added_twice() {
        let source = Replay {
            inner: InMemorySource::new()
                .with_annotations("A", "a", vec![l(0, 1), l(2, 3)])
                .with_annotations("A", "b", vec![l(0, 1)])
                .with_annotations("B", "a", vec![l(0, 1)])
                .with_annotations("B", "b", vec![l(0, 1)]),
            order: vec!["A", "A"],
        };
        let actual = F1Agreement::with_universe(
            &source,
            strings(&["a", "b"]),
            strings(&["A", "B"]),
            strings(&["L"]),
            EvaluationMode::Instance,
            false,
        );
        assert!(matches!(
            actual,
            Err(AgreementError::DuplicateDocument(d)) if d == "A"
        ));
    }

    #[test]
    fn test_fewer_documents_than_declared() {
        let source = three_annotators();
        let agreement = F1Agreement::with_universe(
            &source,
            strings(&["a", "b", "c"]),
            strings(&["doc", "missing"]),
            strings(&["L"]),
            EvaluationMode::Instance,
            false,
        )
        .unwrap();
        let (mean, _) = agreement.mean_sd_per_document();
        assert!((mean[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!(mean[1].is_nan());
        let (total, _) = agreement.mean_sd_total();
        assert!((total - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_document_and_annotator() {
        let source = three_annotators();
        let mut accumulator = Accumulator::new(
            strings(&["a", "b"]),
            strings(&["other"]),
            strings(&["L"]),
            EvaluationMode::Instance,
        )
        .unwrap();
        let document = source.documents().unwrap().next().unwrap();
        assert!(matches!(
            accumulator.add_document(&source, &document),
            Err(AgreementError::UnknownDocument(d)) if d == "doc"
        ));

        let mut accumulator = Accumulator::new(
            strings(&["a", "b"]),
            strings(&["doc"]),
            strings(&["L"]),
            EvaluationMode::Instance,
        )
        .unwrap();
        assert!(matches!(
            accumulator.add_document(&source, &document),
            Err(AgreementError::UnknownAnnotator(a)) if a == "c"
        ));
    }

    #[test]
    fn test_duplicate_annotator() {
        let source = three_annotators();
        let mut document = source.documents().unwrap().next().unwrap();
        let annotator_a = document.ann_files[1].clone();
        document.ann_files.push(annotator_a);
        let mut accumulator = Accumulator::new(
            strings(&["a", "b", "c"]),
            strings(&["doc"]),
            strings(&["L"]),
            EvaluationMode::Instance,
        )
        .unwrap();
        assert!(matches!(
            accumulator.add_document(&source, &document),
            Err(AgreementError::DuplicateAnnotator { annotator, .. }) if annotator == "a"
        ));
    }

    #[test]
    fn test_unknown_label() {
        let source = three_annotators()
            .with_annotations("doc", "b", vec![Annotation::textbound("X", vec![(0, 1)])]);
        let actual =
            F1Agreement::from_source(&source, strings(&["L"]), EvaluationMode::Instance, false);
        assert!(matches!(
            actual,
            Err(AgreementError::UnknownLabel { label, document }) if label == "X" && document == "doc"
        ));
    }

    #[test]
    fn test_token_mode_reads_text() {
        let source = InMemorySource::new()
            .with_annotations("doc", "a", vec![Annotation::textbound("L", vec![(0, 9)])])
            .with_annotations("doc", "b", vec![Annotation::textbound("L", vec![(0, 3)])]);
        let actual = F1Agreement::from_source(&source, strings(&["L"]), EvaluationMode::Token, false);
        assert!(matches!(
            actual,
            Err(AgreementError::Input(InputError::Missing(_)))
        ));

        let source = source.with_text("doc", "Bob Jones");
        let agreement =
            F1Agreement::from_source(&source, strings(&["L"]), EvaluationMode::Token, false)
                .unwrap();
        let (mean, sd) = agreement.mean_sd_total();
        assert!((mean - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(sd, 0.0);
        assert_eq!(agreement.mode(), EvaluationMode::Token);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut source = InMemorySource::new();
        for doc in 0..5 {
            for (annotator, shift) in [("a", 0), ("b", 1), ("c", doc), ("d", 2)] {
                let annotations = (0..6)
                    .map(|i| l(i * 3 + (i * shift) % 3, i * 3 + 3))
                    .collect();
                source = source.with_annotations(&format!("doc-{doc}"), annotator, annotations);
            }
        }
        let sequential = compute(&source, false);
        let parallel = compute(&source, true);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_collect_annotators_and_documents() {
        let source = InMemorySource::new()
            .with_annotations("d2", "z", vec![])
            .with_annotations("d1", "b", vec![])
            .with_annotations("d1", "z", vec![]);
        let (annotators, documents) = collect_annotators_and_documents(&source).unwrap();
        assert_eq!(annotators, strings(&["b", "z"]));
        assert_eq!(documents, strings(&["d1", "d2"]));
    }
}

/*!
This library computes the inter-annotator agreement of span annotations, such as the named
entities of a brat annotation project. The agreement of two annotators is their F1 score, one of
them being used as the reference. Since the F1 score is symmetric, the choice of the reference
does not matter.

The F1 score of every pair of annotators is computed per document, per label and overall, and
aggregated into a mean and a standard deviation over the pairs.

# Evaluation modes
* Instance-based: two annotations match if they have the same label and the same offsets.
* Token-based: annotations are split into the whitespace separated tokens they overlap before
    being compared. Partial overlaps are rewarded, and annotations covering many tokens weigh
    more than short ones.

# Terminology
* An annotator is identified by the name of its directory in a brat project.
* A document is annotated by every annotator. In a brat project, it is a `.ann` file found at the
    same relative path in every annotator directory.
* A label is an entity type, such as `PER`, `LOC` or `ORG`. Labels are declared in the
    `[entities]` section of the `annotation.conf` file of the project.
* A score is NaN when there is no evidence at all: neither annotator of a pair annotated anything
    in that slice.

```rust
use rusiaa::{compute_f1_agreement, AgreementConfigBuilder, Annotation, InMemorySource};

let source = InMemorySource::new()
    .with_annotations("doc", "ann1", vec![
        Annotation::textbound("PER", vec![(0, 5)]),
        Annotation::textbound("LOC", vec![(10, 16)]),
    ])
    .with_annotations("doc", "ann2", vec![
        Annotation::textbound("PER", vec![(0, 5)]),
        Annotation::textbound("ORG", vec![(10, 16)]),
    ]);
let config = AgreementConfigBuilder::default()
    .labels(["PER", "LOC", "ORG"])
    .build();

let agreement = compute_f1_agreement(&source, &config).unwrap();
assert_eq!(agreement.labels(), &["LOC", "ORG", "PER"]);
assert_eq!(agreement.mean_sd_total(), (0.5, 0.0));
```
*/

mod agreement;
mod config;
mod evaluation;
mod input;
mod metrics;
mod reporter;
mod tensor;

// The public api starts here
pub use agreement::{
    collect_annotators_and_documents, Accumulator, AgreementError, F1Agreement, PairIndex,
};

pub use config::{AgreementConfig, AgreementConfigBuilder, LabelSource, DEFAULT_PRECISION};

pub use evaluation::{
    Annotation, AnnotationKind, Comparison, EvaluationError, EvaluationMode,
    EvaluationModeParsingError, Evaluator, InstanceEvaluator, TokenEvaluator,
};

pub use input::{
    read_annotation_conf, AnnFile, BratProject, Document, Documents, InMemorySource, InputError,
    InputSource, ANNOTATION_CONF,
};

pub use metrics::{compute_f1, FloatExt, MeanSd};

pub use reporter::{format_score, AgreementRow, IaaReport, Scope};

pub use tensor::{CountKind, CountsTensor, DOCUMENT_AXIS, KIND_AXIS, LABEL_AXIS, PAIR_AXIS};

pub use token_overlap::{tokenize, OverlapError, Span, TokenOverlap};

/// Main entrypoint of the library. This function resolves the labels of the config, discovers
/// the annotators and the documents of the source and compares every pair of annotators on every
/// document.
///
/// * `source`: Documents and annotations, such as a `BratProject`
/// * `config`: Evaluation mode, labels and computation strategy
///
/// # Example
/// ```rust,no_run
/// use rusiaa::{compute_f1_agreement, AgreementConfigBuilder, BratProject, EvaluationMode, IaaReport};
///
/// let project = BratProject::new("path/to/project");
/// let config = AgreementConfigBuilder::default()
///     .mode(EvaluationMode::Token)
///     .build();
/// let agreement = compute_f1_agreement(&project, &config).unwrap();
/// println!("{}", IaaReport::new(agreement, config.precision()));
/// ```
pub fn compute_f1_agreement<S: InputSource + ?Sized>(
    source: &S,
    config: &AgreementConfig,
) -> Result<F1Agreement, AgreementError> {
    let labels = config.resolve_labels(source)?;
    F1Agreement::from_source(source, labels, config.mode(), config.parallel())
}

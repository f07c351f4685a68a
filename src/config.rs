/*
 * This module contains the `AgreementConfig` struct and its builder. The config can be passed to
 * the `compute_f1_agreement` function to select the evaluation mode, the labels and the
 * computation strategy.
*/
use crate::agreement::AgreementError;
use crate::evaluation::EvaluationMode;
use crate::input::{read_annotation_conf, InputSource};
use either::Either as LeftOrRight;
use itertools::Itertools;
use std::fmt::Display;
use std::path::PathBuf;

/// Where the labels come from: an explicit list (left) or the path of a brat `annotation.conf`
/// file (right).
pub type LabelSource = LeftOrRight<Vec<String>, PathBuf>;

/// Default number of digits of the rendered scores.
pub const DEFAULT_PRECISION: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
/// Config struct used to simplify the parameters of `compute_f1_agreement`. It implements the
/// default trait.
pub struct AgreementConfig {
    /// Granularity of the comparison of two annotators.
    mode: EvaluationMode,
    /// The labels taking part in the agreement. When `None`, the labels declared by the source
    /// (the `annotation.conf` of a brat project) are used. Any annotation with another label
    /// aborts the computation.
    labels: Option<LabelSource>,
    /// Can we use multiple cores to compare the annotators? This option should be benched. With
    /// few annotators there are few pairs per document and the sequential path is usually faster.
    parallel: bool,
    /// Number of digits of the rendered scores.
    precision: usize,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::default(),
            labels: None,
            parallel: false,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl AgreementConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn labels(&self) -> Option<&LabelSource> {
        self.labels.as_ref()
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Returns the sorted and deduplicated labels of the agreement. The labels declared by
    /// `source` are used only when the config does not name any.
    pub fn resolve_labels<S: InputSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Vec<String>, AgreementError> {
        let labels = match &self.labels {
            Some(LeftOrRight::Left(labels)) => labels.clone(),
            Some(LeftOrRight::Right(path)) => read_annotation_conf(path)?,
            None => source
                .declared_labels()?
                .ok_or(AgreementError::MissingLabels)?,
        };
        if labels.is_empty() {
            return Err(AgreementError::MissingLabels);
        }
        Ok(labels.into_iter().sorted().dedup().collect())
    }
}

impl Display for AgreementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels = match &self.labels {
            Some(LeftOrRight::Left(labels)) => labels.join(", "),
            Some(LeftOrRight::Right(path)) => path.display().to_string(),
            None => String::from("declared by the project"),
        };
        let string = format!("Evaluation mode: {}\n Labels: {}\n Using parallel computations: {}\n Precision: {}", self.mode, labels, self.parallel, self.precision);
        write!(f, "{}", string)
    }
}

impl<Mode> From<AgreementConfigBuilder<Mode>> for AgreementConfig
where
    Mode: Into<EvaluationMode>,
{
    fn from(value: AgreementConfigBuilder<Mode>) -> Self {
        Self {
            mode: value.mode.either_into(),
            labels: value.labels,
            parallel: value.parallel,
            precision: value.precision,
        }
    }
}

/// This builder can be used to build and customize an `AgreementConfig` structure.
pub struct AgreementConfigBuilder<Mode>
where
    Mode: Into<EvaluationMode>,
{
    mode: LeftOrRight<Mode, EvaluationMode>,
    labels: Option<LabelSource>,
    parallel: bool,
    precision: usize,
}

impl Default for AgreementConfigBuilder<EvaluationMode> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Mode> AgreementConfigBuilder<Mode>
where
    Mode: Into<EvaluationMode>,
{
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = LeftOrRight::Left(mode);
        self
    }
    pub fn labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = Some(LeftOrRight::Left(
            labels.into_iter().map(Into::into).collect(),
        ));
        self
    }
    pub fn annotation_conf<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.labels = Some(LeftOrRight::Right(path.into()));
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }
    pub fn new() -> Self {
        Self {
            mode: LeftOrRight::Right(EvaluationMode::default()),
            labels: None,
            parallel: false,
            precision: DEFAULT_PRECISION,
        }
    }
    pub fn build(self) -> AgreementConfig {
        AgreementConfig::from(self)
    }
}

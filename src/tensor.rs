/*!
Dense counts of true positives, false positives and false negatives.

The counts are stored in a four dimensional array with the following axes:

| axis | name       | size                          |
|------|------------|-------------------------------|
| 0    | `pair`     | C(n, 2) pairs of n annotators |
| 1    | `document` | number of documents           |
| 2    | `kind`     | 3 (tp, fp, fn)                |
| 3    | `label`    | number of labels              |

Every statistic first sums the counts over some axes, then computes one F1 score per remaining
cell and finally reduces the pair axis. The axis bookkeeping lives here and nowhere else.
*/
use crate::metrics::compute_f1;
use enum_iterator::{cardinality, Sequence};
use ndarray::{prelude::*, RemoveAxis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const PAIR_AXIS: Axis = Axis(0);
pub const DOCUMENT_AXIS: Axis = Axis(1);
pub const KIND_AXIS: Axis = Axis(2);
pub const LABEL_AXIS: Axis = Axis(3);

/// The three kind of counts collected for every pair, document and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize)]
pub enum CountKind {
    TruePositive,
    FalsePositive,
    FalseNegative,
}

impl CountKind {
    /// Position of the kind along the `kind` axis.
    pub const fn index(self) -> usize {
        match self {
            Self::TruePositive => 0,
            Self::FalsePositive => 1,
            Self::FalseNegative => 2,
        }
    }
}

impl Display for CountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::TruePositive => "tp",
            Self::FalsePositive => "fp",
            Self::FalseNegative => "fn",
        };
        write!(f, "{}", str_content)
    }
}

/// Counts tensor of shape (pair, document, kind, label). Its shape is fixed at construction and
/// cells can only be incremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountsTensor {
    counts: Array4<usize>,
}

impl CountsTensor {
    pub fn zeros(num_pairs: usize, num_documents: usize, num_labels: usize) -> Self {
        Self {
            counts: Array4::zeros((
                num_pairs,
                num_documents,
                cardinality::<CountKind>(),
                num_labels,
            )),
        }
    }

    #[inline(always)]
    pub(crate) fn increment(&mut self, pair: usize, document: usize, kind: CountKind, label: usize) {
        self.counts[[pair, document, kind.index(), label]] += 1;
    }

    pub fn view(&self) -> ArrayView4<'_, usize> {
        self.counts.view()
    }

    #[cfg(test)]
    pub(crate) fn get(
        &self,
        pair: usize,
        document: usize,
        kind: CountKind,
        label: usize,
    ) -> Option<usize> {
        self.counts
            .get([pair, document, kind.index(), label])
            .copied()
    }

    /// Counts summed over the documents. Axes: (pair, kind, label).
    pub fn sum_over_documents(&self) -> Array3<usize> {
        self.counts.sum_axis(DOCUMENT_AXIS)
    }

    /// Counts summed over the labels. Axes: (pair, document, kind).
    pub fn sum_over_labels(&self) -> Array3<usize> {
        self.counts.sum_axis(LABEL_AXIS)
    }

    /// Counts summed over the documents and the labels. Axes: (pair, kind).
    pub fn sum_over_documents_and_labels(&self) -> Array2<usize> {
        self.counts.sum_axis(LABEL_AXIS).sum_axis(DOCUMENT_AXIS)
    }
}

/// Computes one F1 score per cell of `counts`, removing the `kind` axis found at `kind_axis`.
pub(crate) fn f1_scores<D: RemoveAxis>(
    counts: ArrayView<usize, D>,
    kind_axis: Axis,
) -> Array<f64, D::Smaller> {
    let tp = counts.index_axis(kind_axis, CountKind::TruePositive.index());
    let fp = counts.index_axis(kind_axis, CountKind::FalsePositive.index());
    let fn_ = counts.index_axis(kind_axis, CountKind::FalseNegative.index());
    Zip::from(&tp)
        .and(&fp)
        .and(&fn_)
        .map_collect(|&tp, &fp, &fn_| compute_f1(tp as f64, fp as f64, fn_ as f64))
}

/// F1 scores per pair and label, with the documents summed. Axes: (pair, label).
pub(crate) fn f1_per_pair_and_label(pair_kind_label: ArrayView3<usize>) -> Array2<f64> {
    f1_scores(pair_kind_label, Axis(1))
}

/// F1 scores per pair and document, with the labels summed. Axes: (pair, document).
pub(crate) fn f1_per_pair_and_document(pair_document_kind: ArrayView3<usize>) -> Array2<f64> {
    f1_scores(pair_document_kind, Axis(2))
}

/// F1 scores per pair, with the documents and the labels summed. Axes: (pair).
pub(crate) fn f1_per_pair(pair_kind: ArrayView2<usize>) -> Array1<f64> {
    f1_scores(pair_kind, Axis(1))
}

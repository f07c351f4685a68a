/**
This module provides the documents and the annotations to the accumulator. A source must be able
to enumerate its documents more than once: a first time to discover the annotators and the
documents, and a second time to collect the counts.
*/
use crate::evaluation::Annotation;
use ahash::AHashMap;
use brat_reader::{read_entity_types, read_textbounds, ParseError};
use std::collections::BTreeSet;
use std::fs::read_to_string;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the brat project configuration holding the entity types.
pub const ANNOTATION_CONF: &str = "annotation.conf";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("Could not walk the annotation directory")]
    Walk(#[from] walkdir::Error),
    #[error("Nothing is stored under {0}")]
    Missing(PathBuf),
}

/// Annotation file of one annotator for a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnFile {
    pub annotator_id: String,
    pub ann_path: PathBuf,
}

/// A document annotated by several annotators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub doc_id: String,
    /// Path of the reference text. It is only read when the tokens are needed.
    pub txt_path: PathBuf,
    pub ann_files: Vec<AnnFile>,
}

impl Document {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(doc_id: S, txt_path: P) -> Self {
        Self {
            doc_id: doc_id.into(),
            txt_path: txt_path.into(),
            ann_files: Vec::new(),
        }
    }
}

/// Fresh enumeration of the documents of a source.
pub type Documents<'a> = Box<dyn Iterator<Item = Document> + 'a>;

/// Supplier of documents, texts and annotations.
pub trait InputSource {
    /// Enumerates the documents. Every call starts a new enumeration.
    fn documents(&self) -> Result<Documents<'_>, InputError>;

    fn read_annotations(&self, file: &AnnFile) -> Result<Vec<Annotation>, InputError>;

    fn read_text(&self, document: &Document) -> Result<String, InputError>;

    /// Labels declared by the source itself, if any.
    fn declared_labels(&self) -> Result<Option<Vec<String>>, InputError> {
        Ok(None)
    }
}

pub(crate) fn read(path: &Path) -> Result<String, InputError> {
    read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the entity types of a brat `annotation.conf` file.
pub fn read_annotation_conf(path: &Path) -> Result<Vec<String>, InputError> {
    Ok(read_entity_types(&read(path)?))
}

/// A brat annotation project. Each first-level subdirectory of the root is the work of one
/// annotator, and the agreement documents are the `.ann` files found (at the same relative path)
/// under every annotator directory.
///
/// ```text
/// project/
/// ├── annotation.conf
/// ├── ann1/
/// │   ├── doc-1.ann
/// │   └── doc-1.txt
/// └── ann2/
///     ├── doc-1.ann
///     └── doc-1.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BratProject {
    root: PathBuf,
}

impl BratProject {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the annotator directories, sorted. Hidden directories are ignored.
    pub fn annotators(&self) -> Result<Vec<String>, InputError> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| InputError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut annotators = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| InputError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() && !name.starts_with('.') {
                annotators.push(name);
            }
        }
        annotators.sort();
        Ok(annotators)
    }

    /// Relative paths (with `/` separators) of the `.ann` files present for every annotator.
    pub fn collect_redundant_files(
        &self,
        annotators: &[String],
    ) -> Result<BTreeSet<String>, InputError> {
        let mut intersection: Option<BTreeSet<String>> = None;
        for annotator in annotators {
            let subdir = self.root.join(annotator);
            let mut relative_paths = BTreeSet::new();
            for entry in WalkDir::new(&subdir).sort_by_file_name() {
                let entry = entry?;
                let path = entry.path();
                let is_ann = path.extension().is_some_and(|ext| ext == "ann");
                if !entry.file_type().is_file() || !is_ann {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&subdir) {
                    relative_paths.insert(to_posix(relative));
                }
            }
            debug!(%annotator, files = relative_paths.len(), "collected annotation files");
            intersection = Some(match intersection {
                None => relative_paths,
                Some(current) => current.intersection(&relative_paths).cloned().collect(),
            });
        }
        Ok(intersection.unwrap_or_default())
    }
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl InputSource for BratProject {
    fn documents(&self) -> Result<Documents<'_>, InputError> {
        let annotators = self.annotators()?;
        let relative_paths = self.collect_redundant_files(&annotators)?;
        let documents = relative_paths.into_iter().filter_map(move |rel_path| {
            let first = annotators.first()?;
            let txt_path = self.root.join(first).join(&rel_path).with_extension("txt");
            let mut document = Document::new(rel_path.as_str(), txt_path);
            for annotator in annotators.iter() {
                document.ann_files.push(AnnFile {
                    annotator_id: annotator.clone(),
                    ann_path: self.root.join(annotator).join(&rel_path),
                });
            }
            Some(document)
        });
        Ok(Box::new(documents))
    }

    fn read_annotations(&self, file: &AnnFile) -> Result<Vec<Annotation>, InputError> {
        let content = read(&file.ann_path)?;
        let textbounds = read_textbounds(&content).map_err(|source| InputError::Parse {
            path: file.ann_path.clone(),
            source,
        })?;
        Ok(textbounds.into_iter().map(Annotation::from).collect())
    }

    fn read_text(&self, document: &Document) -> Result<String, InputError> {
        read(&document.txt_path)
    }

    /// Entity types of the project's `annotation.conf`, if the file exists.
    fn declared_labels(&self) -> Result<Option<Vec<String>>, InputError> {
        let conf = self.root.join(ANNOTATION_CONF);
        if !conf.is_file() {
            return Ok(None);
        }
        read_annotation_conf(&conf).map(Some)
    }
}

/// Documents, texts and annotations kept in memory. Documents are enumerated in insertion order.
///
/// ```rust
/// use rusiaa::{Annotation, InMemorySource, InputSource};
///
/// let source = InMemorySource::new()
///     .with_text("doc-1", "Alice lives in Paris")
///     .with_annotations("doc-1", "ann1", vec![Annotation::textbound("PER", vec![(0, 5)])])
///     .with_annotations("doc-1", "ann2", vec![]);
/// let documents: Vec<_> = source.documents().unwrap().collect();
/// assert_eq!(documents[0].ann_files.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
    texts: AHashMap<PathBuf, String>,
    annotations: AHashMap<PathBuf, Vec<Annotation>>,
    labels: Option<Vec<String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn document_mut(&mut self, doc_id: &str) -> &mut Document {
        let position = match self.documents.iter().position(|d| d.doc_id == doc_id) {
            Some(position) => position,
            None => {
                self.documents.push(Document::new(doc_id, doc_id));
                self.documents.len() - 1
            }
        };
        &mut self.documents[position]
    }

    pub fn with_text<S: Into<String>>(mut self, doc_id: &str, text: S) -> Self {
        let txt_path = self.document_mut(doc_id).txt_path.clone();
        self.texts.insert(txt_path, text.into());
        self
    }

    /// Sets the annotations of an annotator on a document. Calling it twice for the same pair
    /// replaces the annotations.
    pub fn with_annotations(
        mut self,
        doc_id: &str,
        annotator_id: &str,
        annotations: Vec<Annotation>,
    ) -> Self {
        let ann_path = Path::new(annotator_id).join(doc_id);
        let document = self.document_mut(doc_id);
        if !document
            .ann_files
            .iter()
            .any(|f| f.annotator_id == annotator_id)
        {
            document.ann_files.push(AnnFile {
                annotator_id: String::from(annotator_id),
                ann_path: ann_path.clone(),
            });
        }
        self.annotations.insert(ann_path, annotations);
        self
    }

    /// Labels returned by `declared_labels`.
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }
}

impl InputSource for InMemorySource {
    fn documents(&self) -> Result<Documents<'_>, InputError> {
        Ok(Box::new(self.documents.iter().cloned()))
    }

    fn read_annotations(&self, file: &AnnFile) -> Result<Vec<Annotation>, InputError> {
        self.annotations
            .get(&file.ann_path)
            .cloned()
            .ok_or_else(|| InputError::Missing(file.ann_path.clone()))
    }

    fn read_text(&self, document: &Document) -> Result<String, InputError> {
        self.texts
            .get(&document.txt_path)
            .cloned()
            .ok_or_else(|| InputError::Missing(document.txt_path.clone()))
    }

    fn declared_labels(&self) -> Result<Option<Vec<String>>, InputError> {
        Ok(self.labels.clone())
    }
}

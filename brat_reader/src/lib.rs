/*!
Minimal reader for the [brat](https://brat.nlplab.org/standoff.html) standoff format. Only the
parts needed to compute agreement are supported:

* textbound annotations (`T` lines) of the `.ann` files;
* the `[entities]` section of the `annotation.conf` project configuration.

Relations, events, attributes, normalizations and notes are skipped.

```rust
use brat_reader::read_textbounds;

let ann = "T1\tPER 0 5\tAlice\nR1\tKnows Arg1:T1 Arg2:T2\nT2\tLOC 10 13;14 20\tNew Hampshire\n";
let textbounds = read_textbounds(ann).unwrap();
assert_eq!(textbounds.len(), 2);
assert_eq!(textbounds[1].spans, vec![(10, 13), (14, 20)]);
```
*/
use std::fmt::Display;
use std::num::ParseIntError;
use thiserror::Error;

/// A textbound annotation: a label attached to one or more character spans of the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Textbound {
    pub id: String,
    pub label: String,
    pub spans: Vec<(usize, usize)>,
    pub text: String,
}

impl Display for Textbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let offsets: Vec<String> = self
            .spans
            .iter()
            .map(|(start, end)| format!("{} {}", start, end))
            .collect();
        write!(
            f,
            "{}\t{} {}\t{}",
            self.id,
            self.label,
            offsets.join(";"),
            self.text
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// One-based line number
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("textbound is missing its type and offsets")]
    MissingTypeAndOffsets,
    #[error("textbound has no offsets")]
    MissingOffsets,
    #[error("could not parse offsets `{0}`: expected `<start> <end>`")]
    MalformedSpan(String),
    #[error("could not parse offset: {0}")]
    InvalidOffset(#[from] ParseIntError),
    #[error("span start {start} is after its end {end}")]
    InvertedSpan { start: usize, end: usize },
}

/// Reads every textbound annotation of the content of an `.ann` file, in file order.
pub fn read_textbounds(content: &str) -> Result<Vec<Textbound>, ParseError> {
    let mut textbounds = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if !line.starts_with('T') {
            continue;
        }
        let textbound = parse_textbound(line).map_err(|kind| ParseError {
            line: line_idx + 1,
            kind,
        })?;
        textbounds.push(textbound);
    }
    Ok(textbounds)
}

fn parse_textbound(line: &str) -> Result<Textbound, ParseErrorKind> {
    let mut fields = line.splitn(3, '\t');
    let id = fields.next().unwrap_or_default();
    let type_and_offsets = fields
        .next()
        .ok_or(ParseErrorKind::MissingTypeAndOffsets)?;
    let text = fields.next().unwrap_or_default();
    let (label, offsets) = type_and_offsets
        .split_once(' ')
        .ok_or(ParseErrorKind::MissingOffsets)?;
    let spans = offsets
        .split(';')
        .map(parse_span)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Textbound {
        id: String::from(id),
        label: String::from(label),
        spans,
        text: String::from(text),
    })
}

fn parse_span(span: &str) -> Result<(usize, usize), ParseErrorKind> {
    let mut offsets = span.split_whitespace();
    let (start, end) = match (offsets.next(), offsets.next(), offsets.next()) {
        (Some(start), Some(end), None) => (start.parse::<usize>()?, end.parse::<usize>()?),
        _ => return Err(ParseErrorKind::MalformedSpan(String::from(span))),
    };
    if start > end {
        return Err(ParseErrorKind::InvertedSpan { start, end });
    }
    Ok((start, end))
}

/// Reads the entity types declared in the `[entities]` section of an `annotation.conf` file, in
/// declaration order. The hierarchy (indentation) is flattened and the non-annotatable marker `!`
/// is removed from the names.
pub fn read_entity_types(content: &str) -> Vec<String> {
    let mut in_entities = false;
    let mut entity_types: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_entities = &line[1..line.len() - 1] == "entities";
            continue;
        }
        // separators and macro definitions
        if !in_entities || line == "-" || line.starts_with('<') {
            continue;
        }
        let name = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_start_matches('!');
        if !name.is_empty() && !entity_types.iter().any(|e| e == name) {
            entity_types.push(String::from(name));
        }
    }
    entity_types
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn test_read_textbounds_skips_other_lines() {
        let content = "T1\tPER 0 5\tAlice\n\
                       #1\tAnnotatorNotes T1\tcheck this\n\
                       A1\tNegated T1\n\
                       T2\tORG 11 20\tAcme Corp\n\
                       R1\tWorksFor Arg1:T1 Arg2:T2\n\
                       E1\tMove:T3\n";
        let actual = read_textbounds(content).unwrap();
        let expected = vec![
            Textbound {
                id: String::from("T1"),
                label: String::from("PER"),
                spans: vec![(0, 5)],
                text: String::from("Alice"),
            },
            Textbound {
                id: String::from("T2"),
                label: String::from("ORG"),
                spans: vec![(11, 20)],
                text: String::from("Acme Corp"),
            },
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_read_discontinuous_textbound() {
        let actual = read_textbounds("T7\tLOC 0 3;8 14\tNew Hampshire\r\n").unwrap();
        assert_eq!(actual[0].spans, vec![(0, 3), (8, 14)]);
        assert_eq!(actual[0].text, "New Hampshire");
    }

    #[test]
    fn test_textbound_without_text() {
        let actual = read_textbounds("T1\tMISC 4 9").unwrap();
        assert_eq!(actual[0].label, "MISC");
        assert_eq!(actual[0].text, "");
    }

    #[test]
    fn test_malformed_textbounds() {
        let test_cases = [
            ("T1\tPER 0 5\tok\nT2", ParseError {
                line: 2,
                kind: ParseErrorKind::MissingTypeAndOffsets,
            }),
            ("T1\tPER\tAlice", ParseError {
                line: 1,
                kind: ParseErrorKind::MissingOffsets,
            }),
            ("T1\tPER 0\tAlice", ParseError {
                line: 1,
                kind: ParseErrorKind::MalformedSpan(String::from("0")),
            }),
            ("T1\tPER 9 5\tAlice", ParseError {
                line: 1,
                kind: ParseErrorKind::InvertedSpan { start: 9, end: 5 },
            }),
        ];
        for (content, expected) in test_cases {
            assert_eq!(read_textbounds(content), Err(expected));
        }
        let err = read_textbounds("T1\tPER a 5\tAlice").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidOffset(_)));
    }

    #[test]
    fn test_read_entity_types() {
        let content = "# comment\n\
                       [entities]\n\
                       \n\
                       ORG\n\
                       PER\n\
                       LOC\n\
                       MISC\n\
                       [relations]\n\
                       Located\tArg1:ORG, Arg2:LOC\n\
                       [events]\n\
                       [attributes]\n";
        assert_eq!(read_entity_types(content), vec!["ORG", "PER", "LOC", "MISC"]);
    }

    #[test]
    fn test_read_entity_hierarchy() {
        let content = "[entities]\n\
                       <NAMED>=PER|ORG\n\
                       !Named-entity\n\
                       \tPER\n\
                       \tORG\n\
                       -\n\
                       Date\tglyph-color:blue\n\
                       PER\n";
        assert_eq!(
            read_entity_types(content),
            vec!["Named-entity", "PER", "ORG", "Date"]
        );
    }

    #[test]
    fn test_displayed_textbound_is_read_back() {
        fn read_back(label: String, spans: Vec<(u16, u16)>) -> TestResult {
            let label: String = label.chars().filter(|c| c.is_alphanumeric()).collect();
            if label.is_empty() || spans.is_empty() {
                return TestResult::discard();
            }
            let spans: Vec<(usize, usize)> = spans
                .into_iter()
                .map(|(a, b)| (a.min(b) as usize, a.max(b) as usize))
                .collect();
            let textbound = Textbound {
                id: String::from("T1"),
                label,
                spans,
                text: String::from("some text"),
            };
            match read_textbounds(&textbound.to_string()) {
                Ok(read) => TestResult::from_bool(read == vec![textbound]),
                Err(_) => TestResult::failed(),
            }
        }
        QuickCheck::new()
            .tests(1000)
            .quickcheck(read_back as fn(String, Vec<(u16, u16)>) -> TestResult)
    }
}

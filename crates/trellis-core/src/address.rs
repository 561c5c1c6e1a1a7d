// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node addresses: root-to-node name paths.
use std::borrow::Cow;
use std::fmt;

/// One step of an address.
///
/// Children of a list are addressed by position; everything else by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Named child.
    Name(String),
    /// List position.
    Index(usize),
}

impl Segment {
    /// Parse a path token; all-digit tokens become indices.
    pub fn parse(token: &str) -> Self {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = token.parse() {
                return Self::Index(index);
            }
        }
        Self::Name(token.to_owned())
    }

    /// Textual form used for matching and joining.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Name(name) => Cow::Borrowed(name),
            Self::Index(i) => Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Ordered list of segments from the root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Address(Vec<Segment>);

impl Address {
    /// Address from segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Split `path` on `delimiter`, skipping empty tokens.
    pub fn parse(path: &str, delimiter: &str) -> Self {
        path.split(delimiter)
            .filter(|t| !t.is_empty())
            .map(Segment::parse)
            .collect()
    }

    /// Segments in root-to-node order.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Append a segment.
    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join with an arbitrary delimiter.
    pub fn join(&self, delimiter: &str) -> String {
        self.0
            .iter()
            .map(|s| s.text())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

impl FromIterator<Segment> for Address {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join("."))
    }
}

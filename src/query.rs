//! A thin query layer over a parsed markup tree.
//!
//! The survey extractors only ever ask a handful of questions of the page:
//! "which descendants carry this class", "what is the nearest earlier sibling
//! carrying that class", "what is the next such element in document order".
//! [`Node`] captures exactly those capabilities, so the extraction rules are
//! written once and run against [`scraper::ElementRef`] or any other tree.

use std::fmt::{self, Display};

use scraper::ElementRef;

/// How an element's `class`/`id` attributes must look for a [`Marker`] to match.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClassRule {
    Any,
    Id(&'static str),
    /// One of the class tokens equals the given name.
    Class(&'static str),
    /// Every listed name is among the class tokens.
    AllClasses(&'static [&'static str]),
    /// One of the class tokens starts with the given prefix.
    ClassPrefix(&'static str),
}

/// Tag name plus a [`ClassRule`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Marker {
    tag: &'static str,
    rule: ClassRule,
}

impl Marker {
    pub const fn new(tag: &'static str, rule: ClassRule) -> Self {
        Self { tag, rule }
    }

    pub const fn div(rule: ClassRule) -> Self {
        Self::new("div", rule)
    }

    pub fn matches<'a, N: Node<'a>>(&self, node: &N) -> bool {
        if !node.tag_name().eq_ignore_ascii_case(self.tag) {
            return false;
        }
        match self.rule {
            ClassRule::Any => true,
            ClassRule::Id(id) => node.attribute("id") == Some(id),
            ClassRule::Class(class) => node.class_tokens().any(|token| token == class),
            ClassRule::AllClasses(classes) => classes
                .iter()
                .all(|class| node.class_tokens().any(|token| token == *class)),
            ClassRule::ClassPrefix(prefix) => {
                node.class_tokens().any(|token| token.starts_with(prefix))
            }
        }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag)?;
        match self.rule {
            ClassRule::Any => Ok(()),
            ClassRule::Id(id) => write!(f, "#{id}"),
            ClassRule::Class(class) => write!(f, ".{class}"),
            ClassRule::AllClasses(classes) => {
                for class in classes {
                    write!(f, ".{class}")?;
                }
                Ok(())
            }
            ClassRule::ClassPrefix(prefix) => write!(f, "[class^={prefix:?}]"),
        }
    }
}

/// An element in a read-only markup tree.
///
/// Implementors provide the five primitive accessors; every search used by
/// the extractors is derived from them.
pub trait Node<'a>: Copy + PartialEq + Sized {
    fn tag_name(&self) -> &'a str;
    fn attribute(&self, name: &str) -> Option<&'a str>;
    /// Concatenation of all descendant text, untrimmed.
    fn text_content(&self) -> String;
    fn parent_element(&self) -> Option<Self>;
    /// Element children only, in document order.
    fn element_children(&self) -> Vec<Self>;

    fn class_tokens(&self) -> std::str::SplitWhitespace<'a> {
        self.attribute("class").unwrap_or_default().split_whitespace()
    }

    fn trimmed_text(&self) -> String {
        self.text_content().trim().to_owned()
    }

    /// All element descendants in document order, not including `self`.
    fn descendants(&self) -> Vec<Self> {
        let mut ret = Vec::new();
        let mut stack = self.element_children();
        stack.reverse();
        while let Some(node) = stack.pop() {
            ret.push(node);
            stack.extend(node.element_children().into_iter().rev());
        }
        ret
    }

    fn find_descendant(&self, marker: &Marker) -> Option<Self> {
        self.descendants().into_iter().find(|node| marker.matches(node))
    }

    fn find_descendants(&self, marker: &Marker) -> Vec<Self> {
        self.descendants()
            .into_iter()
            .filter(|node| marker.matches(node))
            .collect()
    }

    /// The first matching element that opens after `self` does: descendants
    /// first, then later siblings of `self` and of each ancestor in turn.
    fn find_following(&self, marker: &Marker) -> Option<Self> {
        if let Some(found) = self.find_descendant(marker) {
            return Some(found);
        }
        let mut current = *self;
        loop {
            if let Some((siblings, index)) = Siblings::of(current) {
                for sibling in siblings.after(index) {
                    if marker.matches(sibling) {
                        return Some(*sibling);
                    }
                    if let Some(found) = sibling.find_descendant(marker) {
                        return Some(found);
                    }
                }
            }
            current = current.parent_element()?;
        }
    }

    /// The element siblings of `self` (itself included) and its position among them.
    fn siblings(&self) -> Option<(Siblings<Self>, usize)> {
        Siblings::of(*self)
    }
}

impl<'a> Node<'a> for ElementRef<'a> {
    fn tag_name(&self) -> &'a str {
        self.value().name()
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    fn text_content(&self) -> String {
        self.text().collect()
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent().and_then(ElementRef::wrap)
    }

    fn element_children(&self) -> Vec<Self> {
        self.children().filter_map(ElementRef::wrap).collect()
    }
}

/// The element children of one parent, flattened in document order.
///
/// Searches for an earlier or later sibling are plain index scans over this
/// list.
#[derive(Clone, Debug)]
pub struct Siblings<N> {
    nodes: Vec<N>,
}

impl<N> Siblings<N> {
    pub fn new(nodes: Vec<N>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&N> {
        self.nodes.get(index)
    }

    pub fn after(&self, index: usize) -> &[N] {
        self.nodes.get(index + 1..).unwrap_or_default()
    }
}

impl<'a, N: Node<'a>> Siblings<N> {
    pub fn of(node: N) -> Option<(Self, usize)> {
        let nodes = node.parent_element()?.element_children();
        let index = nodes.iter().position(|x| *x == node)?;
        Some((Self { nodes }, index))
    }

    /// Scans backwards from just before `index` for the closest matching sibling.
    pub fn nearest_preceding(&self, index: usize, marker: &Marker) -> Option<(usize, N)> {
        let end = index.min(self.nodes.len());
        self.nodes[..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, node)| marker.matches(*node))
            .map(|(i, node)| (i, *node))
    }

    /// Scans forwards from just after `index` for the closest matching sibling.
    pub fn next_matching(&self, index: usize, marker: &Marker) -> Option<(usize, N)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, node)| marker.matches(*node))
            .map(|(i, node)| (i, *node))
    }
}

//! `JamList`, the single value type of the Jam variable model.
//!
//! Every Jam value is an ordered list of strings; duplicates and empty
//! strings are allowed. Lists have value semantics: `Clone` yields a fully
//! independent copy, and generated code clones at every binding boundary
//! (call arguments, returns, loop iteration variables).

use std::fmt;

use regex::Regex;

use super::path::PathParts;

/// The assignment family shared by locals, globals and on-target variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Append,
    Subtract,
    AssignIfEmpty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JamList {
    elements: Vec<String>,
}

impl JamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(value: impl Into<String>) -> Self {
        Self {
            elements: vec![value.into()],
        }
    }

    pub fn from_slice(values: &[&str]) -> Self {
        Self {
            elements: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn from_vec(elements: Vec<String>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<String> {
        self.elements
    }

    pub fn first(&self) -> Option<&str> {
        self.elements.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    // --- assignment family -------------------------------------------------

    pub fn assign(&mut self, value: &JamList) {
        self.elements.clear();
        self.elements.extend_from_slice(&value.elements);
    }

    pub fn append(&mut self, value: &JamList) {
        self.elements.extend_from_slice(&value.elements);
    }

    /// Removes every element equal to any element of `value`.
    pub fn subtract(&mut self, value: &JamList) {
        self.elements.retain(|e| !value.elements.contains(e));
    }

    pub fn assign_if_empty(&mut self, value: &JamList) {
        if self.elements.is_empty() {
            self.assign(value);
        }
    }

    pub fn apply(&mut self, op: AssignOp, value: &JamList) {
        match op {
            AssignOp::Assign => self.assign(value),
            AssignOp::Append => self.append(value),
            AssignOp::Subtract => self.subtract(value),
            AssignOp::AssignIfEmpty => self.assign_if_empty(value),
        }
    }

    // --- construction ------------------------------------------------------

    /// Plain list concatenation, the value of a whitespace-separated
    /// expression list.
    pub fn concat(lists: &[JamList]) -> JamList {
        let mut elements = Vec::new();
        for list in lists {
            elements.extend_from_slice(&list.elements);
        }
        JamList { elements }
    }

    /// Cross-product concatenation of adjacent expression parts, left to
    /// right. Any empty operand absorbs the whole product into the empty
    /// list; a single-element operand broadcasts over the other side.
    pub fn combine(lists: &[JamList]) -> JamList {
        if lists.iter().any(JamList::is_empty) {
            return JamList::new();
        }
        let mut acc = vec![String::new()];
        for list in lists {
            let mut next = Vec::with_capacity(acc.len() * list.elements.len());
            for prefix in &acc {
                for element in &list.elements {
                    let mut combined = String::with_capacity(prefix.len() + element.len());
                    combined.push_str(prefix);
                    combined.push_str(element);
                    next.push(combined);
                }
            }
            acc = next;
        }
        JamList { elements: acc }
    }

    // --- indexer ------------------------------------------------------------

    /// `$(var[indices])`. Indices are one-based element strings: `3`, `2-4`,
    /// or the open-ended `2-`. Out-of-range singles and non-numeric indices
    /// contribute nothing; ranges are clamped to the valid region.
    pub fn indexed_by(&self, indices: &JamList) -> JamList {
        let mut elements = Vec::new();
        for index in &indices.elements {
            match index.split_once('-') {
                Some((from, to)) => {
                    let Ok(from) = from.trim().parse::<usize>() else {
                        continue;
                    };
                    let to = if to.trim().is_empty() {
                        self.elements.len()
                    } else if let Ok(to) = to.trim().parse::<usize>() {
                        to
                    } else {
                        continue;
                    };
                    let start = from.max(1);
                    let end = to.min(self.elements.len());
                    if start > end {
                        continue;
                    }
                    elements.extend_from_slice(&self.elements[start - 1..end]);
                }
                None => {
                    let Ok(index) = index.trim().parse::<usize>() else {
                        continue;
                    };
                    if index >= 1 && index <= self.elements.len() {
                        elements.push(self.elements[index - 1].clone());
                    }
                }
            }
        }
        JamList { elements }
    }

    // --- path-shaped modifiers ----------------------------------------------

    /// `:S=value` replaces each element's suffix (empty value strips it);
    /// bare `:S` extracts the suffix instead.
    pub fn with_suffix(&self, value: Option<&JamList>) -> JamList {
        match value {
            Some(value) => {
                let suffix = value.first().unwrap_or("").to_string();
                self.map_parts(|parts| {
                    parts.suffix = suffix.clone();
                })
            }
            None => self.extract_parts(|parts| parts.suffix),
        }
    }

    /// `:G=value` wraps the grist in angle brackets unless the value already
    /// carries them; bare `:G` extracts the grist.
    pub fn with_grist(&self, value: Option<&JamList>) -> JamList {
        match value {
            Some(value) => {
                let raw = value.first().unwrap_or("");
                let grist = if raw.starts_with('<') {
                    raw.to_string()
                } else {
                    format!("<{raw}>")
                };
                self.map_parts(|parts| {
                    parts.grist = grist.clone();
                })
            }
            None => self.extract_parts(|parts| parts.grist),
        }
    }

    /// `:D=value` replaces the directory component; bare `:D` extracts it
    /// without the trailing slash.
    pub fn with_directory(&self, value: Option<&JamList>) -> JamList {
        match value {
            Some(value) => {
                let dir = value.first().unwrap_or("");
                let dir = if dir.is_empty() || dir.ends_with('/') {
                    dir.to_string()
                } else {
                    format!("{dir}/")
                };
                self.map_parts(|parts| {
                    parts.directory = dir.clone();
                })
            }
            None => self.extract_parts(|parts| parts.directory_display().to_string()),
        }
    }

    /// `:B=value` replaces the base name; bare `:B` extracts it.
    pub fn with_basename(&self, value: Option<&JamList>) -> JamList {
        match value {
            Some(value) => {
                let base = value.first().unwrap_or("").to_string();
                self.map_parts(|parts| {
                    parts.base = base.clone();
                })
            }
            None => self.extract_parts(|parts| parts.base),
        }
    }

    fn map_parts(&self, mut update: impl FnMut(&mut PathParts)) -> JamList {
        let elements = self
            .elements
            .iter()
            .map(|element| {
                let mut parts = PathParts::parse(element);
                update(&mut parts);
                parts.unparse()
            })
            .collect();
        JamList { elements }
    }

    fn extract_parts(&self, select: impl Fn(PathParts) -> String) -> JamList {
        let elements = self
            .elements
            .iter()
            .map(|element| select(PathParts::parse(element)))
            .collect();
        JamList { elements }
    }

    // --- remaining modifiers ------------------------------------------------

    /// `:J=sep` collapses the list into a single element; `:J` joins with the
    /// empty separator. An empty list stays empty.
    pub fn join_with(&self, separator: Option<&JamList>) -> JamList {
        if self.elements.is_empty() {
            return JamList::new();
        }
        let separator = separator.and_then(JamList::first).unwrap_or("");
        JamList::single(self.elements.join(separator))
    }

    /// `:E=alternative` substitutes the alternative when the receiver is
    /// empty; bare `:E` (and `:E=`) substitutes a single empty string.
    pub fn if_empty_use(&self, alternative: Option<&JamList>) -> JamList {
        if !self.elements.is_empty() {
            return self.clone();
        }
        match alternative {
            Some(alternative) if !alternative.is_empty() => alternative.clone(),
            _ => JamList::single(""),
        }
    }

    /// `:I=pattern` keeps elements matched by any pattern, treated as an
    /// unanchored regular expression over the post-scanner text. Invalid
    /// patterns match nothing.
    pub fn include_matching(&self, patterns: Option<&JamList>) -> JamList {
        let regexes = compile_patterns(patterns);
        let elements = self
            .elements
            .iter()
            .filter(|element| regexes.iter().any(|re| re.is_match(element)))
            .cloned()
            .collect();
        JamList { elements }
    }

    /// `:X=pattern` drops elements matched by any pattern.
    pub fn exclude_matching(&self, patterns: Option<&JamList>) -> JamList {
        let regexes = compile_patterns(patterns);
        let elements = self
            .elements
            .iter()
            .filter(|element| !regexes.iter().any(|re| re.is_match(element)))
            .cloned()
            .collect();
        JamList { elements }
    }

    /// `:U`
    pub fn to_upper(&self) -> JamList {
        JamList {
            elements: self.elements.iter().map(|e| e.to_uppercase()).collect(),
        }
    }

    /// `:L`
    pub fn to_lower(&self) -> JamList {
        JamList {
            elements: self.elements.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// The four-backslash modifier: forward slashes become backslashes.
    pub fn to_backslashes(&self) -> JamList {
        JamList {
            elements: self.elements.iter().map(|e| e.replace('/', "\\")).collect(),
        }
    }

    /// `:W` converts cygwin paths to Windows ones; off cygwin it passes the
    /// value through untouched, argument included.
    pub fn with_windows_path(&self, _value: Option<&JamList>) -> JamList {
        self.clone()
    }

    /// `MD5` builtin: the hex digest of the space-joined value.
    pub fn md5(&self) -> JamList {
        JamList::single(format!("{:x}", md5::compute(self.to_string())))
    }

    // --- condition operators ------------------------------------------------

    /// Truthiness: any element at all, even the empty string.
    pub fn as_bool(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Pairwise element equality.
    pub fn jam_equals(&self, other: &JamList) -> bool {
        self.elements == other.elements
    }

    /// `in`: every element of the receiver appears somewhere in `candidates`.
    /// The empty list is in everything.
    pub fn is_in(&self, candidates: &JamList) -> bool {
        self.elements
            .iter()
            .all(|e| candidates.elements.contains(e))
    }

    /// `>`: numeric comparison of the first elements; a missing or
    /// non-numeric first element counts as zero.
    pub fn greater_than(&self, other: &JamList) -> bool {
        self.first_numeric() > other.first_numeric()
    }

    /// `<`
    pub fn less_than(&self, other: &JamList) -> bool {
        self.first_numeric() < other.first_numeric()
    }

    fn first_numeric(&self) -> i64 {
        self.first()
            .and_then(|e| e.trim().parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// The token a `switch` matches against: the space-joined flattened
    /// value.
    pub fn switch_token(&self) -> String {
        self.elements.join(" ")
    }
}

fn compile_patterns(patterns: Option<&JamList>) -> Vec<Regex> {
    match patterns {
        Some(patterns) => patterns
            .elements()
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect(),
        // A value-less `:I`/`:X` behaves like the empty pattern, which
        // matches every element.
        None => vec![Regex::new("").unwrap()],
    }
}

impl fmt::Display for JamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.join(" "))
    }
}

impl From<&str> for JamList {
    fn from(value: &str) -> Self {
        JamList::single(value)
    }
}

impl FromIterator<String> for JamList {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        JamList {
            elements: iter.into_iter().collect(),
        }
    }
}

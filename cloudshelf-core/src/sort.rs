use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Size,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Size => "size",
            SortField::CreatedAt => "created",
            SortField::UpdatedAt => "modified",
        }
    }

    fn parse(value: &str) -> Result<Self, SortParseError> {
        match value {
            "name" => Ok(SortField::Name),
            "size" => Ok(SortField::Size),
            "created" => Ok(SortField::CreatedAt),
            "modified" => Ok(SortField::UpdatedAt),
            other => Err(SortParseError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortParseError {
    #[error("sort field is empty")]
    Empty,
    #[error("unknown sort field: {0}")]
    UnknownField(String),
}

/// Active ordering of a listing.
///
/// Distinct nodes never compare equal: ties on the primary field fall back
/// to the node id, ascending in both directions. With `folders_first` the
/// folder/file split is applied before the primary field and is not
/// reversed by `Desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
    pub folders_first: bool,
}

impl SortSpec {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self {
            field,
            direction,
            folders_first: true,
        }
    }

    pub const fn by_name() -> Self {
        Self::new(SortField::Name, SortDirection::Asc)
    }

    pub const fn with_folders_first(mut self, folders_first: bool) -> Self {
        self.folders_first = folders_first;
        self
    }

    /// Remote query form: `name`, `-size`, `created`, `-modified`.
    pub fn to_query(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.as_str().to_string(),
            SortDirection::Desc => format!("-{}", self.field.as_str()),
        }
    }

    /// Whether replacing `before` with `after` can change where the node sits.
    pub fn affects_order(&self, before: &Node, after: &Node) -> bool {
        if self.folders_first && before.kind != after.kind {
            return true;
        }
        match self.field {
            SortField::Name => before.name != after.name,
            SortField::Size => before.size != after.size,
            SortField::CreatedAt => before.created_at != after.created_at,
            SortField::UpdatedAt => before.updated_at != after.updated_at,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::by_name()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

impl FromStr for SortSpec {
    type Err = SortParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (direction, field) = match value.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, value),
        };
        if field.is_empty() {
            return Err(SortParseError::Empty);
        }
        Ok(Self::new(SortField::parse(field)?, direction))
    }
}

/// Total order over nodes for `spec`.
///
/// Returns `Ordering::Equal` only for the same id.
pub fn compare(a: &Node, b: &Node, spec: &SortSpec) -> Ordering {
    if a.id == b.id {
        return Ordering::Equal;
    }
    if spec.folders_first {
        let by_kind = kind_rank(a.kind).cmp(&kind_rank(b.kind));
        if by_kind != Ordering::Equal {
            return by_kind;
        }
    }
    let primary = compare_field(a, b, spec.field);
    let primary = match spec.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn kind_rank(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Folder => 0,
        NodeKind::File => 1,
    }
}

fn compare_field(a: &Node, b: &Node, field: SortField) -> Ordering {
    match field {
        SortField::Name => compare_names(&a.name, &b.name),
        SortField::Size => a.size.cmp(&b.size),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_is_equal_and_distinct_ids_never_are() {
        let spec = SortSpec::by_name();
        let a = Node::file("1", "same.txt");
        let b = Node::file("2", "same.txt");
        assert_eq!(compare(&a, &a, &spec), Ordering::Equal);
        assert_eq!(compare(&a, &b, &spec), Ordering::Less);
        assert_eq!(compare(&b, &a, &spec), Ordering::Greater);
    }

    #[test]
    fn names_compare_case_insensitively_first() {
        let spec = SortSpec::by_name();
        let lower = Node::file("1", "apple");
        let upper = Node::file("2", "Banana");
        assert_eq!(compare(&lower, &upper, &spec), Ordering::Less);

        let shouted = Node::file("3", "APPLE");
        assert_eq!(compare(&shouted, &lower, &spec), Ordering::Less);
    }

    #[test]
    fn folders_precede_files_in_both_directions() {
        let folder = Node::folder("1", "zzz");
        let file = Node::file("2", "aaa");
        let asc = SortSpec::by_name();
        let desc = SortSpec::new(SortField::Name, SortDirection::Desc);
        assert_eq!(compare(&folder, &file, &asc), Ordering::Less);
        assert_eq!(compare(&folder, &file, &desc), Ordering::Less);

        let mixed = asc.with_folders_first(false);
        assert_eq!(compare(&folder, &file, &mixed), Ordering::Greater);
    }

    #[test]
    fn descending_reverses_primary_but_not_tie_break() {
        let spec = SortSpec::new(SortField::Size, SortDirection::Desc);
        let small = Node::file("1", "a").with_size(1);
        let big = Node::file("2", "b").with_size(10);
        assert_eq!(compare(&big, &small, &spec), Ordering::Less);

        let twin_a = Node::file("a", "x").with_size(5);
        let twin_b = Node::file("b", "y").with_size(5);
        assert_eq!(compare(&twin_a, &twin_b, &spec), Ordering::Less);
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let spec = SortSpec::new(SortField::UpdatedAt, SortDirection::Asc);
        let unknown = Node::file("1", "a");
        let known = Node::file("2", "b").with_updated_at(100);
        assert_eq!(compare(&unknown, &known, &spec), Ordering::Less);
    }

    #[test]
    fn query_form_round_trips() {
        let spec: SortSpec = "-modified".parse().unwrap();
        assert_eq!(spec.field, SortField::UpdatedAt);
        assert_eq!(spec.direction, SortDirection::Desc);
        assert_eq!(spec.to_query(), "-modified");
        assert_eq!(SortSpec::by_name().to_query(), "name");
        assert_eq!("-".parse::<SortSpec>(), Err(SortParseError::Empty));
        assert!(matches!(
            "owner".parse::<SortSpec>(),
            Err(SortParseError::UnknownField(field)) if field == "owner"
        ));
    }

    #[test]
    fn affects_order_tracks_active_field_only() {
        let spec = SortSpec::by_name();
        let before = Node::file("1", "a.txt").with_size(1);
        let resized = before.clone().with_size(2);
        let renamed = Node {
            name: "b.txt".to_string(),
            ..before.clone()
        };
        assert!(!spec.affects_order(&before, &resized));
        assert!(spec.affects_order(&before, &renamed));

        let by_size = SortSpec::new(SortField::Size, SortDirection::Asc);
        assert!(by_size.affects_order(&before, &resized));
    }
}

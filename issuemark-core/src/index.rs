//! Builds the per-file annotation views from a raw issue list.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Annotation, AnnotationIndex, FileGroup, GroupKey, Issue};

/// Builds the grouped, line-mapped view of `issues` for `current_file`.
///
/// Only open issues that are not pull requests participate. Issues without a
/// parseable reference land in the [`GroupKey::Other`] group and never in the
/// line map. When `current_file` is `None` the line map and icon set are empty.
///
/// Pure: equal inputs always produce equal indexes.
pub fn build_index(issues: &[Issue], current_file: Option<&str>) -> AnnotationIndex {
    let mut by_key: HashMap<GroupKey, Vec<Annotation>> = HashMap::new();
    let mut index = AnnotationIndex::default();

    for issue in issues.iter().filter(|i| i.is_open() && !i.is_pull_request) {
        let issue = Arc::new(issue.clone());
        let reference = issue.reference();

        if let (Some(current), Some(r)) = (current_file, reference.as_ref()) {
            if r.file_path == current {
                for line in r.lines() {
                    index.line_to_issues.entry(line).or_default().push(Arc::clone(&issue));
                }
                index.icon_lines.insert(r.start_line);
            }
        }

        let key = match &reference {
            Some(r) => GroupKey::File(r.file_path.clone()),
            None => GroupKey::Other,
        };
        by_key.entry(key).or_default().push(Annotation { issue, reference });
    }

    let mut groups: Vec<FileGroup> = by_key
        .into_iter()
        .map(|(key, mut annotations)| {
            // Vec::sort_by is stable, so unreferenced issues keep input order.
            annotations.sort_by(|a, b| match (&a.reference, &b.reference) {
                (Some(x), Some(y)) => x.start_line.cmp(&y.start_line),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
            FileGroup { key, annotations }
        })
        .collect();
    groups.sort_by(|a, b| compare_keys(&a.key, &b.key, current_file));
    index.groups = groups;

    index
}

/// Group order: the current file first, `Other` last, the rest ascending.
fn compare_keys(a: &GroupKey, b: &GroupKey, current_file: Option<&str>) -> Ordering {
    let rank = |k: &GroupKey| match k {
        GroupKey::File(p) if Some(p.as_str()) == current_file => 0,
        GroupKey::File(_) => 1,
        GroupKey::Other => 2,
    };
    rank(a).cmp(&rank(b)).then_with(|| a.as_str().cmp(b.as_str()))
}

impl AnnotationIndex {
    /// Issues whose range covers `line` in the current file.
    pub fn issues_at(&self, line: u32) -> &[Arc<Issue>] {
        self.line_to_issues.get(&line).map(Vec::as_slice).unwrap_or_default()
    }

    /// First gutter-marker line strictly after `line`.
    pub fn next_icon_line(&self, line: u32) -> Option<u32> {
        self.icon_lines.range(line.saturating_add(1)..).next().copied()
    }

    /// Last gutter-marker line strictly before `line`.
    pub fn prev_icon_line(&self, line: u32) -> Option<u32> {
        self.icon_lines.range(..line).next_back().copied()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&FileGroup> {
        self.groups.iter().find(|g| &g.key == key)
    }

    /// Total number of annotations across all groups.
    pub fn annotation_count(&self) -> usize {
        self.groups.iter().map(|g| g.annotations.len()).sum()
    }

    /// Flattened `(group, annotation)` pairs in sidebar order.
    pub fn iter_annotations(&self) -> impl Iterator<Item = (&FileGroup, &Annotation)> {
        self.groups.iter().flat_map(|g| g.annotations.iter().map(move |a| (g, a)))
    }
}

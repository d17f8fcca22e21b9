//! Diagnostic accumulation.
//!
//! Validation is exhaustive rather than fail-fast: every collaborator pushes
//! [`Issue`]s into a [`Collector`] that is passed by `&mut` through the whole
//! recursive construction. Context tags are pushed with [`Collector::scoped`]
//! and popped when the returned guard drops, so a tag never outlives its call.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::{DiagnosticKind, Issue};

/// The kind of scope a context tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Input,
    Output,
    SubstitutionMapping,
    NodeTemplate,
    Import,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Input => write!(f, "input"),
            Scope::Output => write!(f, "output"),
            Scope::SubstitutionMapping => write!(f, "substitution_mapping"),
            Scope::NodeTemplate => write!(f, "node_template"),
            Scope::Import => write!(f, "import"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTag {
    pub scope: Scope,
    pub name: String,
}

impl std::fmt::Display for ContextTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.scope, self.name)
    }
}

/// A collected issue together with the context stack active when it was pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub issue: Issue,
    pub context: Vec<ContextTag>,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        self.issue.kind()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.context.is_empty() {
            let tags: Vec<String> = self.context.iter().map(|t| t.to_string()).collect();
            write!(f, "[{}] ", tags.join(" > "))?;
        }
        write!(f, "{}: {}", self.kind(), self.issue)
    }
}

/// Ordered diagnostic accumulator with a context stack.
#[derive(Debug, Default)]
pub struct Collector {
    diagnostics: Vec<Diagnostic>,
    collecting: bool,
    context: Vec<ContextTag>,
}

/// A copy of the complete collector state, see [`Collector::restore`].
#[derive(Debug, Clone)]
pub struct SavePoint {
    diagnostics: Vec<Diagnostic>,
    collecting: bool,
    context: Vec<ContextTag>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh collection window, discarding anything left from a previous one.
    pub fn start(&mut self) {
        self.diagnostics.clear();
        self.context.clear();
        self.collecting = true;
    }

    pub fn stop(&mut self) {
        self.collecting = false;
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn push(&mut self, issue: Issue) {
        if !self.collecting {
            warn!(%issue, "diagnostic recorded outside an open collection window");
        }
        debug!(kind = %issue.kind(), %issue, "collected diagnostic");
        self.diagnostics.push(Diagnostic {
            issue,
            context: self.context.clone(),
        });
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// Push a context tag for the lifetime of the returned guard.
    pub fn scoped(&mut self, scope: Scope, name: impl Into<String>) -> ContextGuard<'_> {
        self.context.push(ContextTag {
            scope,
            name: name.into(),
        });
        ContextGuard { collector: self }
    }

    pub fn context(&self) -> &[ContextTag] {
        &self.context
    }

    pub fn save_point(&self) -> SavePoint {
        SavePoint {
            diagnostics: self.diagnostics.clone(),
            collecting: self.collecting,
            context: self.context.clone(),
        }
    }

    pub fn restore(&mut self, save_point: SavePoint) {
        self.diagnostics = save_point.diagnostics;
        self.collecting = save_point.collecting;
        self.context = save_point.context;
    }

    /// Drop every collected diagnostic whose kind is in `kinds`.
    pub fn remove_kinds(&mut self, kinds: &[DiagnosticKind]) {
        self.diagnostics.retain(|d| !kinds.contains(&d.kind()));
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn report(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_string()).collect()
    }
}

/// Scoped context tag; derefs to the collector and pops the tag on drop.
pub struct ContextGuard<'a> {
    collector: &'a mut Collector,
}

impl Deref for ContextGuard<'_> {
    type Target = Collector;

    fn deref(&self) -> &Collector {
        self.collector
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Collector {
        self.collector
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.collector.context.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(field: &str) -> Issue {
        Issue::unknown_field("Template", field)
    }

    #[test]
    fn context_is_popped_when_guard_drops() {
        let mut collector = Collector::new();
        collector.start();
        {
            let mut scoped = collector.scoped(Scope::Input, "cpus");
            scoped.push(unknown("a"));
            {
                let mut inner = scoped.scoped(Scope::Output, "ip");
                inner.push(unknown("b"));
            }
            assert_eq!(scoped.context().len(), 1);
        }
        collector.push(unknown("c"));

        assert!(collector.context().is_empty());
        let lines = collector.report();
        assert!(lines[0].starts_with("[input: cpus] UnknownFieldError"));
        assert!(lines[1].starts_with("[input: cpus > output: ip] "));
        assert!(lines[2].starts_with("UnknownFieldError"));
    }

    #[test]
    fn restore_rolls_back_to_save_point() {
        let mut collector = Collector::new();
        collector.start();
        collector.push(unknown("kept"));
        let save = collector.save_point();

        collector.push(unknown("dropped"));
        collector.stop();
        collector.restore(save);

        assert!(collector.is_collecting());
        assert_eq!(collector.diagnostics().len(), 1);
    }

    #[test]
    fn remove_kinds_keeps_other_diagnostics_in_order() {
        let mut collector = Collector::new();
        collector.start();
        collector.push(unknown("first"));
        collector.push(Issue::MissingRequiredInput {
            what: "SubstitutionMappings".into(),
            input_name: "p".into(),
        });
        collector.push(unknown("second"));

        collector.remove_kinds(&DiagnosticKind::MISSING_VALUE_KINDS);

        assert_eq!(collector.diagnostics().len(), 2);
        assert_eq!(collector.count_kind(DiagnosticKind::UnknownField), 2);
    }
}

//! Descriptive hooks for visualising patterns and engines.
//!
//! Nothing here is consulted by matching.

use std::fmt::Write;

use crate::engine::{CompareReplace, Rule, Step};
use crate::pattern::{PatRef, PatternItem, PatternNode, Patterns};
use crate::slave::SlaveSpec;

/// Labelled edge to a sub-pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphLink {
    pub label: String,
    pub target: PatRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphInfo {
    pub name: String,
    pub links: Vec<GraphLink>,
    /// Restrictions and modes that change how the node matches.
    pub flags: Vec<&'static str>,
}

impl GraphInfo {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
            flags: Vec::new(),
        }
    }

    fn link(mut self, label: impl Into<String>, target: PatRef) -> Self {
        self.links.push(GraphLink {
            label: label.into(),
            target,
        });
        self
    }

    fn flag(mut self, flag: &'static str) -> Self {
        self.flags.push(flag);
        self
    }
}

pub trait Graphable {
    fn graph_info(&self) -> GraphInfo;
}

impl Graphable for PatternNode {
    fn graph_info(&self) -> GraphInfo {
        match self {
            PatternNode::Grammar {
                kind,
                payload,
                items,
            } => {
                let mut info = GraphInfo::new(kind.name());
                if payload.is_some() {
                    info = info.flag("payload");
                }
                for (spec, item) in kind.schema().iter().zip(items) {
                    match item {
                        PatternItem::Any => {}
                        PatternItem::Single(p) => info = info.link(spec.name, *p),
                        PatternItem::Sequence(ps) | PatternItem::Collection(ps) => {
                            for (i, p) in ps.iter().enumerate() {
                                info = info.link(format!("{}[{i}]", spec.name), *p);
                            }
                        }
                    }
                }
                info
            }
            PatternNode::Star { kind, restriction } => {
                let info = GraphInfo::new(format!("Star<{kind}>"));
                match restriction {
                    Some(r) => info.link("restriction", *r).flag("restricted"),
                    None => info,
                }
            }
            PatternNode::Stuff {
                kind,
                terminus,
                recurse_restriction,
            } => {
                let mut info = GraphInfo::new(format!("Stuff<{kind}>"));
                if let Some(t) = terminus {
                    info = info.link("terminus", *t);
                }
                if let Some(r) = recurse_restriction {
                    info = info.link("recurse", *r).flag("recurse-restricted");
                }
                info
            }
            PatternNode::MatchAll { kind, patterns } => patterns
                .iter()
                .fold(GraphInfo::new(format!("MatchAll<{kind}>")), |info, p| {
                    info.link("&", *p)
                }),
            PatternNode::MatchAny { kind, patterns } => patterns
                .iter()
                .fold(GraphInfo::new(format!("MatchAny<{kind}>")), |info, p| {
                    info.link("|", *p)
                }),
            PatternNode::NotMatch { kind, pattern } => {
                GraphInfo::new(format!("NotMatch<{kind}>")).link("!", *pattern)
            }
            PatternNode::Overlay {
                kind,
                through,
                overlay,
            } => GraphInfo::new(format!("Overlay<{kind}>"))
                .link("through", *through)
                .link("overlay", *overlay),
            PatternNode::Identity { kind, node } => {
                GraphInfo::new(format!("Identity<{kind}> {node}"))
            }
            PatternNode::BuildIdentifier {
                kind,
                template,
                sources,
            } => sources.iter().enumerate().fold(
                GraphInfo::new(format!("Build<{kind}> \"{template}\"")).flag("builder"),
                |info, (i, p)| info.link(format!("source[{i}]"), *p),
            ),
            PatternNode::Slave(spec) => spec.graph_info(),
        }
    }
}

impl Graphable for SlaveSpec {
    fn graph_info(&self) -> GraphInfo {
        let mut info = GraphInfo::new(format!("Slave<{}>", self.kind))
            .link("through", self.through)
            .link("search", self.rule.search())
            .link("replace", self.rule.replace());
        info.flags.extend(rule_flags(&self.rule));
        info
    }
}

impl Graphable for CompareReplace {
    fn graph_info(&self) -> GraphInfo {
        let rule = self.rule();
        let mut info = GraphInfo::new(self.name())
            .link("search", rule.search())
            .link("replace", rule.replace());
        info.flags.extend(rule_flags(rule));
        info
    }
}

fn rule_flags(rule: &Rule) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if !rule.couplings().is_empty() {
        flags.push("coupled");
    }
    if rule.condition().is_some() {
        flags.push("conditional");
    }
    if rule.limit().is_some() {
        flags.push("repeating");
    }
    flags
}

/// Render everything reachable from `root` as a Graphviz digraph.
///
/// Slave search and replace patterns are included, reached through their
/// host.
pub fn to_dot(patterns: &Patterns, root: PatRef) -> String {
    let mut out = String::new();
    writeln!(out, "digraph patterns {{").expect("fmt::Write to String never fails");
    let mut seen = Vec::new();
    let mut stack = vec![root];
    while let Some(pat) = stack.pop() {
        if seen.contains(&pat) {
            continue;
        }
        seen.push(pat);
        let info = patterns.get(pat).graph_info();
        let label = if info.flags.is_empty() {
            info.name.clone()
        } else {
            format!("{} [{}]", info.name, info.flags.join(", "))
        };
        writeln!(out, "  {pat} [label={label:?}];").expect("fmt::Write to String never fails");
        for link in &info.links {
            writeln!(out, "  {pat} -> {} [label={:?}];", link.target, link.label)
                .expect("fmt::Write to String never fails");
        }
        stack.extend(info.links.iter().rev().map(|l| l.target));
    }
    out.push_str("}\n");
    out
}

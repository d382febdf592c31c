// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State-machine parser for introspection documents.
//!
//! The document tree is flattened into a stream of open/close element
//! events and fed through a single stack of open-element contexts, one per
//! nesting depth. An `<interface>` whose name is already cached contributes
//! the cached node and has its entire subtree skipped rather than reparsed;
//! an uncached one is inserted into the cache at open time, before its
//! children, so repeated references within the same parse short-circuit
//! too.
//!
//! A structural error is fatal to the parse and rolls back every cache
//! entry this parse inserted, restoring whatever was displaced.

use super::model::{
    ArgDirection, ArgNode, InterfaceMembers, InterfaceNode, MethodNode, PropertyNode, SignalNode,
};
use super::IntrospectionCache;
use crate::error::{Error, Result};
use std::sync::Arc;

enum Event<'a, 'input> {
    Open(roxmltree::Node<'a, 'input>),
    Close(roxmltree::Node<'a, 'input>),
}

fn flatten<'a, 'input>(node: roxmltree::Node<'a, 'input>, out: &mut Vec<Event<'a, 'input>>) {
    for child in node.children().filter(roxmltree::Node::is_element) {
        out.push(Event::Open(child));
        flatten(child, out);
        out.push(Event::Close(child));
    }
}

fn required_attr<'a>(node: roxmltree::Node<'a, '_>, attr: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        Error::Parse(format!(
            "<{}> element is missing its {} attribute",
            node.tag_name().name(),
            attr
        ))
    })
}

struct InterfaceCtx {
    node: Arc<InterfaceNode>,
    methods: Vec<MethodNode>,
    signals: Vec<Arc<SignalNode>>,
    properties: Vec<PropertyNode>,
    interfaces: Vec<Arc<InterfaceNode>>,
}

impl InterfaceCtx {
    fn new(node: Arc<InterfaceNode>) -> Self {
        Self {
            node,
            methods: Vec::new(),
            signals: Vec::new(),
            properties: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    fn seal(self) -> Arc<InterfaceNode> {
        self.node.seal(InterfaceMembers {
            methods: self.methods,
            signals: self.signals,
            properties: self.properties,
            interfaces: self.interfaces,
        });
        self.node
    }
}

enum OpenCtx {
    Interface(InterfaceCtx),
    Method { name: String, args: Vec<ArgNode> },
    Signal { node: Arc<SignalNode>, args: Vec<ArgNode> },
}

enum CacheEdit {
    Interface(String, Option<Arc<InterfaceNode>>),
    Signal(String, Option<Arc<SignalNode>>),
}

struct Session<'c> {
    cache: &'c IntrospectionCache,
    stack: Vec<OpenCtx>,
    roots: Vec<Arc<InterfaceNode>>,
    /// Nesting depth of `<interface>` elements inside a skipped cached
    /// interface; zero means parsing normally.
    skip_depth: usize,
    edits: Vec<CacheEdit>,
}

impl<'c> Session<'c> {
    fn new(cache: &'c IntrospectionCache) -> Self {
        Self {
            cache,
            stack: Vec::new(),
            roots: Vec::new(),
            skip_depth: 0,
            edits: Vec::new(),
        }
    }

    fn open(&mut self, node: roxmltree::Node) -> Result<()> {
        let tag = node.tag_name().name();

        if self.skip_depth > 0 {
            if tag == "interface" {
                self.skip_depth += 1;
            }
            return Ok(());
        }

        match tag {
            "interface" => {
                let name = required_attr(node, "name")?;
                if matches!(
                    self.stack.last(),
                    Some(OpenCtx::Method { .. } | OpenCtx::Signal { .. })
                ) {
                    return Err(Error::Parse(format!(
                        "interface {} nested inside a member element",
                        name
                    )));
                }

                if let Some(cached) = self.cache.interface(name) {
                    log::trace!("[introspect] interface {} cached, skipping subtree", name);
                    self.attach_interface(cached);
                    self.skip_depth = 1;
                    return Ok(());
                }

                let iface = InterfaceNode::open(name);
                let previous = self.cache.insert_interface(name.to_string(), iface.clone());
                self.edits.push(CacheEdit::Interface(name.to_string(), previous));
                self.stack.push(OpenCtx::Interface(InterfaceCtx::new(iface)));
            }
            "method" => {
                let name = required_attr(node, "name")?;
                if !matches!(self.stack.last(), Some(OpenCtx::Interface(_))) {
                    return Err(Error::Parse(format!("method {} outside an interface", name)));
                }
                self.stack.push(OpenCtx::Method {
                    name: name.to_string(),
                    args: Vec::new(),
                });
            }
            "signal" => {
                let name = required_attr(node, "name")?;
                if !matches!(self.stack.last(), Some(OpenCtx::Interface(_))) {
                    return Err(Error::Parse(format!("signal {} outside an interface", name)));
                }
                let signal = SignalNode::open(name);
                let previous = self.cache.insert_signal(name.to_string(), signal.clone());
                self.edits.push(CacheEdit::Signal(name.to_string(), previous));
                self.stack.push(OpenCtx::Signal {
                    node: signal,
                    args: Vec::new(),
                });
            }
            "property" => {
                let name = required_attr(node, "name")?;
                let type_signature = required_attr(node, "type")?.to_string();
                let access = node.attribute("access").unwrap_or_default().to_string();
                match self.stack.last_mut() {
                    Some(OpenCtx::Interface(ctx)) => ctx.properties.push(PropertyNode {
                        name: name.to_string(),
                        type_signature,
                        access,
                    }),
                    _ => {
                        return Err(Error::Parse(format!(
                            "property {} outside an interface",
                            name
                        )))
                    }
                }
            }
            "arg" => {
                let arg = ArgNode {
                    name: node.attribute("name").map(str::to_string),
                    type_signature: required_attr(node, "type")?.to_string(),
                    direction: ArgDirection::from_attr(node.attribute("direction")),
                };
                match self.stack.last_mut() {
                    Some(OpenCtx::Method { args, .. } | OpenCtx::Signal { args, .. }) => {
                        args.push(arg);
                    }
                    _ => {
                        return Err(Error::Parse(
                            "arg element whose parent is neither method nor signal".to_string(),
                        ))
                    }
                }
            }
            // node, annotation, and anything unknown is transparent.
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, node: roxmltree::Node) -> Result<()> {
        let tag = node.tag_name().name();

        if self.skip_depth > 0 {
            if tag == "interface" {
                self.skip_depth -= 1;
            }
            return Ok(());
        }

        match tag {
            "interface" => match self.stack.pop() {
                Some(OpenCtx::Interface(ctx)) => {
                    let sealed = ctx.seal();
                    self.attach_interface(sealed);
                }
                _ => return Err(Error::Parse("mismatched interface close".to_string())),
            },
            "method" => match self.stack.pop() {
                Some(OpenCtx::Method { name, args }) => match self.stack.last_mut() {
                    Some(OpenCtx::Interface(ctx)) => ctx.methods.push(MethodNode { name, args }),
                    _ => return Err(Error::Parse("method closed outside an interface".to_string())),
                },
                _ => return Err(Error::Parse("mismatched method close".to_string())),
            },
            "signal" => match self.stack.pop() {
                Some(OpenCtx::Signal { node, args }) => {
                    node.seal(args);
                    match self.stack.last_mut() {
                        Some(OpenCtx::Interface(ctx)) => ctx.signals.push(node),
                        _ => {
                            return Err(Error::Parse(
                                "signal closed outside an interface".to_string(),
                            ))
                        }
                    }
                }
                _ => return Err(Error::Parse("mismatched signal close".to_string())),
            },
            _ => {}
        }
        Ok(())
    }

    /// Attach a finished or cached interface to the enclosing interface, or
    /// to the document root list when nothing encloses it.
    fn attach_interface(&mut self, node: Arc<InterfaceNode>) {
        match self.stack.last_mut() {
            Some(OpenCtx::Interface(parent)) => parent.interfaces.push(node),
            _ => self.roots.push(node),
        }
    }

    /// Undo this parse's cache insertions, restoring displaced entries.
    fn rollback(self) {
        for edit in self.edits.into_iter().rev() {
            match edit {
                CacheEdit::Interface(name, Some(previous)) => {
                    self.cache.insert_interface(name, previous);
                }
                CacheEdit::Interface(name, None) => {
                    self.cache.remove_interface(&name);
                }
                CacheEdit::Signal(name, Some(previous)) => {
                    self.cache.insert_signal(name, previous);
                }
                CacheEdit::Signal(name, None) => {
                    self.cache.remove_signal(&name);
                }
            }
        }
    }
}

/// Parse one document against the given cache, returning the top-level
/// interfaces in document order.
pub(super) fn parse_into(
    cache: &IntrospectionCache,
    doc: &roxmltree::Document,
) -> Result<Vec<Arc<InterfaceNode>>> {
    let mut events = Vec::new();
    flatten(doc.root(), &mut events);

    let mut session = Session::new(cache);
    for event in &events {
        let step = match event {
            Event::Open(node) => session.open(*node),
            Event::Close(node) => session.close(*node),
        };
        if let Err(e) = step {
            session.rollback();
            return Err(e);
        }
    }
    Ok(session.roots)
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Introspection document parsing with a deduplicating node cache.
//!
//! Remote objects describe themselves with an XML document listing their
//! interfaces, methods, signals, and properties. Fleet-wide, the same
//! interfaces appear in document after document; the cache maps interface
//! and signal names to their parsed nodes so a repeated subtree is shared
//! by reference instead of reparsed. Callers may rely on reference
//! identity (`Arc::ptr_eq`) for deduplication.
//!
//! Only interface and signal nodes are cached. Methods, properties, and
//! arguments are never referenced by name from other documents, so caching
//! them would buy nothing.
//!
//! The cache is owned by the connection that created it and dies with it;
//! there is no process-wide introspection state.

mod model;
mod parser;

pub use model::{ArgDirection, ArgNode, InterfaceNode, MethodNode, PropertyNode, SignalNode};

use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Name-keyed cache of parsed interface and signal nodes.
#[derive(Debug, Default)]
pub struct IntrospectionCache {
    interfaces: DashMap<String, Arc<InterfaceNode>>,
    signals: DashMap<String, Arc<SignalNode>>,
}

impl IntrospectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an introspection document, returning its top-level interfaces
    /// in document order. Interface names already cached resolve to the
    /// cached node, with the corresponding subtree skipped entirely.
    ///
    /// A malformed document fails this parse only: cache entries the failed
    /// parse inserted are rolled back.
    pub fn parse_document(&self, xml: &str) -> Result<Vec<Arc<InterfaceNode>>> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| crate::error::Error::Parse(format!("invalid XML: {}", e)))?;
        parser::parse_into(self, &doc)
    }

    /// Cached interface node by wire name.
    pub fn interface(&self, name: &str) -> Option<Arc<InterfaceNode>> {
        self.interfaces.get(name).map(|entry| entry.value().clone())
    }

    /// Cached signal node by name.
    pub fn signal(&self, name: &str) -> Option<Arc<SignalNode>> {
        self.signals.get(name).map(|entry| entry.value().clone())
    }

    /// Number of cached interface nodes.
    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    /// Drop every cached node. Subsequent parses start fresh.
    pub fn clear(&self) {
        self.interfaces.clear();
        self.signals.clear();
    }

    pub(crate) fn insert_interface(
        &self,
        name: String,
        node: Arc<InterfaceNode>,
    ) -> Option<Arc<InterfaceNode>> {
        self.interfaces.insert(name, node)
    }

    pub(crate) fn insert_signal(
        &self,
        name: String,
        node: Arc<SignalNode>,
    ) -> Option<Arc<SignalNode>> {
        self.signals.insert(name, node)
    }

    pub(crate) fn remove_interface(&self, name: &str) {
        self.interfaces.remove(name);
    }

    pub(crate) fn remove_signal(&self, name: &str) {
        self.signals.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_DOC: &str = r#"
        <node>
          <interface name="org.example.Player">
            <method name="Play">
              <arg name="track" type="s" direction="in"/>
              <arg name="queued" type="b" direction="out"/>
            </method>
            <signal name="TrackChanged">
              <arg name="track" type="s"/>
            </signal>
            <property name="Volume" type="d" access="readwrite"/>
          </interface>
          <interface name="org.example.Playlist">
            <method name="Clear"/>
          </interface>
        </node>"#;

    #[test]
    fn test_document_order_preserved() {
        let cache = IntrospectionCache::new();
        let roots = cache.parse_document(PLAYER_DOC).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].name(), "org.example.Player");
        assert_eq!(roots[1].name(), "org.example.Playlist");
    }

    #[test]
    fn test_tree_contents() {
        let cache = IntrospectionCache::new();
        let roots = cache.parse_document(PLAYER_DOC).unwrap();
        let player = &roots[0];

        let play = player.method("Play").expect("Play should be declared");
        assert_eq!(play.args.len(), 2);
        assert_eq!(play.args[0].direction, ArgDirection::In);
        assert_eq!(play.args[1].direction, ArgDirection::Out);

        assert_eq!(player.signals().len(), 1);
        assert_eq!(player.signals()[0].name(), "TrackChanged");
        assert_eq!(player.signals()[0].args().len(), 1);

        assert_eq!(player.properties().len(), 1);
        assert_eq!(player.properties()[0].access, "readwrite");
    }

    #[test]
    fn test_repeated_parse_yields_identical_nodes() {
        let cache = IntrospectionCache::new();
        let first = cache.parse_document(PLAYER_DOC).unwrap();
        let second = cache.parse_document(PLAYER_DOC).unwrap();

        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert!(Arc::ptr_eq(&first[1], &second[1]));
        assert!(Arc::ptr_eq(
            &first[0].signals()[0],
            &cache.signal("TrackChanged").unwrap()
        ));
    }

    #[test]
    fn test_cached_interface_subtree_is_skipped() {
        let cache = IntrospectionCache::new();
        let first = cache.parse_document(PLAYER_DOC).unwrap();

        // Same interface name with different content: the cached node wins
        // and the new content is discarded, not merged.
        let conflicting = r#"
            <node>
              <interface name="org.example.Player">
                <method name="SomethingElse"/>
              </interface>
            </node>"#;
        let second = cache.parse_document(conflicting).unwrap();

        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert!(second[0].method("SomethingElse").is_none());
        assert!(second[0].method("Play").is_some());
    }

    #[test]
    fn test_nested_interface_attaches_to_parent() {
        let cache = IntrospectionCache::new();
        let doc = r#"
            <node>
              <interface name="org.example.Outer">
                <interface name="org.example.Inner">
                  <method name="Poke"/>
                </interface>
              </interface>
            </node>"#;
        let roots = cache.parse_document(doc).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].interfaces().len(), 1);
        assert_eq!(roots[0].interfaces()[0].name(), "org.example.Inner");
        assert!(cache.interface("org.example.Inner").is_some());
    }

    #[test]
    fn test_arg_with_bad_parent_is_structural_error() {
        let cache = IntrospectionCache::new();
        let doc = r#"
            <node>
              <interface name="org.example.Broken">
                <arg name="loose" type="i"/>
              </interface>
            </node>"#;
        let err = cache.parse_document(doc).unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse(_)));
    }

    #[test]
    fn test_failed_parse_rolls_back_cache() {
        let cache = IntrospectionCache::new();
        let doc = r#"
            <node>
              <interface name="org.example.Broken">
                <signal name="Partial">
                  <arg type="i"/>
                </signal>
                <arg name="loose" type="i"/>
              </interface>
            </node>"#;
        assert!(cache.parse_document(doc).is_err());

        // Neither the interface nor the signal survives the failed parse.
        assert!(cache.interface("org.example.Broken").is_none());
        assert!(cache.signal("Partial").is_none());
        assert_eq!(cache.interface_count(), 0);
    }

    #[test]
    fn test_failed_parse_restores_displaced_entries() {
        let cache = IntrospectionCache::new();
        cache
            .parse_document(r#"<node><interface name="A"><signal name="S"/></interface></node>"#)
            .unwrap();
        let original = cache.signal("S").unwrap();

        // A different interface re-declares signal S, then breaks. The
        // overwritten cache entry must be restored to the original node.
        let doc = r#"
            <node>
              <interface name="B">
                <signal name="S"/>
                <arg name="loose" type="i"/>
              </interface>
            </node>"#;
        assert!(cache.parse_document(doc).is_err());
        assert!(Arc::ptr_eq(&cache.signal("S").unwrap(), &original));
        assert!(cache.interface("B").is_none());
    }

    #[test]
    fn test_unknown_elements_are_transparent() {
        let cache = IntrospectionCache::new();
        let doc = r#"
            <node>
              <interface name="org.example.Annotated">
                <annotation name="org.freedesktop.DBus.Deprecated" value="true"/>
                <method name="Old">
                  <annotation name="org.freedesktop.DBus.Method.NoReply" value="true"/>
                </method>
              </interface>
            </node>"#;
        let roots = cache.parse_document(doc).unwrap();
        assert_eq!(roots[0].methods().len(), 1);
    }

    #[test]
    fn test_clear_forgets_nodes() {
        let cache = IntrospectionCache::new();
        let first = cache.parse_document(PLAYER_DOC).unwrap();
        cache.clear();
        let second = cache.parse_document(PLAYER_DOC).unwrap();
        assert!(!Arc::ptr_eq(&first[0], &second[0]));
    }
}

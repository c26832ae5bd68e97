//! Registry of element parsers, layout producers, and renderers
//!
//! The built-in element types are registered the same way a plugin would
//! register new ones: by name, with plain function pointers.

use std::collections::BTreeMap;

use crate::layout::placer::{self, ProducerFn};
use crate::parser::elements::{self, ElementParserFn};
use crate::parser::spec::{self, SpecState};
use crate::renderer::shapes::{self, RendererFn};

/// Runs after the spec section has been parsed, before layout begins.
pub type ListenerFn = fn(&mut SpecState);

pub struct Registry {
    parsers: BTreeMap<String, ElementParserFn>,
    producers: BTreeMap<String, ProducerFn>,
    renderers: BTreeMap<String, RendererFn>,
    listeners: Vec<ListenerFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
            producers: BTreeMap::new(),
            renderers: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    /// A registry with every built-in element type wired up.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();

        r.register_parser("circle", elements::parse_circle);
        r.register_parser("ellipse", elements::parse_ellipse);
        r.register_parser("line", elements::parse_line);
        r.register_parser("rect", elements::parse_rect);
        r.register_parser("polygon", elements::parse_polygon);
        r.register_parser("text", elements::parse_text);
        r.register_parser("path", elements::parse_path);
        r.register_parser("image", elements::parse_image);
        r.register_parser("shape", elements::parse_shape);

        r.register_producer("line", placer::produce_line);
        r.register_producer("text", placer::produce_text);
        r.register_producer("polygon", placer::produce_polygon);
        r.register_producer("shape", placer::produce_shape);

        r.register_renderer("ellipse", shapes::render_ellipse);
        r.register_renderer("line", shapes::render_line);
        r.register_renderer("rect", shapes::render_rect);
        r.register_renderer("polygon", shapes::render_polygon);
        r.register_renderer("text", shapes::render_text);
        r.register_renderer("path", shapes::render_path);
        r.register_renderer("image", shapes::render_image);
        r.register_renderer("shape", shapes::render_shape);

        r.add_listener(spec::apply_text_alignment_styles);

        r
    }

    pub fn register_parser(&mut self, name: &str, parser: ElementParserFn) {
        self.parsers.insert(name.to_string(), parser);
    }

    pub fn register_producer(&mut self, tag: &str, producer: ProducerFn) {
        self.producers.insert(tag.to_string(), producer);
    }

    pub fn register_renderer(&mut self, tag: &str, renderer: RendererFn) {
        self.renderers.insert(tag.to_string(), renderer);
    }

    pub fn add_listener(&mut self, listener: ListenerFn) {
        self.listeners.push(listener);
    }

    pub fn parser(&self, name: &str) -> Option<ElementParserFn> {
        self.parsers.get(name).copied()
    }

    pub fn producer(&self, tag: &str) -> Option<ProducerFn> {
        self.producers.get(tag).copied()
    }

    pub fn renderer(&self, tag: &str) -> Option<RendererFn> {
        self.renderers.get(tag).copied()
    }

    pub fn notify_spec_parsed(&self, state: &mut SpecState) {
        for listener in &self.listeners {
            listener(state);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

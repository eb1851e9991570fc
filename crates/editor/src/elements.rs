use scribe_protocol::Language;
use serde::Serialize;
use tree_sitter::{Node, Parser};

use crate::error::{EditorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Function,
    /// Python/JS/TS classes; Rust `impl` and `trait` blocks
    Class,
}

/// A named function or class span. Derived from a parse of the current text;
/// re-derive after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeElement {
    pub kind: ElementKind,
    pub name: String,
    /// 0-based index of the first line
    pub start_line: usize,
    /// 0-based index of the first line past the element
    pub end_line: usize,
    /// Column of the definition keyword
    pub indentation: usize,
}

impl CodeElement {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Whether [`parse_elements`] has a grammar for `language`.
pub fn supports_structure(language: Language) -> bool {
    grammar(language).is_ok()
}

fn grammar(language: Language) -> Result<tree_sitter::Language> {
    match language {
        Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
        Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        other => Err(EditorError::unsupported_language(other.as_str())),
    }
}

/// Reusable parser for one language.
pub struct ElementParser {
    parser: Parser,
    language: Language,
}

impl ElementParser {
    pub fn new(language: Language) -> Result<Self> {
        let ts_language = grammar(language)?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| EditorError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser, language })
    }

    /// Elements in pre-order: an enclosing class precedes its methods.
    pub fn parse(&mut self, source: &str) -> Result<Vec<CodeElement>> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| EditorError::ParseError("Failed to parse source code".to_string()))?;

        let mut elements = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if let Some((kind, name)) = classify(self.language, source, node) {
                elements.push(to_element(kind, name, node));
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(elements)
    }
}

pub fn parse_elements(source: &str, language: Language) -> Result<Vec<CodeElement>> {
    ElementParser::new(language)?.parse(source)
}

/// Elements not nested inside another one. Expects the pre-order of
/// [`parse_elements`].
pub fn top_level(elements: &[CodeElement]) -> Vec<&CodeElement> {
    let mut top: Vec<&CodeElement> = Vec::new();
    for element in elements {
        let nested = top
            .last()
            .is_some_and(|outer| element.start_line < outer.end_line);
        if !nested {
            top.push(element);
        }
    }
    top
}

fn to_element(kind: ElementKind, name: String, node: Node) -> CodeElement {
    let start = node.start_position();
    let end = node.end_position();
    CodeElement {
        kind,
        name,
        start_line: start.row,
        // A node ending at column 0 already stops before that row.
        end_line: if end.column == 0 { end.row } else { end.row + 1 },
        indentation: start.column,
    }
}

fn classify(language: Language, source: &str, node: Node) -> Option<(ElementKind, String)> {
    let kind = match (language, node.kind()) {
        (Language::Python, "function_definition")
        | (Language::Rust, "function_item")
        | (
            Language::JavaScript | Language::TypeScript,
            "function_declaration" | "generator_function_declaration" | "method_definition",
        ) => ElementKind::Function,
        (Language::Python, "class_definition")
        | (Language::Rust, "trait_item")
        | (
            Language::JavaScript | Language::TypeScript,
            "class_declaration" | "abstract_class_declaration",
        ) => ElementKind::Class,
        (Language::Rust, "impl_item") => {
            return impl_target(source, node).map(|name| (ElementKind::Class, name));
        }
        _ => return None,
    };
    let name = node.child_by_field_name("name")?;
    Some((kind, text(source, name)?.to_string()))
}

/// `impl Foo`, `impl<T> Foo<T>`, `impl Trait for a::Foo` all name `Foo`.
fn impl_target(source: &str, impl_node: Node) -> Option<String> {
    let ty = impl_node.child_by_field_name("type")?;
    let name_node = match ty.kind() {
        "generic_type" => ty.child_by_field_name("type")?,
        "scoped_type_identifier" => ty.child_by_field_name("name")?,
        _ => ty,
    };
    let name = text(source, name_node)?;
    Some(name.rsplit("::").next().unwrap_or(name).to_string())
}

fn text<'a>(source: &'a str, node: Node) -> Option<&'a str> {
    node.utf8_text(source.as_bytes()).ok()
}

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

use crate::error::{ExtractError, ExtractResult};

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

pub fn load(markup: &str) -> ExtractResult<RcDom> {
    if markup.trim().is_empty() {
        return Err(ExtractError::ParseFailure("document is empty".to_string()));
    }

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .map_err(|e| ExtractError::ParseFailure(e.to_string()))
}

pub fn tag_name(handle: &Handle) -> Option<&str> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub fn is_tag(handle: &Handle, tag: &str) -> bool {
    tag_name(handle) == Some(tag)
}

pub fn attr(handle: &Handle, attr_name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_class(handle: &Handle, class: &str) -> bool {
    attr(handle, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Text content with runs of whitespace collapsed to single spaces.
pub fn text(handle: &Handle) -> String {
    let mut buffer = String::new();
    collect_text(handle, &mut buffer);
    WHITESPACE_REGEX.replace_all(buffer.trim(), " ").into_owned()
}

fn collect_text(handle: &Handle, buffer: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => buffer.push_str(contents.borrow().as_ref()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_text(child, buffer);
            }
        }
        _ => {}
    }
}

/// All element descendants matching `pred`, in document order.
pub fn find_all<F>(handle: &Handle, pred: F) -> Vec<Handle>
where
    F: Fn(&Handle) -> bool,
{
    let mut found = Vec::new();
    walk(handle, &pred, &mut found);
    found
}

fn walk<F>(handle: &Handle, pred: &F, found: &mut Vec<Handle>)
where
    F: Fn(&Handle) -> bool,
{
    for child in handle.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) && pred(child) {
            found.push(child.clone());
        }
        walk(child, pred, found);
    }
}

pub fn find_first<F>(handle: &Handle, pred: F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    first_match(handle, &pred)
}

fn first_match<F>(handle: &Handle, pred: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    for child in handle.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) && pred(child) {
            return Some(child.clone());
        }
        if let Some(found) = first_match(child, pred) {
            return Some(found);
        }
    }
    None
}

pub fn find_by_id(handle: &Handle, id: &str) -> Option<Handle> {
    find_first(handle, |h| attr(h, "id").as_deref() == Some(id))
}

/// Direct element children with the given tag name.
pub fn children_named(handle: &Handle, tag: &str) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|child| is_tag(child, tag))
        .cloned()
        .collect()
}

/// The `value` of a form control, or its text when it has none.
pub fn control_value(handle: &Handle) -> String {
    attr(handle, "value").unwrap_or_else(|| text(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_markup_is_a_parse_failure() {
        assert!(matches!(load("  \n "), Err(ExtractError::ParseFailure(_))));
    }

    #[test]
    fn queries_walk_the_whole_tree() {
        let dom = load(
            r#"<html><body><div id="outer" class="a b"><span>  Hello
                <b>world</b> </span><input id="flag" value="True"></div></body></html>"#,
        )
        .unwrap();

        let outer = find_by_id(&dom.document, "outer").unwrap();
        assert!(has_class(&outer, "b"));
        assert!(!has_class(&outer, "c"));
        assert_eq!(text(&outer), "Hello world");
        assert_eq!(children_named(&outer, "span").len(), 1);

        let flag = find_by_id(&dom.document, "flag").unwrap();
        assert_eq!(control_value(&flag), "True");
        assert_eq!(find_all(&dom.document, |h| is_tag(h, "b")).len(), 1);
    }
}

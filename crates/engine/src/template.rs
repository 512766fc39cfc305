//! Replacement template substitution.
//!
//! Placeholders are written `{{NAME}}`:
//!
//! - `attr={{OUTER}}` takes the value of the outer prop whose output name
//!   (after `lookup`) is `attr`; without one the attribute is left out.
//! - a bare `{{OUTER}}` renders every outer prop not used elsewhere as
//!   attributes. Without a bare `{{OUTER}}` those props are added to the
//!   template's root tag.
//! - `{{INNER}}` renders the inner props as children, then the original
//!   children; `{{CHILDREN}}` is the original children alone.
//! - `{{name}}` is the value of that prop (original or looked-up name).
//!
//! Values are copied from the source text as written, so expressions and
//! quoting survive unchanged.

use std::collections::HashSet;

use migr8_core::ast::{format_number, ElementUsage, Prop, PropValue};
use migr8_rules::{MigrationRuleSet, ReplaceWith};

use crate::error::PlanError;

const OUTER: &str = "OUTER";
const INNER: &str = "INNER";
const CHILDREN: &str = "CHILDREN";

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    /// Props that ended up nowhere in the output, in source order.
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    start: usize,
    end: usize,
    name: String,
    attr: Option<AttrContext>,
}

/// The slot is the value of `name=`.
#[derive(Debug, Clone, PartialEq)]
struct AttrContext {
    name: String,
    /// Start of the whitespace before the attribute name.
    removal_start: usize,
}

fn is_placeholder_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-'))
}

fn is_attr_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-' | ':')
}

fn find_slots(template: &str) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut from = 0;
    while let Some(rel) = template[from..].find("{{") {
        let start = from + rel;
        let Some(close) = template[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let name = template[start + 2..end - 2].trim();
        if !is_placeholder_name(name) {
            // JSX object literal such as style={{ color: "red" }}.
            from = start + 2;
            continue;
        }
        slots.push(Slot {
            start,
            end,
            name: name.to_string(),
            attr: attr_context(template, start),
        });
        from = end;
    }
    slots
}

fn attr_context(template: &str, slot_start: usize) -> Option<AttrContext> {
    let before = template[..slot_start].trim_end();
    let before = before.strip_suffix('=')?.trim_end();
    let name_len: usize = before
        .chars()
        .rev()
        .take_while(|c| is_attr_name_char(*c))
        .map(char::len_utf8)
        .sum();
    if name_len == 0 {
        return None;
    }
    let name_start = before.len() - name_len;
    Some(AttrContext {
        name: before[name_start..].to_string(),
        removal_start: template[..name_start].trim_end().len(),
    })
}

/// End of the template's root tag name, where unplaced outer props go.
fn root_tag_name_end(template: &str) -> Option<usize> {
    let bytes = template.as_bytes();
    let lt = template.find('<')?;
    let first = *bytes.get(lt + 1)?;
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b'$') {
        return None;
    }
    let mut i = lt + 1;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'$' | b'.' | b'-' | b':'))
    {
        i += 1;
    }
    Some(i)
}

fn span_text<'t>(text: &'t str, span: migr8_core::Span) -> &'t str {
    &text[span.start..span.end]
}

/// The prop's value as an attribute value: `"x"`, `{expr}`.
fn value_as_attr(prop: &Prop, text: &str) -> String {
    match (&prop.value, prop.value_span) {
        (_, Some(span)) => span_text(text, span).to_string(),
        (PropValue::Spread(e), None) => format!("{{{}}}", e),
        (_, None) => "{true}".to_string(),
    }
}

/// The whole attribute under a (possibly new) name.
fn prop_as_attr(out_name: &str, prop: &Prop, text: &str) -> String {
    match (&prop.value, prop.value_span) {
        (PropValue::Spread(_), _) => span_text(text, prop.span).to_string(),
        (_, Some(span)) => format!("{}={}", out_name, span_text(text, span)),
        (_, None) => out_name.to_string(),
    }
}

/// The prop's value as JSX children.
fn value_as_child(prop: &Prop) -> String {
    match &prop.value {
        PropValue::Str(s) if !s.contains(['{', '}', '<', '>']) => s.clone(),
        PropValue::Str(s) => format!("{{{}}}", serde_json::Value::String(s.clone())),
        PropValue::Number(n) => format!("{{{}}}", format_number(*n)),
        PropValue::Bool(b) => format!("{{{}}}", b),
        PropValue::Expr(e) | PropValue::Spread(e) => format!("{{{}}}", e),
    }
}

/// Substitute `element` into `replace`'s template. `text` is the source the
/// element was extracted from.
pub fn render(
    set: &MigrationRuleSet,
    replace: &ReplaceWith,
    element: &ElementUsage,
    text: &str,
) -> Result<Rendered, PlanError> {
    let template = replace.template_code.as_str();
    let component = element.component_name().to_string();
    let slots = find_slots(template);

    let outer: Vec<(&String, &Prop)> = element
        .props
        .iter()
        .filter(|(name, _)| replace.outer_prop_names.contains(name))
        .collect();
    let inner: Vec<(&String, &Prop)> = element
        .props
        .iter()
        .filter(|(name, _)| replace.inner_prop_names.contains(name))
        .collect();
    let children = element
        .spans
        .children
        .map(|c| span_text(text, c))
        .unwrap_or("");

    let mut used: HashSet<&str> = HashSet::new();
    let mut pieces: Vec<(usize, usize, String)> = Vec::new();
    let mut has_child_slot = false;
    let mut bare_outer = Vec::new();

    for slot in &slots {
        match (slot.name.as_str(), &slot.attr) {
            (OUTER, Some(attr)) => {
                let found = outer.iter().find(|(name, _)| {
                    !used.contains(name.as_str())
                        && (set.lookup_name(name) == attr.name || **name == attr.name)
                });
                match found {
                    Some((name, prop)) => {
                        used.insert(name.as_str());
                        pieces.push((slot.start, slot.end, value_as_attr(prop, text)));
                    }
                    None => pieces.push((attr.removal_start, slot.end, String::new())),
                }
            }
            (OUTER, None) => bare_outer.push(slot),
            (INNER, _) => {
                has_child_slot = true;
                let mut out: String = inner.iter().map(|(_, p)| value_as_child(p)).collect();
                for (name, _) in &inner {
                    used.insert(name.as_str());
                }
                out.push_str(children);
                pieces.push((slot.start, slot.end, out));
            }
            (CHILDREN, _) => {
                has_child_slot = true;
                pieces.push((slot.start, slot.end, children.to_string()));
            }
            (placeholder, attr) => {
                let found = element
                    .props
                    .iter()
                    .find(|(name, _)| *name == placeholder)
                    .or_else(|| {
                        element
                            .props
                            .iter()
                            .find(|(name, _)| set.lookup_name(name) == placeholder)
                    });
                let Some((name, prop)) = found else {
                    return Err(PlanError::MissingPlaceholder {
                        component,
                        placeholder: placeholder.to_string(),
                    });
                };
                used.insert(name.as_str());
                let value = match attr {
                    Some(_) => value_as_attr(prop, text),
                    None => value_as_child(prop),
                };
                pieces.push((slot.start, slot.end, value));
            }
        }
    }

    if !has_child_slot && !children.trim().is_empty() {
        return Err(PlanError::ChildrenDropped { component });
    }

    let rest: Vec<String> = outer
        .iter()
        .filter(|(name, _)| !used.contains(name.as_str()))
        .map(|(name, prop)| prop_as_attr(set.lookup_name(name), prop, text))
        .collect();
    let rest_placed = !rest.is_empty() && (!bare_outer.is_empty() || root_tag_name_end(template).is_some());
    if rest_placed {
        for (name, _) in &outer {
            used.insert(name.as_str());
        }
    }

    if let Some((first, others)) = bare_outer.split_first() {
        let attrs = rest.join(" ");
        if attrs.is_empty() {
            let start = template[..first.start].trim_end().len();
            pieces.push((start, first.end, String::new()));
        } else {
            pieces.push((first.start, first.end, attrs));
        }
        for slot in others {
            let start = template[..slot.start].trim_end().len();
            pieces.push((start, slot.end, String::new()));
        }
    } else if !rest.is_empty() {
        if let Some(at) = root_tag_name_end(template) {
            pieces.push((at, at, format!(" {}", rest.join(" "))));
        }
    }

    pieces.sort_by_key(|(start, end, _)| (*start, *end));
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (start, end, piece) in pieces {
        if start < cursor {
            // Attribute removal reaching back over an earlier piece's
            // trailing whitespace; the piece already ends there.
            out.push_str(&piece);
            cursor = cursor.max(end);
            continue;
        }
        out.push_str(&template[cursor..start]);
        out.push_str(&piece);
        cursor = end;
    }
    out.push_str(&template[cursor..]);

    let dropped = element
        .props
        .keys()
        .filter(|name| !used.contains(name.as_str()))
        .cloned()
        .collect();
    Ok(Rendered { text: out, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_core::parser::extract;
    use std::path::Path;

    fn set(lookup: &[(&str, &str)]) -> MigrationRuleSet {
        MigrationRuleSet {
            id: "ui".into(),
            source_package: "@old/ui".into(),
            lookup: lookup
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            ..MigrationRuleSet::default()
        }
    }

    fn replace(code: &str, inner: &[&str], outer: &[&str]) -> ReplaceWith {
        ReplaceWith {
            template_code: code.into(),
            inner_prop_names: inner.iter().map(|s| s.to_string()).collect(),
            outer_prop_names: outer.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn run(src: &str, set: &MigrationRuleSet, r: &ReplaceWith) -> Result<Rendered, PlanError> {
        let model = extract(Path::new("a.jsx"), src).unwrap();
        render(set, r, &model.elements[0], src)
    }

    #[test]
    fn outer_value_through_lookup() {
        let out = run(
            "<Button variant=\"primary\" />",
            &set(&[("variant", "look")]),
            &replace("<NewButton look={{OUTER}}>{{INNER}}</NewButton>", &[], &["variant"]),
        )
        .unwrap();
        assert_eq!(out.text, "<NewButton look=\"primary\"></NewButton>");
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn missing_outer_value_removes_the_attribute() {
        let out = run(
            "<Button />",
            &set(&[("variant", "look")]),
            &replace("<NewButton look={{OUTER}} />", &[], &["variant"]),
        )
        .unwrap();
        assert_eq!(out.text, "<NewButton />");
    }

    #[test]
    fn bare_outer_takes_the_remaining_props() {
        let out = run(
            "<Button variant=\"a\" onClick={go} size=\"l\">Hi</Button>",
            &set(&[("onClick", "onPress")]),
            &replace("<Pressable {{OUTER}}>{{CHILDREN}}</Pressable>", &[], &["variant", "onClick"]),
        )
        .unwrap();
        assert_eq!(out.text, "<Pressable variant=\"a\" onPress={go}>Hi</Pressable>");
        assert_eq!(out.dropped, vec!["size".to_string()]);
    }

    #[test]
    fn unplaced_outer_props_go_on_the_root_tag() {
        let out = run(
            "<Card title=\"T\" {...rest} />",
            &set(&[]),
            &replace("<Paper elevation={2} />", &[], &["title", "...rest"]),
        )
        .unwrap();
        assert_eq!(out.text, "<Paper title=\"T\" {...rest} elevation={2} />");
    }

    #[test]
    fn inner_props_become_children_before_original_children() {
        let out = run(
            "<Card title=\"Hello\" footer={f}>body</Card>",
            &set(&[]),
            &replace("<Panel>{{INNER}}</Panel>", &["title", "footer"], &[]),
        )
        .unwrap();
        assert_eq!(out.text, "<Panel>Hello{f}body</Panel>");
    }

    #[test]
    fn named_placeholder_in_both_positions() {
        let out = run(
            "<Badge count={n} label=\"New\" />",
            &set(&[]),
            &replace("<Chip value={{count}}>{{label}}</Chip>", &[], &[]),
        )
        .unwrap();
        assert_eq!(out.text, "<Chip value={n}>New</Chip>");
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn missing_named_placeholder_is_an_error() {
        let err = run("<Badge />", &set(&[]), &replace("<Chip>{{label}}</Chip>", &[], &[]))
            .unwrap_err();
        assert_eq!(
            err,
            PlanError::MissingPlaceholder {
                component: "Badge".into(),
                placeholder: "label".into()
            }
        );
    }

    #[test]
    fn children_without_a_slot_are_an_error() {
        let err = run("<Card>text</Card>", &set(&[]), &replace("<Paper />", &[], &[])).unwrap_err();
        assert!(matches!(err, PlanError::ChildrenDropped { .. }));
        // Whitespace-only children are not content.
        assert!(run("<Card>\n</Card>", &set(&[]), &replace("<Paper />", &[], &[])).is_ok());
    }

    #[test]
    fn object_literals_are_not_placeholders() {
        let out = run(
            "<Box />",
            &set(&[]),
            &replace("<div style={{ color: \"red\" }} />", &[], &[]),
        )
        .unwrap();
        assert_eq!(out.text, "<div style={{ color: \"red\" }} />");
    }
}

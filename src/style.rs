//! Serialization of `class` and `style` property values into attribute strings.

use serde_json::{Map, Value};
use std::fmt::Write as _;

/// CSS properties whose bare numeric values are lengths in pixels.
const LENGTH_PROPERTIES: &[&str] = &[
	"border-bottom-width",
	"border-left-width",
	"border-radius",
	"border-right-width",
	"border-top-width",
	"border-width",
	"bottom",
	"column-gap",
	"flex-basis",
	"font-size",
	"gap",
	"height",
	"left",
	"letter-spacing",
	"margin",
	"margin-bottom",
	"margin-left",
	"margin-right",
	"margin-top",
	"max-height",
	"max-width",
	"min-height",
	"min-width",
	"outline-width",
	"padding",
	"padding-bottom",
	"padding-left",
	"padding-right",
	"padding-top",
	"right",
	"row-gap",
	"text-indent",
	"top",
	"width",
	"word-spacing",
];

pub(crate) fn is_length_property(name: &str) -> bool {
	LENGTH_PROPERTIES.binary_search(&name).is_ok()
}

/// `fontSize` → `font-size`. Names that are already kebab-case (including `--custom` properties) pass through.
pub(crate) fn kebab_case(name: &str) -> String {
	let mut kebab = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			kebab.push('-');
			kebab.push(c.to_ascii_lowercase());
		} else {
			kebab.push(c);
		}
	}
	kebab
}

/// Serializes a `style` object into a declaration list like `font-size: 12px; color: red`.
///
/// `null` and `false` values drop their declaration.
pub(crate) fn serialize_style(declarations: &Map<String, Value>) -> String {
	let mut css = String::new();
	for (name, value) in declarations {
		let name = kebab_case(name);
		let value = match value {
			Value::Null | Value::Bool(false) => continue,
			Value::String(value) => value.clone(),
			Value::Number(number) if is_length_property(&name) && number.as_f64() != Some(0.0) => format!("{}px", number),
			Value::Number(number) => number.to_string(),
			other => other.to_string(),
		};
		if !css.is_empty() {
			css.push_str("; ");
		}
		// Writing into a `String` can't fail.
		let _ = write!(css, "{}: {}", name, value);
	}
	css
}

/// Joins a `class`/`classes` value into a single space-separated class list.
///
/// Accepts strings, (nested) arrays of class values and `{ "name": bool }` maps.
pub(crate) fn serialize_classes(value: &Value) -> String {
	fn collect<'a>(value: &'a Value, classes: &mut Vec<&'a str>) {
		match value {
			Value::String(class) => classes.extend(class.split_whitespace()),
			Value::Array(items) => {
				for item in items {
					collect(item, classes)
				}
			}
			Value::Object(toggles) => classes.extend(
				toggles
					.iter()
					.filter(|(_, enabled)| matches!(enabled, Value::Bool(true)))
					.map(|(class, _)| class.as_str()),
			),
			Value::Null | Value::Bool(_) | Value::Number(_) => (),
		}
	}

	let mut classes = Vec::new();
	collect(value, &mut classes);
	classes.join(" ")
}

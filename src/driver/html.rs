//! CSS selector evaluation over a loaded HTML page
//!
//! Documents are parsed per call and never held across an `.await`, since
//! `scraper::Html` is not `Send`.

use crate::driver::{DriverError, DriverResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Snapshot of an element taken when it was queried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    attrs: HashMap<String, String>,
    text: String,
}

impl HtmlElement {
    fn from_ref(element: ElementRef<'_>) -> Self {
        Self {
            attrs: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: element.text().collect::<String>(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Trimmed text content, `None` when blank
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Form submission assembled from a click on a submit control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    /// Raw `action` attribute, `None` to submit to the current page
    pub action: Option<String>,
    pub post: bool,
    pub fields: Vec<(String, String)>,
}

/// What clicking an element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Submit(FormSubmission),
    Link(String),
}

pub fn parse_selector(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector(format!("{selector}: {e:?}")))
}

/// All elements matching `selector`
pub fn select_all(body: &str, selector: &str) -> DriverResult<Vec<HtmlElement>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(body);
    let elements = document
        .select(&selector)
        .map(HtmlElement::from_ref)
        .collect();
    Ok(elements)
}

/// Trimmed text of the first element matching `selector`
pub fn first_text(body: &str, selector: &str) -> DriverResult<Option<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(body);
    let text = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(text)
}

/// The `name` of the form control matched by `selector`
pub fn control_name(body: &str, selector: &str) -> DriverResult<String> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(body);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))?;

    element
        .value()
        .attr("name")
        .or_else(|| element.value().attr("id"))
        .map(str::to_string)
        .ok_or_else(|| DriverError::ElementNotFound(format!("{selector} (no name attribute)")))
}

/// Works out what a click on the element matched by `selector` does
///
/// A submit control inside a form submits that form, with `filled` values
/// overriding the controls' defaults. A link follows its `href`.
pub fn click_target(
    body: &str,
    selector: &str,
    filled: &HashMap<String, String>,
) -> DriverResult<ClickTarget> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(body);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))?;

    let form = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "form");

    if let Some(form) = form {
        if is_submit_control(element) {
            return Ok(ClickTarget::Submit(collect_form(form, element, filled)?));
        }
    }

    if let Some(href) = element.value().attr("href") {
        return Ok(ClickTarget::Link(href.to_string()));
    }

    Err(DriverError::NotClickable(selector.to_string()))
}

fn is_submit_control(element: ElementRef<'_>) -> bool {
    let el = element.value();
    match el.name() {
        "button" => el.attr("type").map_or(true, |t| t.eq_ignore_ascii_case("submit")),
        "input" => el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("submit") || t.eq_ignore_ascii_case("image")),
        _ => false,
    }
}

fn collect_form(
    form: ElementRef<'_>,
    submitter: ElementRef<'_>,
    filled: &HashMap<String, String>,
) -> DriverResult<FormSubmission> {
    let controls = parse_selector("input[name], textarea[name]")?;
    let mut fields = Vec::new();

    for control in form.select(&controls) {
        let el = control.value();
        let Some(name) = el.attr("name") else {
            continue;
        };
        let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
        match kind.as_str() {
            "submit" | "button" | "image" | "reset" | "file" => continue,
            "checkbox" | "radio" if el.attr("checked").is_none() => continue,
            _ => {}
        }

        let value = match filled.get(name) {
            Some(v) => v.clone(),
            None if el.name() == "textarea" => control.text().collect(),
            None => el.attr("value").unwrap_or_default().to_string(),
        };
        fields.push((name.to_string(), value));
    }

    // Filled controls without a name attribute are keyed by id
    for (key, value) in filled {
        if !fields.iter().any(|(name, _)| name == key) {
            fields.push((key.clone(), value.clone()));
        }
    }

    if let Some(name) = submitter.value().attr("name") {
        let value = submitter.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    let post = form
        .value()
        .attr("method")
        .is_some_and(|m| m.eq_ignore_ascii_case("post"));

    Ok(FormSubmission {
        action: form
            .value()
            .attr("action")
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string),
        post,
        fields,
    })
}

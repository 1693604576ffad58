//! Human-readable one-line renderings of resource-manager entities
//!
//! Used by the event log lines of the orchestrator.

use common::models::{Attribute, Offer, Resource, TaskState, TaskStatus};

/// Rendered in place of a missing status reason
const NO_REASON: &str = "-";

fn suffix(s: &str, max_len: usize) -> &str {
    let count = s.chars().count();
    if count <= max_len {
        return s;
    }
    s.char_indices()
        .nth(count - max_len)
        .map_or("", |(idx, _)| &s[idx..])
}

/// Shortens an identifier to its last 5 characters prefixed with `#`
pub fn id(id: &str) -> String {
    format!("#{}", suffix(id, 5))
}

/// Renders offers, one per line
pub fn offers(offers: &[Offer]) -> String {
    offers.iter().map(offer).collect::<Vec<_>>().join("\n")
}

/// Renders a single offer as `host#id resources attributes`
pub fn offer(offer: &Offer) -> String {
    let mut out = format!("{}{}", offer.hostname, id(&offer.id));

    let resources = resources(&offer.resources);
    if !resources.is_empty() {
        out.push(' ');
        out.push_str(&resources);
    }
    let attributes = attributes(&offer.attributes);
    if !attributes.is_empty() {
        out.push(' ');
        out.push_str(&attributes);
    }

    out
}

/// Renders resources separated by spaces
pub fn resources(resources: &[Resource]) -> String {
    resources.iter().map(resource).collect::<Vec<_>>().join(" ")
}

/// Renders a resource as `name:value` or `name:[begin..end]...`
pub fn resource(resource: &Resource) -> String {
    let mut out = format!("{}:", resource.name);
    if let Some(value) = resource.scalar {
        out.push_str(&format!("{:.2}", value));
    }
    for (begin, end) in &resource.ranges {
        out.push_str(&format!("[{}..{}]", begin, end));
    }
    out
}

/// Renders attributes separated by `;`
pub fn attributes(attributes: &[Attribute]) -> String {
    attributes.iter().map(attribute).collect::<Vec<_>>().join(";")
}

/// Renders an attribute as `name:value`
pub fn attribute(attribute: &Attribute) -> String {
    let mut out = format!("{}:", attribute.name);
    if let Some(text) = &attribute.text {
        out.push_str(text);
    }
    if let Some(value) = attribute.scalar {
        out.push_str(&format!("{:.2}", value));
    }
    out
}

/// Renders a task status as `task STATE slave: #agent reason: R message: M`
pub fn status(status: &TaskStatus) -> String {
    let mut out = format!("{} {}", status.task_id, status.state);

    if let Some(agent_id) = status.agent_id.as_deref().filter(|a| !a.is_empty()) {
        out.push_str(" slave: ");
        out.push_str(&id(agent_id));
    }

    if status.state != TaskState::Running {
        out.push_str(" reason: ");
        out.push_str(status.reason.as_deref().unwrap_or(NO_REASON));
    }

    if let Some(message) = status.message.as_deref().filter(|m| !m.is_empty()) {
        out.push_str(" message: ");
        out.push_str(message);
    }

    out
}

//! Plain-text rendering of command output

use common::models::{Consumer, Group};

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Renders a group listing under a `groups:` header
pub fn fmt_groups(groups: &[Group], level: usize) -> String {
    let mut out = format!("{}groups:\n", indent(level));
    let groups: Vec<String> = groups.iter().map(|g| fmt_group(g, level + 1)).collect();
    out.push_str(&groups.join("\n"));
    out
}

pub fn fmt_group(group: &Group, level: usize) -> String {
    let pad = indent(level);
    let mut out = format!("{}ID: {}\n", pad, group.id);
    out.push_str(&format!("{}subscription: {}\n", pad, group.subscriptions.join(",")));
    out.push_str(&format!(
        "{}bootstrap brokers: {}\n",
        pad,
        group.bootstrap_endpoints.join(",")
    ));
    out.push_str(&fmt_consumers(&group.tasks, level));
    out
}

pub fn fmt_consumers(consumers: &[Consumer], level: usize) -> String {
    let mut out = format!("{}consumers:\n", indent(level));
    for consumer in consumers {
        out.push_str(&format!("{}ID: {}\n", indent(level + 1), consumer.id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_groups() {
        let mut foo = Group::new(
            "foo",
            vec!["bar".to_string(), "baz".to_string()],
            vec!["b1:9092".to_string(), "b2:9092".to_string()],
        );
        foo.tasks.push(Consumer {
            id: "c-1".to_string(),
        });
        let qux = Group::new("qux", vec![], vec![]);

        assert_eq!(
            fmt_groups(&[foo, qux], 0),
            "groups:\n\
             \x20 ID: foo\n\
             \x20 subscription: bar,baz\n\
             \x20 bootstrap brokers: b1:9092,b2:9092\n\
             \x20 consumers:\n\
             \x20   ID: c-1\n\
             \n\
             \x20 ID: qux\n\
             \x20 subscription: \n\
             \x20 bootstrap brokers: \n\
             \x20 consumers:\n"
        );
    }

    #[test]
    fn test_fmt_no_groups() {
        assert_eq!(fmt_groups(&[], 1), "  groups:\n");
    }
}

use std::collections::HashMap;

use conductor_core::api::TaskOutput;

/// Prefix `content` with the outputs of the node's dependencies.
///
/// Dependencies are listed in id order; empty outputs are left out. Returns
/// `content` unchanged when nothing is injected.
pub fn inject_dependency_outputs(content: &str, outputs: &HashMap<String, TaskOutput>) -> String {
    let mut dep_ids: Vec<&String> = outputs.keys().collect();
    dep_ids.sort();

    let mut injected = String::from("=== Dependency Outputs ===\n\n");
    let mut added = false;

    for dep_id in dep_ids {
        let Some(result) = outputs.get(dep_id) else {
            continue;
        };
        if result.output.trim().is_empty() {
            continue;
        }
        injected.push_str(&format!("# Task: {}\n", dep_id));
        if let Some(code) = result.exit_code {
            injected.push_str(&format!("Exit Code: {}\n", code));
        }
        injected.push_str("Output:\n");
        injected.push_str(&result.output);
        if !result.output.ends_with('\n') {
            injected.push('\n');
        }
        injected.push('\n');
        added = true;
    }

    if !added {
        return content.to_string();
    }

    injected.push_str("=== End Dependency Outputs ===\n");
    format!("{}\n\n{}", injected, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_outputs_leaves_content_alone() {
        assert_eq!(inject_dependency_outputs("task", &HashMap::new()), "task");

        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), TaskOutput::text("   "));
        assert_eq!(inject_dependency_outputs("task", &outputs), "task");
    }

    #[test]
    fn outputs_are_sorted_and_wrapped() {
        let mut outputs = HashMap::new();
        outputs.insert("b".to_string(), TaskOutput::text("second"));
        outputs.insert("a".to_string(), TaskOutput::text("first\n").with_exit_code(0));

        let enhanced = inject_dependency_outputs("Do the thing", &outputs);
        assert!(enhanced.starts_with("=== Dependency Outputs ==="));
        assert!(enhanced.ends_with("\n\nDo the thing"));
        let a = enhanced.find("# Task: a").unwrap();
        let b = enhanced.find("# Task: b").unwrap();
        assert!(a < b);
        assert!(enhanced.contains("Exit Code: 0\nOutput:\nfirst\n"));
    }
}

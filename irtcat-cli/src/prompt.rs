/// Terminal rendering of a single item.
use irtcat_core::{NextItem, SessionPhase};

/// Labels used when a five-point study declares none.
pub const DEFAULT_LABELS: [&str; 5] = [
    "Strongly disagree",
    "Disagree",
    "Neither agree nor disagree",
    "Agree",
    "Strongly agree",
];

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::FixedPre | SessionPhase::FixedPost => "fixed",
        SessionPhase::Adaptive => "adaptive",
    }
}

/// Build the prompt for one item: header, item text, then the numbered scale.
pub fn build_prompt(next: &NextItem, total: usize, text: &str, labels: &[String], max_category: u8) -> String {
    let mut prompt = format!(
        "[{}/{}] ({})\n{text}\n\n",
        next.position,
        total,
        phase_label(next.phase),
    );

    for category in 1..=max_category {
        let idx = usize::from(category - 1);
        let label = match labels.get(idx) {
            Some(l) => l.as_str(),
            None if max_category == 5 => DEFAULT_LABELS[idx],
            None => "",
        };
        if label.is_empty() {
            prompt.push_str(&format!("  {category}\n"));
        } else {
            prompt.push_str(&format!("  {category}: {label}\n"));
        }
    }

    prompt.push_str(&format!("Answer (1-{max_category}, q to quit): "));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(phase: SessionPhase) -> NextItem {
        NextItem { item: 7, position: 6, phase }
    }

    #[test]
    fn test_build_prompt_default_labels() {
        let prompt = build_prompt(&next(SessionPhase::Adaptive), 15, "I enjoy puzzles.", &[], 5);
        assert!(prompt.starts_with("[6/15] (adaptive)\nI enjoy puzzles."));
        assert!(prompt.contains("  1: Strongly disagree\n"));
        assert!(prompt.contains("  5: Strongly agree\n"));
        assert!(prompt.ends_with("Answer (1-5, q to quit): "));
    }

    #[test]
    fn test_build_prompt_custom_labels() {
        let labels = vec!["No".to_string(), "Somewhat".to_string(), "Yes".to_string()];
        let prompt = build_prompt(&next(SessionPhase::FixedPre), 3, "Ready?", &labels, 3);
        assert!(prompt.contains("(fixed)"));
        assert!(prompt.contains("  2: Somewhat\n"));
        assert!(!prompt.contains("Strongly"));
    }

    #[test]
    fn test_build_prompt_numbers_only() {
        let prompt = build_prompt(&next(SessionPhase::FixedPost), 10, "Rate it.", &[], 7);
        assert!(prompt.contains("  7\n"));
        assert!(prompt.contains("Answer (1-7"));
    }
}

/// Decides whether an utterance should be routed to tool calling.
///
/// False positives fall back to conversation once extraction finds no calls;
/// false negatives just degrade to plain chat.
pub trait IntentClassifier: Send + Sync {
    fn should_attempt_tool(&self, utterance: &str, available_tools: &[String]) -> bool;
}

const ACTION_WORDS: &[&str] = &[
    "add", "create", "list", "show", "delete", "remove", "mark", "complete", "get",
];
const DOMAIN_WORDS: &[&str] = &["todo", "task", "item", "entry"];

/// Deterministic keyword heuristic: an action word plus a domain word, or a
/// tool name mentioned with underscores read as spaces.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    action_words: Vec<String>,
    domain_words: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            action_words: ACTION_WORDS.iter().map(|w| w.to_string()).collect(),
            domain_words: DOMAIN_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl KeywordClassifier {
    pub fn with_words(action_words: Vec<String>, domain_words: Vec<String>) -> Self {
        let lower = |v: Vec<String>| -> Vec<String> { v.into_iter().map(|w| w.to_lowercase()).collect() };
        Self { action_words: lower(action_words), domain_words: lower(domain_words) }
    }
}

impl IntentClassifier for KeywordClassifier {
    fn should_attempt_tool(&self, utterance: &str, available_tools: &[String]) -> bool {
        if available_tools.is_empty() {
            return false;
        }
        let text = utterance.to_lowercase();

        let has_action = self.action_words.iter().any(|w| text.contains(w.as_str()));
        let has_domain = self.domain_words.iter().any(|w| text.contains(w.as_str()));
        if has_action && has_domain {
            tracing::debug!("tool intent: action + domain word");
            return true;
        }

        let mentions_tool = available_tools
            .iter()
            .any(|name| text.contains(&name.to_lowercase().replace('_', " ")));
        if mentions_tool {
            tracing::debug!("tool intent: tool name mentioned");
        }
        mentions_tool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<String> {
        vec!["list_todos".into(), "add_todo".into()]
    }

    #[test]
    fn list_my_todos_is_a_tool_request() {
        assert!(KeywordClassifier::default().should_attempt_tool("list my todos", &tools()));
    }

    #[test]
    fn greeting_is_conversation() {
        assert!(!KeywordClassifier::default().should_attempt_tool("hello", &tools()));
    }

    #[test]
    fn no_tools_means_never() {
        assert!(!KeywordClassifier::default().should_attempt_tool("add a todo", &[]));
    }

    #[test]
    fn tool_name_with_spaces_matches() {
        let c = KeywordClassifier::with_words(vec![], vec![]);
        assert!(c.should_attempt_tool("please run ADD TODO now", &tools()));
        assert!(!c.should_attempt_tool("please run add_todo now", &tools()));
    }

    #[test]
    fn action_word_alone_is_not_enough() {
        assert!(!KeywordClassifier::default().should_attempt_tool("show me the weather", &tools()));
    }
}

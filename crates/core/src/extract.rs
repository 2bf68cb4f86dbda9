//! Fenced-block extraction from language-model responses.
//!
//! Both models set structured content apart from prose with a
//! triple-backtick fence. Only the first fenced block is ever used; any
//! later blocks are ignored.

use std::sync::LazyLock;

use regex::Regex;

/// First fenced block, untagged. The interior is returned verbatim (trimmed),
/// so a language tag on the opening fence stays part of the plan text.
static BREAKDOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

/// First fenced block. A language tag is a single token alone on the opening
/// fence line; text on the fence line that is followed by anything else
/// belongs to the code.
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:[a-z0-9_+-]*[ \t]*\r?\n)?\s*(.*?)```").expect("valid regex")
});

/// Extract the animation breakdown from the planning model's response.
///
/// Returns `None` when the response has no fenced block, in which case no
/// job should be created.
pub fn extract_breakdown(response: &str) -> Option<String> {
    first_capture(&BREAKDOWN_RE, response)
}

/// Extract generated source code from the coding model's response,
/// stripping a language tag from the opening fence if present.
pub fn extract_code(response: &str) -> Option<String> {
    first_capture(&CODE_RE, response)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

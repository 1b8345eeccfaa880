use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Capitalize the first character. Empty input stays empty.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Slack mrkdwn link: `<url|label>`.
pub fn slack_link(url: &str, label: &str) -> String {
    format!("<{url}|{label}>")
}

// The characters JavaScript's encodeURI leaves verbatim, beyond alphanumerics.
// Search deep-links rely on `:`, `+` and `/` passing through while quotes and
// spaces get escaped.
const URI_KEEP: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-escape a search query for embedding in a link.
pub fn encode_uri(s: &str) -> String {
    utf8_percent_encode(s, URI_KEEP).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("string"), "String");
        assert_eq!(capitalize("already Capitalized"), "Already Capitalized");
        assert_eq!(capitalize("x"), "X");
    }

    #[test]
    fn test_capitalize_empty_is_noop() {
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_slack_link() {
        assert_eq!(slack_link("https://example.com", "label"), "<https://example.com|label>");
    }

    #[test]
    fn test_encode_uri_keeps_search_qualifier_characters() {
        assert_eq!(
            encode_uri("is:open+author:\"app/renovate\"+base:main"),
            "is:open+author:%22app/renovate%22+base:main"
        );
    }

    #[test]
    fn test_encode_uri_escapes_quotes_spaces_and_brackets() {
        assert_eq!(encode_uri("a b"), "a%20b");
        assert_eq!(encode_uri("\"q\""), "%22q%22");
        assert_eq!(encode_uri("[x]"), "%5Bx%5D");
    }
}

use anyhow::Result;
use futures::future::try_join_all;

use crate::services::Service;
use crate::types::SectionResult;

/// Obtain every service's section concurrently. Output order matches input
/// order, not completion order; a single failure fails the whole collection.
pub async fn collect_results(services: &[Box<dyn Service>]) -> Result<Vec<SectionResult>> {
    try_join_all(services.iter().map(|service| service.get_result())).await
}

/// Join the non-empty sections into the final report text: title line, then
/// the section's messages, newline-joined throughout. Sections without
/// messages contribute nothing, not even their title.
pub fn parse_report(results: &[SectionResult]) -> String {
    results
        .iter()
        .fold(Vec::new(), |mut lines, SectionResult { title, messages }| {
            if messages.is_empty() || title.is_empty() {
                return lines;
            }
            lines.push(title.clone());
            lines.push(messages.join("\n"));
            lines
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str, messages: &[&str]) -> SectionResult {
        SectionResult {
            title: title.to_string(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_report_joins_sections_in_order() {
        let results = vec![
            section("title1", &["message1"]),
            section("title2", &["message1", "message2"]),
            section("title3", &[]),
        ];
        assert_eq!(
            parse_report(&results),
            "title1\nmessage1\ntitle2\nmessage1\nmessage2"
        );
    }

    #[test]
    fn test_parse_report_skips_untitled_sections() {
        let results = vec![section("", &["message"]), section("title", &["message"])];
        assert_eq!(parse_report(&results), "title\nmessage");
    }

    #[test]
    fn test_parse_report_all_empty() {
        let results = vec![section("title1", &[]), section("title2", &[])];
        assert_eq!(parse_report(&results), "");
    }

    #[test]
    fn test_parse_report_no_results() {
        assert_eq!(parse_report(&[]), "");
    }
}

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Input};
use acc_scrapers::dedup::DEFAULT_MAX_PER_DOMAIN;

pub fn prompt_query() -> Result<String> {
    let query: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("What content would you like to scrape? (e.g. 'latest AI developments')")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("Please enter a topic")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read the query, pass it with --query")?;
    Ok(query.trim().to_string())
}

pub fn prompt_max_per_domain() -> Result<usize> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Maximum items per domain")
        .default(DEFAULT_MAX_PER_DOMAIN.to_string())
        .interact_text()
        .context("Failed to read the per-domain limit, pass it with --max-per-domain")?;
    Ok(parse_max_per_domain(&raw))
}

/// Invalid or zero input falls back to the default.
pub fn parse_max_per_domain(raw: &str) -> usize {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_PER_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_per_domain() {
        assert_eq!(parse_max_per_domain("3"), 3);
        assert_eq!(parse_max_per_domain(" 12 "), 12);
        assert_eq!(parse_max_per_domain(""), 5);
        assert_eq!(parse_max_per_domain("lots"), 5);
        assert_eq!(parse_max_per_domain("0"), 5);
        assert_eq!(parse_max_per_domain("-2"), 5);
    }
}

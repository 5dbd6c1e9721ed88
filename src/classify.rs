// src/classify.rs
//! Bulletin classification heuristics: disease, country, and severity are all
//! derived from free text with ordered first-match-wins rules. Pure text-in,
//! label-out; total (every input yields a label) and deterministic.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::Severity;

/// Sentinel returned when no disease rule matches.
pub const UNKNOWN_DISEASE: &str = "Unknown Disease";
/// Sentinel returned when a title carries no dash-separated country.
pub const UNKNOWN_COUNTRY: &str = "Unknown";
/// Country label for bulletins that cover no specific country.
pub const GLOBAL_COUNTRY: &str = "Global";

/// Ordered (pattern, canonical name) rules; the first match wins.
/// Order is a contract: the catch-all "respiratory syndrome" must stay after
/// the specific MERS pattern so overlapping titles resolve the same way.
static DISEASE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    const RULES: &[(&str, &str)] = &[
        (r"(?i)cholera", "Cholera"),
        (r"(?i)ebola", "Ebola"),
        (r"(?i)marburg", "Marburg Virus"),
        (r"(?i)mpox|monkeypox", "Mpox"),
        (r"(?i)measles", "Measles"),
        (r"(?i)dengue", "Dengue"),
        (r"(?i)yellow fever", "Yellow Fever"),
        (r"(?i)plague", "Plague"),
        (r"(?i)avian influenza|h5n1|bird flu", "H5N1 Avian Influenza"),
        (r"(?i)influenza a\(h1n1\)|h1n1", "Influenza A (H1N1)"),
        (r"(?i)polio", "Polio"),
        (r"(?i)meningitis|meningococcal", "Meningitis"),
        (r"(?i)lassa fever", "Lassa Fever"),
        (r"(?i)rift valley fever", "Rift Valley Fever"),
        (r"(?i)diphtheria", "Diphtheria"),
        (r"(?i)malaria", "Malaria"),
        (r"(?i)zika", "Zika"),
        (r"(?i)chikungunya", "Chikungunya"),
        (r"(?i)covid|sars-cov", "COVID-19"),
        (r"(?i)hepatitis", "Hepatitis"),
        (r"(?i)nipah", "Nipah Virus"),
        (r"(?i)mers", "MERS-CoV"),
        (r"(?i)oropouche", "Oropouche"),
        (r"(?i)respiratory syndrome", "MERS-CoV"),
    ];
    RULES
        .iter()
        .map(|(pat, name)| (Regex::new(pat).expect("disease rule regex"), *name))
        .collect()
});

/// Map a bulletin title to a canonical disease name, or [`UNKNOWN_DISEASE`].
pub fn extract_disease(title: &str) -> &'static str {
    for (pattern, name) in DISEASE_RULES.iter() {
        if pattern.is_match(title) {
            return name;
        }
    }
    UNKNOWN_DISEASE
}

static RE_PAREN_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(update\)").expect("update qualifier regex"));
static RE_PAREN_SITUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(situation update\)").expect("situation qualifier regex"));
static RE_TRAILING_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*update$").expect("trailing update regex"));

/// WHO DON titles follow `"<Disease> - <Country>"`. Take the text after the
/// LAST dash-like separator (hyphen, en-dash, em-dash) so hyphenated disease
/// names ("MERS-CoV - Saudi Arabia") still resolve to the country, then strip
/// trailing "(update)" qualifiers. No separator at all yields
/// [`UNKNOWN_COUNTRY`]; a result of "Global" marks a non-country bulletin.
pub fn extract_country(title: &str) -> String {
    let mut tail: Option<&str> = None;
    for (idx, ch) in title.char_indices() {
        if matches!(ch, '-' | '\u{2013}' | '\u{2014}') {
            tail = Some(&title[idx + ch.len_utf8()..]);
        }
    }
    let Some(tail) = tail else {
        return UNKNOWN_COUNTRY.to_string();
    };

    let country = tail.trim();
    let country = RE_PAREN_UPDATE.replace(country, "");
    let country = RE_PAREN_SITUATION.replace(&country, "");
    let country = RE_TRAILING_UPDATE.replace(&country, "");
    country.trim().to_string()
}

/// Estimate severity from title + summary. Explicit WHO risk-assessment
/// phrases take priority over generic keywords; checks run in fixed order and
/// the first match wins.
pub fn estimate_severity(title: &str, summary: &str) -> Severity {
    let text = format!("{} {}", title, summary).to_lowercase();

    if text.contains("risk is high") || text.contains("public health emergency") {
        return Severity::Critical;
    }
    if text.contains("risk is moderate") {
        return Severity::Severe;
    }
    if text.contains("risk is low") {
        return Severity::Moderate;
    }

    // Keyword fallback
    if text.contains("death") || text.contains("fatal") || text.contains("emergency") {
        return Severity::Critical;
    }
    if text.contains("outbreak") || text.contains("surge") || text.contains("spreading") {
        return Severity::Severe;
    }
    if text.contains("cases") || text.contains("detected") {
        return Severity::Moderate;
    }
    Severity::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disease_first_match_wins() {
        assert_eq!(extract_disease("Cholera - Sudan"), "Cholera");
        assert_eq!(extract_disease("Monkeypox cluster - Spain"), "Mpox");
        assert_eq!(extract_disease("Avian Influenza A(H5N1) - Cambodia"), "H5N1 Avian Influenza");
        assert_eq!(extract_disease("Something entirely novel"), UNKNOWN_DISEASE);
    }

    #[test]
    fn respiratory_syndrome_defers_to_specific_rules() {
        // Both the MERS rule and the catch-all match; the MERS rule is earlier.
        assert_eq!(
            extract_disease("Middle East respiratory syndrome coronavirus (MERS-CoV) - Oman"),
            "MERS-CoV"
        );
        // The catch-all still fires on its own.
        assert_eq!(extract_disease("Severe acute respiratory syndrome"), "MERS-CoV");
    }

    #[test]
    fn country_is_text_after_last_dash() {
        assert_eq!(extract_country("Cholera - Sudan"), "Sudan");
        assert_eq!(extract_country("Cholera- Sudan"), "Sudan");
        assert_eq!(
            extract_country("Middle East respiratory syndrome coronavirus (MERS-CoV) - Saudi Arabia"),
            "Saudi Arabia"
        );
        assert_eq!(extract_country("Mpox \u{2013} Democratic Republic of the Congo"),
            "Democratic Republic of the Congo");
    }

    #[test]
    fn country_qualifiers_are_stripped() {
        assert_eq!(extract_country("Measles - Yemen (update)"), "Yemen");
        assert_eq!(extract_country("Measles - Yemen (Situation Update)"), "Yemen");
        assert_eq!(extract_country("Mpox - Global update"), "Global");
    }

    #[test]
    fn country_without_separator_is_unknown() {
        assert_eq!(extract_country("Weekly epidemiological digest"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn severity_risk_phrases_outrank_keywords() {
        // "outbreak" alone would be Severe, but the explicit phrase wins.
        assert_eq!(
            estimate_severity("Cholera - Sudan", "Risk is high, outbreak declared"),
            Severity::Critical
        );
        assert_eq!(
            estimate_severity("Dengue - Peru", "The regional risk is moderate."),
            Severity::Severe
        );
        assert_eq!(
            estimate_severity("Dengue - Peru", "WHO assesses the risk is low; cases rising"),
            Severity::Moderate
        );
    }

    #[test]
    fn severity_keyword_fallback_order() {
        assert_eq!(estimate_severity("Ebola - Uganda", "Two deaths confirmed"), Severity::Critical);
        assert_eq!(estimate_severity("Cholera - Haiti", "Outbreak spreading fast"), Severity::Severe);
        assert_eq!(estimate_severity("Zika - Brazil", "Twelve cases detected"), Severity::Moderate);
        assert_eq!(estimate_severity("Routine bulletin", "Nothing notable"), Severity::Low);
    }
}

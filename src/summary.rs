//! Summary Builder
//!
//! Renders the collected slots as a read-back utterance the user can
//! confirm before the document is filled.

use crate::schema::SlotStore;

const SUMMARY_HEADING: &str = "Here is a summary of the information collected:";
const SUMMARY_CLOSING: &str =
    "Please confirm if all the details are correct. Once confirmed, it may take a few seconds to process.";

/// Business-facing names for slots whose internal names read poorly
const SLOT_LABELS: &[(&str, &str)] = &[
    ("SiteCompanyName1", "DBA Name"),
    ("CorporateCompanyName1", "Legal Corporate Name"),
    ("SiteAddress", "Business Address"),
    ("CorporateAddress", "Billing Address"),
    ("SiteVoice", "Phone"),
    ("SiteFax", "Fax"),
    ("SiteEmail", "Business Email"),
    ("CustomerSvcEmail", "Customer Service Email"),
    ("MCC-Desc", "MCC SIC Description"),
];

/// Human label for a slot
pub fn slot_label(slot: &str) -> String {
    SLOT_LABELS
        .iter()
        .find(|(name, _)| *name == slot)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| humanize(slot))
}

/// Multi-line summary of every non-empty slot, in schema order
pub fn build_summary(store: &SlotStore) -> String {
    let lines: Vec<String> = store
        .iter()
        .filter_map(|(slot, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| format!("{}: {}", slot_label(slot), value))
        })
        .collect();

    format!(
        "{}\n\n{}\n\n{}",
        SUMMARY_HEADING,
        lines.join("\n"),
        SUMMARY_CLOSING
    )
}

/// "CorporateVoice" → "Corporate Voice", "AppRetrievalFaxNumber" →
/// "App Retrieval Fax Number". Capital runs stay together ("MCC").
fn humanize(slot: &str) -> String {
    let chars: Vec<char> = slot.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = c.is_uppercase()
                && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    // Acronyms ("MCC", "DBA") keep their casing
    if word.len() > 1 && word.chars().all(|c| c.is_uppercase() || c.is_ascii_digit()) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

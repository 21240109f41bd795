use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::canonical::read_contact;
use super::{strings, text, timestamp};
use crate::models::resume::{
    Resume, SectionItem, SectionKey, VerificationStatus, UNTITLED_RESUME,
};

#[derive(Debug, Clone, Copy)]
enum Fallback {
    Text,
    Flag,
    List,
}

/// Copies the credential value at JSON pointer `source` into canonical `target`.
#[derive(Debug)]
struct FieldRule {
    target: &'static str,
    source: &'static str,
    fallback: Fallback,
}

const fn text_rule(target: &'static str, source: &'static str) -> FieldRule {
    FieldRule {
        target,
        source,
        fallback: Fallback::Text,
    }
}

const fn flag_rule(target: &'static str, source: &'static str) -> FieldRule {
    FieldRule {
        target,
        source,
        fallback: Fallback::Flag,
    }
}

const fn list_rule(target: &'static str, source: &'static str) -> FieldRule {
    FieldRule {
        target,
        source,
        fallback: Fallback::List,
    }
}

struct SectionMapping {
    section: SectionKey,
    /// Credential lists feeding the section, concatenated in this order.
    sources: &'static [&'static str],
    rules: &'static [FieldRule],
    carries_id: bool,
}

const EXPERIENCE_RULES: &[FieldRule] = &[
    text_rule("title", "/title"),
    text_rule("company", "/organization/tradeName"),
    text_rule("description", "/description"),
    text_rule("startDate", "/startDate"),
    text_rule("endDate", "/endDate"),
    flag_rule("currentlyEmployed", "/stillEmployed"),
    text_rule("duration", "/duration"),
];

const EDUCATION_RULES: &[FieldRule] = &[
    text_rule("type", "/degree"),
    text_rule("degree", "/degree"),
    text_rule("programName", "/fieldOfStudy"),
    text_rule("institution", "/institution"),
    text_rule("startDate", "/startDate"),
    text_rule("endDate", "/endDate"),
];

const SECTION_MAPPINGS: &[SectionMapping] = &[
    SectionMapping {
        section: SectionKey::Experience,
        sources: &["employmentHistory", "experience"],
        rules: EXPERIENCE_RULES,
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Education,
        sources: &["educationAndLearning"],
        rules: EDUCATION_RULES,
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Skills,
        sources: &["skills"],
        rules: &[text_rule("skills", "/name")],
        carries_id: false,
    },
    SectionMapping {
        section: SectionKey::Awards,
        sources: &["awards"],
        rules: &[
            text_rule("title", "/title"),
            text_rule("issuer", "/issuer"),
            text_rule("date", "/date"),
            text_rule("description", "/description"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Publications,
        sources: &["publications"],
        rules: &[
            text_rule("title", "/title"),
            text_rule("publisher", "/publisher"),
            text_rule("publishedDate", "/publishedDate"),
            text_rule("url", "/url"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Certifications,
        sources: &["certifications"],
        rules: &[
            text_rule("name", "/name"),
            text_rule("issuer", "/issuer"),
            text_rule("issueDate", "/issueDate"),
            text_rule("expiryDate", "/expiryDate"),
            text_rule("credentialId", "/credentialId"),
            text_rule("url", "/url"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::ProfessionalAffiliations,
        sources: &["professionalAffiliations"],
        rules: &[
            text_rule("name", "/role"),
            text_rule("organization", "/organization"),
            text_rule("startDate", "/startDate"),
            text_rule("endDate", "/endDate"),
            flag_rule("activeAffiliation", "/activeAffiliation"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::VolunteerWork,
        sources: &["volunteerWork"],
        rules: &[
            text_rule("role", "/role"),
            text_rule("organization", "/organization"),
            text_rule("location", "/location"),
            text_rule("startDate", "/startDate"),
            text_rule("endDate", "/endDate"),
            text_rule("description", "/description"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Languages,
        sources: &["languages"],
        rules: &[
            text_rule("language", "/name"),
            text_rule("proficiency", "/proficiency"),
        ],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Testimonials,
        sources: &["testimonials"],
        rules: &[text_rule("author", "/author"), text_rule("text", "/text")],
        carries_id: true,
    },
    SectionMapping {
        section: SectionKey::Projects,
        sources: &["projects"],
        rules: &[
            text_rule("name", "/name"),
            text_rule("description", "/description"),
            text_rule("url", "/url"),
            list_rule("technologies", "/technologies"),
        ],
        carries_id: true,
    },
];

/// Credential branch: unwraps `credentialSubject` and renames every section
/// through `SECTION_MAPPINGS`.
pub(super) fn from_credential(
    envelope: &Map<String, Value>,
    subject: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Resume {
    let mut resume = Resume::blank(timestamp(envelope.get("issuanceDate"), now));
    let person = subject.get("person");

    resume.id = text(envelope.get("id"));
    resume.name = person
        .and_then(|p| p.pointer("/name/formattedName"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| UNTITLED_RESUME.to_string());
    // KNOWN QUIRK: the credential's `twitter` handle lands in canonical
    // `instagram`. Downstream consumers depend on it; needs product sign-off
    // before changing.
    resume.contact = read_contact(person.and_then(|p| p.get("contact")), "twitter");
    resume.summary = text(subject.get("narrative").and_then(|n| n.get("text")));
    resume.hobbies_and_interests = strings(subject.get("hobbiesAndInterests"));

    for mapping in SECTION_MAPPINGS {
        let items: Vec<SectionItem> = mapping
            .sources
            .iter()
            .filter_map(|source| subject.get(*source).and_then(Value::as_array))
            .flatten()
            .map(|item| map_item(item, mapping))
            .collect();
        if let Some(section) = resume.items_mut(mapping.section) {
            section.items = items;
        }
    }

    resume
}

/// Proof and signature state is never interpreted here: every mapped item
/// starts out unverified with no credential link.
fn map_item(item: &Value, mapping: &SectionMapping) -> SectionItem {
    let fields: Map<String, Value> = mapping
        .rules
        .iter()
        .map(|rule| (rule.target.to_string(), read_field(item, rule)))
        .collect();

    SectionItem {
        fields,
        id: mapping.carries_id.then(|| text(item.get("id"))),
        verification_status: Some(VerificationStatus::Unverified),
        credential_link: Some(String::new()),
    }
}

fn read_field(item: &Value, rule: &FieldRule) -> Value {
    let found = item.pointer(rule.source);
    match rule.fallback {
        Fallback::Text => Value::String(text(found)),
        Fallback::Flag => Value::Bool(found.and_then(Value::as_bool).unwrap_or(false)),
        Fallback::List => found
            .filter(|v| v.is_array())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    }
}

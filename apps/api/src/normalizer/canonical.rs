use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use super::{strings, text, timestamp};
use crate::models::resume::{
    Contact, Location, Resume, Section, SectionItem, SectionKey, SocialLinks, UNTITLED_RESUME,
};

/// Canonical branch: defaulting only, no renaming. Section items pass
/// through as they are; only the container falls back to empty.
pub(super) fn from_canonical(doc: &Map<String, Value>, now: DateTime<Utc>) -> Resume {
    let mut resume = Resume::blank(timestamp(doc.get("lastUpdated"), now));

    resume.id = text(doc.get("id"));
    resume.name = doc
        .get("name")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| UNTITLED_RESUME.to_string());
    resume.version = doc
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v >= 1)
        .unwrap_or(1);
    resume.contact = read_contact(doc.get("contact"), "instagram");
    resume.summary = text(doc.get("summary"));
    resume.hobbies_and_interests = strings(doc.get("hobbiesAndInterests"));

    for key in SectionKey::REPEATABLE {
        let items = read_items(key, doc.get(key.as_str()));
        if let Some(section) = resume.items_mut(key) {
            *section = Section { items };
        }
    }

    resume
}

fn read_items(key: SectionKey, section: Option<&Value>) -> Vec<SectionItem> {
    let Some(items) = section
        .and_then(|s| s.get("items"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(SectionItem::from(fields.clone())),
            other => {
                warn!("Dropping non-object item in section '{key}': {other}");
                None
            }
        })
        .collect()
}

/// Reads a contact block. `instagram_source` names the social-link field
/// that feeds canonical `instagram`.
pub(super) fn read_contact(contact: Option<&Value>, instagram_source: &str) -> Contact {
    let Some(contact) = contact else {
        return Contact::default();
    };
    let location = contact.get("location");
    let social = contact.get("socialLinks");

    Contact {
        full_name: text(contact.get("fullName")),
        email: text(contact.get("email")),
        phone: text(contact.get("phone")),
        location: Location {
            street: text(location.and_then(|l| l.get("street"))),
            city: text(location.and_then(|l| l.get("city"))),
            state: text(location.and_then(|l| l.get("state"))),
            country: text(location.and_then(|l| l.get("country"))),
            postal_code: text(location.and_then(|l| l.get("postalCode"))),
        },
        social_links: SocialLinks {
            linkedin: text(social.and_then(|s| s.get("linkedin"))),
            github: text(social.and_then(|s| s.get("github"))),
            portfolio: text(social.and_then(|s| s.get("portfolio"))),
            instagram: text(social.and_then(|s| s.get(instagram_source))),
        },
    }
}

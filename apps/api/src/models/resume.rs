use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const UNTITLED_RESUME: &str = "Untitled Resume";

/// Every top-level key of a serialized `Resume`, in declaration order.
pub const RESUME_KEYS: &[&str] = &[
    "id",
    "lastUpdated",
    "name",
    "version",
    "contact",
    "summary",
    "experience",
    "education",
    "skills",
    "awards",
    "publications",
    "certifications",
    "professionalAffiliations",
    "volunteerWork",
    "languages",
    "testimonials",
    "projects",
    "hobbiesAndInterests",
];

/// The canonical resume. All editor components read and write this shape;
/// it is also the JSON interchange format other components must honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    pub last_updated: DateTime<Utc>,
    pub name: String,
    pub version: u32,
    pub contact: Contact,
    pub summary: String,
    pub experience: Section,
    pub education: Section,
    pub skills: Section,
    pub awards: Section,
    pub publications: Section,
    pub certifications: Section,
    pub professional_affiliations: Section,
    pub volunteer_work: Section,
    pub languages: Section,
    pub testimonials: Section,
    pub projects: Section,
    pub hobbies_and_interests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: Location,
    pub social_links: SocialLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub linkedin: String,
    pub github: String,
    pub portfolio: String,
    pub instagram: String,
}

/// A repeatable block of resume content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub items: Vec<SectionItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Pending,
}

impl VerificationStatus {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "unverified" => Some(Self::Unverified),
            "verified" => Some(Self::Verified),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// One entry of a repeatable section: free-form domain fields plus the
/// common trailer. Trailer values of an unexpected JSON type stay in
/// `fields` untouched, so an item read from a document serializes back
/// exactly as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SectionItem {
    pub fields: Map<String, Value>,
    /// May be empty; not guaranteed unique.
    pub id: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    pub credential_link: Option<String>,
}

impl From<Map<String, Value>> for SectionItem {
    fn from(mut fields: Map<String, Value>) -> Self {
        let id = take_if(&mut fields, "id", |v| v.as_str().map(String::from));
        let verification_status = take_if(&mut fields, "verificationStatus", |v| {
            v.as_str().and_then(VerificationStatus::parse)
        });
        let credential_link = take_if(&mut fields, "credentialLink", |v| {
            v.as_str().map(String::from)
        });
        SectionItem {
            fields,
            id,
            verification_status,
            credential_link,
        }
    }
}

impl From<SectionItem> for Map<String, Value> {
    fn from(item: SectionItem) -> Self {
        let mut map = item.fields;
        if let Some(id) = item.id {
            map.insert("id".into(), Value::String(id));
        }
        if let Some(status) = item.verification_status {
            map.insert(
                "verificationStatus".into(),
                serde_json::to_value(status).unwrap_or(Value::Null),
            );
        }
        if let Some(link) = item.credential_link {
            map.insert("credentialLink".into(), Value::String(link));
        }
        map
    }
}

fn take_if<T>(
    fields: &mut Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let converted = fields.get(key).and_then(&convert)?;
    fields.remove(key);
    Some(converted)
}

/// Addressable content sections of a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    Summary,
    Experience,
    Education,
    Skills,
    Awards,
    Publications,
    Certifications,
    ProfessionalAffiliations,
    VolunteerWork,
    Languages,
    Testimonials,
    Projects,
    HobbiesAndInterests,
}

impl SectionKey {
    /// Sections shaped as `{ items: [...] }`, in canonical order.
    pub const REPEATABLE: [SectionKey; 11] = [
        SectionKey::Experience,
        SectionKey::Education,
        SectionKey::Skills,
        SectionKey::Awards,
        SectionKey::Publications,
        SectionKey::Certifications,
        SectionKey::ProfessionalAffiliations,
        SectionKey::VolunteerWork,
        SectionKey::Languages,
        SectionKey::Testimonials,
        SectionKey::Projects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Summary => "summary",
            SectionKey::Experience => "experience",
            SectionKey::Education => "education",
            SectionKey::Skills => "skills",
            SectionKey::Awards => "awards",
            SectionKey::Publications => "publications",
            SectionKey::Certifications => "certifications",
            SectionKey::ProfessionalAffiliations => "professionalAffiliations",
            SectionKey::VolunteerWork => "volunteerWork",
            SectionKey::Languages => "languages",
            SectionKey::Testimonials => "testimonials",
            SectionKey::Projects => "projects",
            SectionKey::HobbiesAndInterests => "hobbiesAndInterests",
        }
    }

    pub fn is_repeatable(&self) -> bool {
        Self::REPEATABLE.contains(self)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown section key: {0}")]
pub struct UnknownSectionKey(pub String);

impl FromStr for SectionKey {
    type Err = UnknownSectionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(SectionKey::Summary)
            .chain(SectionKey::REPEATABLE)
            .chain(std::iter::once(SectionKey::HobbiesAndInterests))
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownSectionKey(s.to_string()))
    }
}

/// The content of one section, as held in drafts and committed into a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Text(String),
    Entries(Vec<String>),
    Items(Vec<SectionItem>),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Content shape does not fit section '{0}'")]
pub struct ShapeMismatch(pub SectionKey);

impl Resume {
    /// A resume with every field at its default.
    pub fn blank(last_updated: DateTime<Utc>) -> Self {
        Resume {
            id: String::new(),
            last_updated,
            name: UNTITLED_RESUME.to_string(),
            version: 1,
            contact: Contact::default(),
            summary: String::new(),
            experience: Section::default(),
            education: Section::default(),
            skills: Section::default(),
            awards: Section::default(),
            publications: Section::default(),
            certifications: Section::default(),
            professional_affiliations: Section::default(),
            volunteer_work: Section::default(),
            languages: Section::default(),
            testimonials: Section::default(),
            projects: Section::default(),
            hobbies_and_interests: Vec::new(),
        }
    }

    /// Top-level keys of the serialized resume. A normalized resume always
    /// carries all of them.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        RESUME_KEYS.iter().copied()
    }

    pub fn items(&self, key: SectionKey) -> Option<&Section> {
        match key {
            SectionKey::Experience => Some(&self.experience),
            SectionKey::Education => Some(&self.education),
            SectionKey::Skills => Some(&self.skills),
            SectionKey::Awards => Some(&self.awards),
            SectionKey::Publications => Some(&self.publications),
            SectionKey::Certifications => Some(&self.certifications),
            SectionKey::ProfessionalAffiliations => Some(&self.professional_affiliations),
            SectionKey::VolunteerWork => Some(&self.volunteer_work),
            SectionKey::Languages => Some(&self.languages),
            SectionKey::Testimonials => Some(&self.testimonials),
            SectionKey::Projects => Some(&self.projects),
            SectionKey::Summary | SectionKey::HobbiesAndInterests => None,
        }
    }

    pub fn items_mut(&mut self, key: SectionKey) -> Option<&mut Section> {
        match key {
            SectionKey::Experience => Some(&mut self.experience),
            SectionKey::Education => Some(&mut self.education),
            SectionKey::Skills => Some(&mut self.skills),
            SectionKey::Awards => Some(&mut self.awards),
            SectionKey::Publications => Some(&mut self.publications),
            SectionKey::Certifications => Some(&mut self.certifications),
            SectionKey::ProfessionalAffiliations => Some(&mut self.professional_affiliations),
            SectionKey::VolunteerWork => Some(&mut self.volunteer_work),
            SectionKey::Languages => Some(&mut self.languages),
            SectionKey::Testimonials => Some(&mut self.testimonials),
            SectionKey::Projects => Some(&mut self.projects),
            SectionKey::Summary | SectionKey::HobbiesAndInterests => None,
        }
    }

    /// Committed content of a section.
    pub fn section(&self, key: SectionKey) -> SectionContent {
        match key {
            SectionKey::Summary => SectionContent::Text(self.summary.clone()),
            SectionKey::HobbiesAndInterests => {
                SectionContent::Entries(self.hobbies_and_interests.clone())
            }
            _ => SectionContent::Items(
                self.items(key)
                    .map(|s| s.items.clone())
                    .unwrap_or_default(),
            ),
        }
    }

    /// Replaces a section's content wholesale. Item fields are not validated;
    /// only the container shape has to fit the section.
    pub fn replace_section(
        &mut self,
        key: SectionKey,
        content: SectionContent,
    ) -> Result<(), ShapeMismatch> {
        match (key, content) {
            (SectionKey::Summary, SectionContent::Text(text)) => self.summary = text,
            (SectionKey::HobbiesAndInterests, SectionContent::Entries(entries)) => {
                self.hobbies_and_interests = entries
            }
            // An empty JSON array deserializes as `Entries`.
            (SectionKey::HobbiesAndInterests, SectionContent::Items(items)) if items.is_empty() => {
                self.hobbies_and_interests = Vec::new()
            }
            (key, SectionContent::Items(items)) if key.is_repeatable() => {
                if let Some(section) = self.items_mut(key) {
                    section.items = items;
                }
            }
            (key, SectionContent::Entries(entries)) if key.is_repeatable() && entries.is_empty() => {
                if let Some(section) = self.items_mut(key) {
                    section.items.clear();
                }
            }
            (key, _) => return Err(ShapeMismatch(key)),
        }
        Ok(())
    }
}

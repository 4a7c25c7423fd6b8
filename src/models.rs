//! Stored domain types.
//!
//! Only the fields used for identifiers and listings are typed; everything else
//! the analysis pipeline produces is carried through untouched in `details`.

use crate::store::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Company placeholder the analysis pipeline emits when it finds none.
const UNSPECIFIED_COMPANY: &str = "not specified";

/// Serialized names of `JobPosting`'s typed fields.
const JOB_POSTING_FIELDS: &[&str] = &["title", "company", "url", "experience_level"];

/// Serialized names of `CurriculumVitae`'s typed fields.
const CV_FIELDS: &[&str] = &["name", "profession"];

fn insert_detail(details: &mut Map<String, Value>, typed: &[&str], key: String, value: Value) {
    if !typed.contains(&key.as_str()) {
        details.insert(key, value);
    }
}

/// An analyzed job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    /// Remaining structured fields (skills, responsibilities, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl JobPosting {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            url: None,
            experience_level: None,
            details: Map::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_experience_level(mut self, level: impl Into<String>) -> Self {
        self.experience_level = Some(level.into());
        self
    }

    /// Add an untyped field. Keys naming a typed field are ignored.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert_detail(&mut self.details, JOB_POSTING_FIELDS, key.into(), value.into());
        self
    }
}

impl Entity for JobPosting {
    const KIND: &'static str = "job-postings";

    fn seed_fields(&self) -> Vec<String> {
        let mut seeds = vec![self.title.clone()];
        if !self.company.trim().eq_ignore_ascii_case(UNSPECIFIED_COMPANY) {
            seeds.push(self.company.clone());
        }
        seeds
    }

    fn summary(&self) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("title".into(), Value::from(self.title.as_str()));
        summary.insert("company".into(), Value::from(self.company.as_str()));
        if let Some(ref url) = self.url {
            summary.insert("url".into(), Value::from(url.as_str()));
        }
        if let Some(ref level) = self.experience_level {
            summary.insert("experience_level".into(), Value::from(level.as_str()));
        }
        summary
    }
}

/// A parsed curriculum vitae.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumVitae {
    pub name: String,
    pub profession: String,
    /// Remaining structured fields (contact, experience, education, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CurriculumVitae {
    pub fn new(name: impl Into<String>, profession: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profession: profession.into(),
            details: Map::new(),
        }
    }

    /// Add an untyped field. Keys naming a typed field are ignored.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert_detail(&mut self.details, CV_FIELDS, key.into(), value.into());
        self
    }
}

impl Entity for CurriculumVitae {
    const KIND: &'static str = "cvs";

    fn seed_fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.profession.clone()]
    }

    fn summary(&self) -> Map<String, Value> {
        let mut summary = Map::new();
        summary.insert("name".into(), Value::from(self.name.as_str()));
        summary.insert("profession".into(), Value::from(self.profession.as_str()));
        summary
    }
}

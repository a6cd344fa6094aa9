// src/profile_import/json_import.rs
//! JSON profile uploads: our own layout, JSON Resume, and LinkedIn exports.

use serde_json::{Map, Value};

use crate::error::{CvResult, CvToolError};
use crate::types::profile::{Certification, Education, Experience, Profile, PROFILE_KEYS};

/// Top-level keys only found in JSON Resume or LinkedIn export files.
const EXPORT_KEYS: &[&str] = &[
    "basics",
    "work",
    "positions",
    "firstName",
    "lastName",
    "fullName",
    "name",
    "educations",
    "certificates",
    "licenses",
];

/// Entry keys that mark an export-style experience or education entry.
const EXPERIENCE_ALIASES: &[&str] = &["position", "positionTitle", "companyName", "organization"];
const EDUCATION_ALIASES: &[&str] = &["institution", "schoolName", "degreeName", "studyType"];

pub fn parse_profile_json(bytes: &[u8]) -> CvResult<Profile> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CvToolError::InvalidFormat(format!("File is not valid JSON: {}", e)))?;
    profile_from_value(value)
}

pub fn profile_from_value(value: Value) -> CvResult<Profile> {
    let Value::Object(obj) = value else {
        return Err(CvToolError::InvalidFormat(
            "Profile JSON must be an object".to_string(),
        ));
    };

    if EXPORT_KEYS.iter().any(|k| obj.contains_key(*k)) {
        return from_export(&obj);
    }

    if !PROFILE_KEYS.iter().any(|k| obj.contains_key(*k)) {
        return Err(CvToolError::InvalidFormat(
            "JSON does not look like a profile (no name, experience, education or skills)"
                .to_string(),
        ));
    }

    let mut direct: Profile = serde_json::from_value(Value::Object(obj.clone())).map_err(|e| {
        CvToolError::InvalidFormat(format!(
            "Profile JSON does not match the expected shape: {}",
            e
        ))
    })?;

    // Entries written with export field names (companyName, schoolName...)
    // deserialize to blanks; only those are remapped, the rest stay as sent.
    remap_export_entries(
        &obj,
        "experience",
        EXPERIENCE_ALIASES,
        &mut direct.experience,
        experience_entry,
    );
    remap_export_entries(
        &obj,
        "education",
        EDUCATION_ALIASES,
        &mut direct.education,
        education_entry,
    );

    Ok(direct)
}

fn remap_export_entries<T>(
    obj: &Map<String, Value>,
    key: &str,
    aliases: &[&str],
    entries: &mut [T],
    map: fn(&Value) -> Option<T>,
) {
    let Some(raw) = obj.get(key).and_then(Value::as_array) else {
        return;
    };
    for (entry, value) in entries.iter_mut().zip(raw) {
        let uses_alias = value
            .as_object()
            .is_some_and(|fields| aliases.iter().any(|a| fields.contains_key(*a)));
        if uses_alias {
            if let Some(mapped) = map(value) {
                *entry = mapped;
            }
        }
    }
}

/// Parse model output leniently: `null` fields are treated as absent.
pub fn profile_from_model_output(value: Value) -> CvResult<Profile> {
    let cleaned = drop_nulls(value);
    let Value::Object(obj) = cleaned else {
        return Err(CvToolError::InvalidFormat(
            "Expected a JSON object".to_string(),
        ));
    };
    serde_json::from_value(Value::Object(obj))
        .map_err(|e| CvToolError::InvalidFormat(format!("Unexpected profile shape: {}", e)))
}

fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().filter(|v| !v.is_null()).map(drop_nulls).collect())
        }
        other => other,
    }
}

// ===== Export mapping =====

fn from_export(obj: &Map<String, Value>) -> CvResult<Profile> {
    let basics = obj.get("basics").and_then(Value::as_object);
    let lookup = |keys: &[&str]| -> Option<String> {
        basics
            .and_then(|b| text_of(b, keys))
            .or_else(|| text_of(obj, keys))
    };

    let full_name = lookup(&["name", "full_name", "fullName"]).or_else(|| {
        let first = text_of(obj, &["firstName"]).unwrap_or_default();
        let last = text_of(obj, &["lastName"]).unwrap_or_default();
        let joined = format!("{} {}", first, last).trim().to_string();
        (!joined.is_empty()).then_some(joined)
    });

    let address = basics
        .and_then(|b| b.get("location"))
        .and_then(location_text)
        .or_else(|| obj.get("location").and_then(location_text))
        .or_else(|| text_of(obj, &["address", "geoLocation"]));

    let linkedin_url = basics
        .and_then(|b| b.get("profiles"))
        .and_then(Value::as_array)
        .and_then(|profiles| {
            profiles.iter().filter_map(Value::as_object).find_map(|p| {
                let network = text_of(p, &["network"]).unwrap_or_default().to_lowercase();
                let url = text_of(p, &["url"])?;
                (network == "linkedin" || url.contains("linkedin.com")).then_some(url)
            })
        })
        .or_else(|| lookup(&["linkedin_url", "linkedinUrl", "publicProfileUrl", "url"]))
        .filter(|url| url.contains("linkedin.com"));

    let profile = Profile {
        full_name: full_name.unwrap_or_default(),
        headline: lookup(&["label", "headline", "title"]),
        summary: lookup(&["summary", "about"]).unwrap_or_default(),
        email: lookup(&["email", "emailAddress"]),
        phone: lookup(&["phone", "phoneNumber"]),
        address,
        linkedin_url,
        photo_base64: lookup(&["photo_base64"]),
        experience: array_of(obj, &["work", "positions", "experience"])
            .filter_map(experience_entry)
            .collect(),
        education: array_of(obj, &["education", "educations"])
            .filter_map(education_entry)
            .collect(),
        skills: dedupe(array_of(obj, &["skills"]).filter_map(|v| named_text(v, &["name", "skill"]))),
        certifications: array_of(obj, &["certificates", "certifications", "licenses"])
            .filter_map(certification_entry)
            .collect(),
        languages: dedupe(
            array_of(obj, &["languages"]).filter_map(|v| named_text(v, &["language", "name"])),
        ),
    };

    if profile.is_empty() {
        return Err(CvToolError::InvalidFormat(
            "The export contains no name, experience, education or skills".to_string(),
        ));
    }
    Ok(profile)
}

fn experience_entry(value: &Value) -> Option<Experience> {
    let entry = value.as_object()?;
    let title = text_of(entry, &["title", "position", "positionTitle"]).unwrap_or_default();
    let company = text_of(entry, &["company", "companyName", "name", "organization"])
        .or_else(|| {
            entry
                .get("company")
                .and_then(Value::as_object)
                .and_then(|c| text_of(c, &["name"]))
        })
        .unwrap_or_default();
    if title.is_empty() && company.is_empty() {
        return None;
    }

    let current = entry.get("current").and_then(Value::as_bool).unwrap_or(false)
        || entry.get("isCurrent").and_then(Value::as_bool).unwrap_or(false);
    let end_date = if current {
        Some("Present".to_string())
    } else {
        date_of(entry, &["end_date", "endDate", "finishedOn", "timePeriod.endDate"])
    };

    let description = text_of(entry, &["description", "summary"]).or_else(|| {
        let highlights: Vec<String> = entry
            .get("highlights")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(|h| format!("• {}", h.trim()))
            .collect();
        (!highlights.is_empty()).then(|| highlights.join("\n"))
    });

    Some(Experience {
        title,
        company,
        start_date: date_of(entry, &["start_date", "startDate", "startedOn", "timePeriod.startDate"]),
        end_date,
        description,
        location: text_of(entry, &["location", "locationName"]),
    })
}

fn education_entry(value: &Value) -> Option<Education> {
    let entry = value.as_object()?;
    let school = text_of(entry, &["school", "institution", "schoolName", "name"])?;
    Some(Education {
        school,
        degree: text_of(entry, &["degree", "studyType", "degreeName"]),
        field: text_of(entry, &["field", "area", "fieldOfStudy"]),
        start_date: date_of(entry, &["start_date", "startDate", "timePeriod.startDate"]),
        end_date: date_of(entry, &["end_date", "endDate", "timePeriod.endDate"]),
        description: text_of(entry, &["description", "activities", "notes"]),
    })
}

fn certification_entry(value: &Value) -> Option<Certification> {
    if let Some(name) = value.as_str() {
        return Some(Certification {
            name: name.trim().to_string(),
            ..Default::default()
        });
    }
    let entry = value.as_object()?;
    Some(Certification {
        name: text_of(entry, &["name", "title"])?,
        authority: text_of(entry, &["authority", "issuer", "organization"]),
        date: date_of(entry, &["date", "startDate", "issueDate", "timePeriod.startDate"]),
        url: text_of(entry, &["url", "link"]),
    })
}

// ===== Value helpers =====

/// First non-empty string (or number) under any of `keys`.
fn text_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Dates come as strings, bare years, or `{ "year": 2020, "month": 3 }`.
/// Dotted keys reach one level down (`timePeriod.startDate`).
fn date_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = match key.split_once('.') {
            Some((outer, inner)) => obj.get(outer)?.as_object()?.get(inner)?,
            None => obj.get(*key)?,
        };
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(parts) => {
                let year = parts.get("year").and_then(Value::as_i64)?;
                match parts.get("month").and_then(Value::as_i64) {
                    Some(month) => Some(format!("{:02}/{}", month, year)),
                    None => Some(year.to_string()),
                }
            }
            _ => None,
        }
    })
}

fn location_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(loc) => {
            let parts: Vec<String> = ["address", "city", "region", "countryCode"]
                .iter()
                .filter_map(|k| text_of(loc, &[*k]))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn array_of<'v>(obj: &'v Map<String, Value>, keys: &[&str]) -> impl Iterator<Item = &'v Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .into_iter()
        .flatten()
}

fn named_text(value: &Value, keys: &[&str]) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => text_of(obj, keys),
        _ => None,
    }
}

fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_profile() -> Profile {
        Profile {
            full_name: "Jane Doe".into(),
            headline: Some("Backend Engineer".into()),
            summary: "Engineer".into(),
            email: Some("jane@example.com".into()),
            phone: None,
            address: Some("Berlin".into()),
            linkedin_url: Some("https://www.linkedin.com/in/janedoe".into()),
            photo_base64: None,
            experience: vec![Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: Some("2020".into()),
                end_date: Some("Present".into()),
                description: Some("Built services in Go".into()),
                location: None,
            }],
            education: vec![Education {
                school: "TU Berlin".into(),
                degree: Some("MSc".into()),
                ..Default::default()
            }],
            skills: vec!["Go".into(), "SQL".into()],
            certifications: vec![Certification {
                name: "CKA".into(),
                authority: Some("CNCF".into()),
                ..Default::default()
            }],
            languages: vec!["English".into()],
        }
    }

    #[test]
    fn test_own_layout_round_trips() {
        let profile = sample_profile();
        let bytes = serde_json::to_vec(&profile).unwrap();
        assert_eq!(parse_profile_json(&bytes).unwrap(), profile);
    }

    #[test]
    fn test_blank_entries_and_case_variant_skills_survive() {
        let mut profile = sample_profile();
        profile.education.push(Education {
            school: String::new(),
            degree: Some("MSc".into()),
            ..Default::default()
        });
        profile.experience.push(Experience {
            description: Some("  untitled side work  ".into()),
            ..Default::default()
        });
        profile.skills = vec!["Go".into(), "go".into()];
        let bytes = serde_json::to_vec(&profile).unwrap();
        assert_eq!(parse_profile_json(&bytes).unwrap(), profile);
    }

    #[test]
    fn test_minimal_own_layout() {
        let bytes = br#"{"full_name":"Jane Doe","summary":"Engineer","experience":[],"education":[],"skills":["Go"]}"#;
        let profile = parse_profile_json(bytes).unwrap();
        assert_eq!(profile.full_name, "Jane Doe");
        assert_eq!(profile.skills, vec!["Go"]);
    }

    #[test]
    fn test_shape_mismatch_is_invalid_format() {
        let cases: [&[u8]; 4] = [
            br#"{"full_name":"Jane","skills":"Go"}"#,
            br#"[1,2,3]"#,
            br#"{"foo":"bar"}"#,
            b"not json at all",
        ];
        for bytes in cases {
            assert!(
                matches!(parse_profile_json(bytes), Err(CvToolError::InvalidFormat(_))),
                "expected InvalidFormat for {}",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn test_json_resume() {
        let value = json!({
            "basics": {
                "name": "John Smith",
                "label": "Data Engineer",
                "email": "john@example.com",
                "summary": "Pipelines.",
                "location": {"city": "Paris", "countryCode": "FR"},
                "profiles": [{"network": "LinkedIn", "url": "https://linkedin.com/in/jsmith"}]
            },
            "work": [{
                "name": "DataCo",
                "position": "Data Engineer",
                "startDate": "2019-01",
                "highlights": ["Built Spark jobs", "Cut costs"]
            }],
            "education": [{"institution": "Sorbonne", "studyType": "MSc", "area": "CS"}],
            "skills": [{"name": "Spark"}, {"name": "Python"}, {"name": "spark"}],
            "languages": [{"language": "French"}]
        });
        let profile = profile_from_value(value).unwrap();
        assert_eq!(profile.full_name, "John Smith");
        assert_eq!(profile.headline.as_deref(), Some("Data Engineer"));
        assert_eq!(profile.address.as_deref(), Some("Paris, FR"));
        assert_eq!(profile.linkedin_url.as_deref(), Some("https://linkedin.com/in/jsmith"));
        assert_eq!(profile.experience[0].company, "DataCo");
        assert_eq!(profile.experience[0].title, "Data Engineer");
        assert_eq!(
            profile.experience[0].description.as_deref(),
            Some("• Built Spark jobs\n• Cut costs")
        );
        assert_eq!(profile.education[0].field.as_deref(), Some("CS"));
        assert_eq!(profile.skills, vec!["Spark", "Python"]);
        assert_eq!(profile.languages, vec!["French"]);
    }

    #[test]
    fn test_linkedin_export_aliases() {
        let value = json!({
            "firstName": "Ana",
            "lastName": "Lima",
            "headline": "SRE",
            "positions": [{
                "title": "SRE",
                "companyName": "Cloudy",
                "startDate": {"year": 2021, "month": 4},
                "current": true
            }],
            "educations": [{"schoolName": "USP", "degreeName": "BSc", "fieldOfStudy": "Physics"}],
            "skills": ["Kubernetes", "Terraform"],
            "licenses": [{"name": "AWS SAA", "issuer": "Amazon"}]
        });
        let profile = profile_from_value(value).unwrap();
        assert_eq!(profile.full_name, "Ana Lima");
        assert_eq!(profile.experience[0].company, "Cloudy");
        assert_eq!(profile.experience[0].start_date.as_deref(), Some("04/2021"));
        assert_eq!(profile.experience[0].end_date.as_deref(), Some("Present"));
        assert_eq!(profile.education[0].school, "USP");
        assert_eq!(profile.education[0].degree.as_deref(), Some("BSc"));
        assert_eq!(profile.certifications[0].authority.as_deref(), Some("Amazon"));
    }

    #[test]
    fn test_own_keys_with_export_entries() {
        let value = json!({
            "full_name": "Ana Lima",
            "experience": [{"title": "SRE", "companyName": "Cloudy"}]
        });
        let profile = profile_from_value(value).unwrap();
        assert_eq!(profile.experience[0].title, "SRE");
    }

    #[test]
    fn test_model_output_nulls() {
        let value = json!({
            "full_name": "Jane",
            "headline": null,
            "summary": null,
            "experience": [{"title": "Dev", "company": "X", "end_date": null}],
            "skills": ["Go", null]
        });
        let profile = profile_from_model_output(value).unwrap();
        assert_eq!(profile.summary, "");
        assert_eq!(profile.skills, vec!["Go"]);
        assert_eq!(profile.experience[0].end_date, None);
    }
}

//! Spoken wording for alerts

use crate::arbiter::Urgency;
use wayfinder_eye::processing::{ColorName, Direction};
use wayfinder_eye::scene::LabelCount;

/// Last words that do not follow the regular plural rules
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("mouse", "mice"),
    ("knife", "knives"),
    ("sheep", "sheep"),
    ("skis", "skis"),
    ("scissors", "scissors"),
];

/// `"Caution! Red car, 0.8 meters, on your left."`
pub fn collision_phrase(
    urgency: Urgency,
    color: ColorName,
    label: &str,
    distance_meters: f32,
    direction: Direction,
) -> String {
    let body = capitalize(&format!(
        "{} {}, {:.1} meters, {}.",
        color,
        label,
        distance_meters,
        direction.phrase()
    ));
    match urgency {
        Urgency::VeryClose => format!("Caution! {}", body),
        _ => body,
    }
}

/// `"I can see a person, 2 chairs and a cup."`
pub fn scene_summary(labels: &[LabelCount]) -> String {
    let items: Vec<String> = labels.iter().map(counted).collect();
    match items.as_slice() {
        [] => "I can't see anything right now.".to_string(),
        [only] => format!("I can see {}.", only),
        [rest @ .., last] => format!("I can see {} and {}.", rest.join(", "), last),
    }
}

fn counted(entry: &LabelCount) -> String {
    if entry.count == 1 {
        format!("{} {}", article(&entry.label), entry.label)
    } else {
        format!("{} {}", entry.count, plural(&entry.label))
    }
}

/// Indefinite article for a noun phrase
pub fn article(noun: &str) -> &'static str {
    match noun.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

/// Plural of a label; multi-word labels pluralize their last word.
pub fn plural(label: &str) -> String {
    let (head, last) = match label.rsplit_once(' ') {
        Some((head, last)) => (Some(head), last),
        None => (None, label),
    };

    let last_plural = IRREGULAR_PLURALS
        .iter()
        .find(|(singular, _)| *singular == last)
        .map(|(_, plural)| plural.to_string())
        .unwrap_or_else(|| regular_plural(last));

    match head {
        Some(head) => format!("{} {}", head, last_plural),
        None => last_plural,
    }
}

fn regular_plural(word: &str) -> String {
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

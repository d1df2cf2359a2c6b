use serde::Serialize;

/// Nested structure consumed by the result viewer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub name: String,
    pub title: String,
    pub splits: Vec<SplitView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitView {
    pub index: u32,
    pub title: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub source_label: String,
    pub metric: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_image: Option<String>,
}

/// "painting_1" -> "Painting 1", "PAINTING_A" -> "Painting A"
pub fn group_title(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split indices start at 0; views are numbered from 1
pub fn split_title(index: u32) -> String {
    format!("View {}", index + 1)
}
